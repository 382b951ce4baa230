use crate::stat::StatSnapshot;

/// A symbolic link to another path, usually elsewhere under the mount point.
pub struct Symlink {
    target: String,
    stat: StatSnapshot,
}

impl Symlink {
    pub fn new<S: Into<String>>(target: S) -> Self {
        let target = target.into();
        let stat = StatSnapshot::symlink(&target);
        Self { target, stat }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn stat(&self) -> StatSnapshot {
        self.stat
    }
}
