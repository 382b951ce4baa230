use anyhow::Result;
use dcosfs::FsConfig;

use crate::common::prepare_mount;

/// Mounts the cluster at `config.mount_point` and blocks until unmounted.
#[cfg(feature = "fuse")]
pub fn mount_command(config: FsConfig) -> Result<()> {
    use anyhow::Context;

    let config = prepare_mount(config)?;
    let mount_point = config.mount_point.clone();
    let allow_other = config.allow_other;
    let fs = crate::common::open_filesystem(config)?;
    dcosfs::mount(fs, &mount_point, allow_other)
        .with_context(|| format!("Failed to mount {}", mount_point.display()))
}

/// Mounts the cluster at `config.mount_point` and blocks until unmounted.
#[cfg(not(feature = "fuse"))]
pub fn mount_command(config: FsConfig) -> Result<()> {
    _ = prepare_mount(config)?;
    Err(anyhow::anyhow!(
        "fuse support disabled; rebuild dcos-fs with --features fuse, or use `ls` and `cat`"
    ))
}
