use std::time::SystemTime;

use crate::entry_type::EntryType;

/// Permission bits used for every entry in the tree.
pub const DEFAULT_PERMISSIONS: u32 = 0o755;

/// POSIX metadata for one entry, as returned by `getattr`.
///
/// Snapshots are values: a file whose size changes produces a new snapshot
/// rather than updating an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSnapshot {
    created_at: SystemTime,
    modified_at: SystemTime,
    accessed_at: SystemTime,
    link_count: u32,
    mode: u32,
    size_bytes: u64,
}

impl StatSnapshot {
    pub fn new(kind: EntryType, size_bytes: u64, at: SystemTime) -> Self {
        Self {
            created_at: at,
            modified_at: at,
            accessed_at: at,
            link_count: 1,
            mode: kind.type_bits() | DEFAULT_PERMISSIONS,
            size_bytes,
        }
    }

    pub fn directory() -> Self {
        Self::new(EntryType::Directory, 0, SystemTime::now())
    }

    pub fn file(size_bytes: u64) -> Self {
        Self::new(EntryType::File, size_bytes, SystemTime::now())
    }

    /// A symlink's size is the byte length of its target.
    pub fn symlink(target: &str) -> Self {
        Self::new(EntryType::Symlink, target.len() as u64, SystemTime::now())
    }

    /// Copy of this snapshot with a different size and modification time.
    #[must_use]
    pub fn with_size(&self, size_bytes: u64, modified_at: SystemTime) -> Self {
        Self {
            size_bytes,
            modified_at,
            ..*self
        }
    }

    /// Copy of this snapshot with a different modification time.
    #[must_use]
    pub fn with_modified(&self, modified_at: SystemTime) -> Self {
        Self {
            modified_at,
            ..*self
        }
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn modified_at(&self) -> SystemTime {
        self.modified_at
    }

    pub fn accessed_at(&self) -> SystemTime {
        self.accessed_at
    }

    pub fn link_count(&self) -> u32 {
        self.link_count
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn entry_type(&self) -> Option<EntryType> {
        EntryType::from_mode(self.mode)
    }
}
