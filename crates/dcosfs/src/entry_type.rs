/// Kind of a filesystem entry.
///
/// Derived from the type bits of a POSIX mode, or from the first character of
/// the `ls -l` style mode string an agent reports in a browse listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Regular file entry
    File,
    /// Directory entry
    Directory,
    /// Symbolic link entry
    Symlink,
}

pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFREG: u32 = 0o100_000;
pub const S_IFLNK: u32 = 0o120_000;

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Directory => "directory",
            EntryType::Symlink => "symlink",
        }
    }

    /// The `S_IF*` type bits for this kind.
    pub fn type_bits(&self) -> u32 {
        match self {
            EntryType::File => S_IFREG,
            EntryType::Directory => S_IFDIR,
            EntryType::Symlink => S_IFLNK,
        }
    }

    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(EntryType::File),
            S_IFDIR => Some(EntryType::Directory),
            S_IFLNK => Some(EntryType::Symlink),
            _ => None,
        }
    }

    /// Classify a browse listing mode string such as `-rw-r--r--` or `drwxr-xr-x`.
    ///
    /// Only regular files and directories appear in sandboxes; anything else
    /// (including `l`) is rejected so the caller can report it.
    pub fn from_browse_mode(mode: &str) -> Option<Self> {
        match mode.chars().next() {
            Some('-') => Some(EntryType::File),
            Some('d') => Some(EntryType::Directory),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
