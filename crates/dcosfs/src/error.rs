use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by filesystem operations and the cluster collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No such entry: {}", .0.display())]
    NoSuchEntry(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Not a symlink: {}", .0.display())]
    NotASymlink(PathBuf),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Unknown entry type '{kind}' for {path}")]
    UnknownEntryType { path: String, kind: String },

    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Sandbox for task {task_id} not found on agent {agent_id}")]
    SandboxNotFound { task_id: String, agent_id: String },

    #[error("Master state has not been fetched yet")]
    MasterUnavailable,

    #[error("Remote fetch from {url} failed: {message}")]
    RemoteFetch { url: String, message: String },

    #[error("Remote read of {locator} failed: {message}")]
    RemoteRead { locator: String, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn no_such_entry<P: Into<PathBuf>>(path: P) -> Self {
        Error::NoSuchEntry(path.into())
    }

    pub fn not_a_directory<P: Into<PathBuf>>(path: P) -> Self {
        Error::NotADirectory(path.into())
    }

    pub fn not_a_file<P: Into<PathBuf>>(path: P) -> Self {
        Error::NotAFile(path.into())
    }

    pub fn not_a_symlink<P: Into<PathBuf>>(path: P) -> Self {
        Error::NotASymlink(path.into())
    }

    pub fn already_exists<S: Into<String>>(name: S) -> Self {
        Error::AlreadyExists(name.into())
    }

    pub fn unknown_entry_type<P: Into<String>, K: Into<String>>(path: P, kind: K) -> Self {
        Error::UnknownEntryType {
            path: path.into(),
            kind: kind.into(),
        }
    }

    pub fn remote_fetch<U: Into<String>, M: ToString>(url: U, message: M) -> Self {
        Error::RemoteFetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn remote_read<L: ToString, M: ToString>(locator: L, message: M) -> Self {
        Error::RemoteRead {
            locator: locator.to_string(),
            message: message.to_string(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }

    /// The errno reported to the kernel when a FUSE operation fails.
    pub fn errno(&self) -> i32 {
        match self {
            Error::NoSuchEntry(_)
            | Error::UnknownFramework(_)
            | Error::UnknownTask(_)
            | Error::SandboxNotFound { .. } => libc::ENOENT,
            Error::NotADirectory(_) => libc::ENOTDIR,
            Error::NotAFile(_) => libc::EISDIR,
            Error::NotASymlink(_) => libc::EINVAL,
            Error::AlreadyExists(_) => libc::EEXIST,
            Error::UnknownEntryType { .. }
            | Error::MasterUnavailable
            | Error::RemoteFetch { .. }
            | Error::RemoteRead { .. }
            | Error::InvalidResponse(_)
            | Error::Json(_)
            | Error::Io(_)
            | Error::Config(_) => libc::EIO,
        }
    }

    /// True for errors caused by the remote side rather than by the request.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::RemoteFetch { .. } | Error::RemoteRead { .. } | Error::InvalidResponse(_)
        )
    }
}
