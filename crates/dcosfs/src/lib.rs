//! A read-only filesystem view of a DC/OS cluster.
//!
//! The tree is built from [`FileNode`]s. Directories under `/frameworks`,
//! `/marathon/apps`, `/nodes/slaves` and every task sandbox are dynamic: their
//! children come from a [`RemoteListingCache`] that rebuilds them from the
//! cluster when its [`RefreshPolicy`] says the listing is stale. The POSIX
//! surface is [`DcosFilesystem`]; the `fuse` feature mounts it.

use std::sync::{Mutex, MutexGuard};

mod adapter;
mod cache;
mod clock;
mod cluster;
mod config;
mod context;
mod dir;
mod entry_type;
mod error;
mod file;
#[cfg(feature = "fuse")]
mod fuse;
mod http;
mod master;
mod node;
mod resolver;
mod sandbox;
mod stat;
mod symlink;
mod tree;

pub mod testing;

pub use adapter::DcosFilesystem;
pub use cache::{Listing, ListingSource, RefreshPolicy, RemoteListingCache};
pub use clock::{Clock, SystemClock};
pub use cluster::{
    BrowseEntry, ClusterClient, ContentLocator, Framework, Host, MasterState, Slave, Task,
    executor_directory,
};
pub use config::{FsConfig, load_config};
pub use context::FsContext;
pub use dir::{DirBuilder, Directory};
pub use entry_type::EntryType;
pub use error::{Error, Result};
pub use file::{RegularFile, json_bytes};
#[cfg(feature = "fuse")]
pub use fuse::mount;
pub use http::HttpCluster;
pub use master::MasterStateCache;
pub use node::{FileNode, NodeRef};
pub use resolver::{Lookup, resolve};
pub use sandbox::{SandboxBridge, SandboxRegistry};
pub use stat::StatSnapshot;
pub use symlink::Symlink;
pub use tree::{app_dir_name, build_root, marathon_sandbox_target};

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// Every guarded value here is a pointer or counter that is replaced whole,
/// so a poisoned guard never exposes a half-written value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
