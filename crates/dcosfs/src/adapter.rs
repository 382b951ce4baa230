use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cluster::ClusterClient;
use crate::config::FsConfig;
use crate::context::FsContext;
use crate::entry_type::EntryType;
use crate::error::{Error, Result};
use crate::node::NodeRef;
use crate::resolver::{Lookup, resolve};
use crate::stat::StatSnapshot;
use crate::tree::build_root;

/// The filesystem operations, by absolute path.
///
/// Every call resolves its path from the root again, so a path that was
/// valid at `open` may be gone by `read`.
pub struct DcosFilesystem {
    ctx: Arc<FsContext>,
    root: NodeRef,
    next_handle: AtomicU64,
}

impl DcosFilesystem {
    /// Builds the tree and starts the master refresher. Fails when the
    /// first master fetch fails.
    pub fn new(client: Arc<dyn ClusterClient>, config: FsConfig) -> Result<Self> {
        let ctx = FsContext::new(client, config);
        ctx.master.start()?;
        Self::with_context(ctx)
    }

    /// Builds the tree over an existing context. The master cache is used
    /// as is.
    pub fn with_context(ctx: Arc<FsContext>) -> Result<Self> {
        let root = build_root(&ctx)?;
        Ok(Self {
            ctx,
            root,
            next_handle: AtomicU64::new(0),
        })
    }

    pub fn context(&self) -> &Arc<FsContext> {
        &self.ctx
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    fn lookup(&self, path: &str) -> Result<NodeRef> {
        let relative = path.strip_prefix('/').unwrap_or(path);
        match resolve(&self.root, relative)? {
            Lookup::Found(node) => Ok(node),
            Lookup::NotFound => Err(Error::no_such_entry(path)),
        }
    }

    pub fn getattr(&self, path: &str) -> Result<StatSnapshot> {
        self.lookup(path)?.stat()
    }

    /// `.` and `..` followed by the directory's entries. A path that is
    /// not a directory is reported as missing.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let node = self.lookup(path)?;
        let dir = node
            .as_directory()
            .ok_or_else(|| Error::no_such_entry(path))?;
        let mut names = vec![".".to_string(), "..".to_string()];
        names.extend(dir.names()?);
        Ok(names)
    }

    /// Entries with their types, without `.` and `..`.
    pub fn list_entries(&self, path: &str) -> Result<Vec<(String, EntryType)>> {
        let node = self.lookup(path)?;
        let dir = node
            .as_directory()
            .ok_or_else(|| Error::not_a_directory(path))?;
        Ok(dir
            .entries()?
            .iter()
            .map(|(name, child)| (name.clone(), child.entry_type()))
            .collect())
    }

    pub fn readlink(&self, path: &str) -> Result<String> {
        let node = self.lookup(path)?;
        let link = node.as_symlink().ok_or_else(|| Error::not_a_symlink(path))?;
        Ok(link.target().to_string())
    }

    /// Hands out the next handle. Handles are never tracked or released;
    /// `read` resolves by path.
    pub fn open(&self, path: &str, _flags: i32) -> Result<u64> {
        _ = self.lookup(path)?;
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    pub fn read(&self, path: &str, size: u64, offset: u64, _handle: u64) -> Result<Vec<u8>> {
        let node = self.lookup(path)?;
        let file = node.as_file().ok_or_else(|| Error::not_a_file(path))?;
        file.read(offset, size)
    }
}
