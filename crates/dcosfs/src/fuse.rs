//! Kernel mount through `fuser`.
//!
//! FUSE addresses entries by inode; [`DcosFilesystem`] by path. The inode
//! table hands out a number the first time a path is looked up and drops it
//! once the kernel has forgotten every lookup of it. Numbers are never
//! reused.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use fuser::{FileAttr, FileType, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyOpen, Request};

use crate::adapter::DcosFilesystem;
use crate::entry_type::EntryType;
use crate::error::{Error, Result};
use crate::stat::StatSnapshot;

const ROOT_INODE: u64 = 1;
const TTL: Duration = Duration::from_secs(1);
const BLOCK_SIZE: u32 = 512;
/// `d_ino` for directory entries not looked up yet, as libfuse reports them.
const UNKNOWN_INODE: u64 = 0xffff_ffff;

/// Mounts `fs` read-only at `mount_point` and serves it until unmounted.
pub fn mount(fs: DcosFilesystem, mount_point: &Path, allow_other: bool) -> Result<()> {
    let mut options = vec![MountOption::FSName("dcos".to_string()), MountOption::RO];
    if allow_other {
        options.push(MountOption::AllowOther);
        options.push(MountOption::AutoUnmount);
    }
    let display = mount_point.display().to_string();
    diagnostics::info!("Mounting at {display}", display: display);
    fuser::mount2(FuseBridge::new(fs), mount_point, &options)?;
    Ok(())
}

struct InodeEntry {
    path: String,
    lookups: u64,
}

struct InodeTable {
    entries: HashMap<u64, InodeEntry>,
    inodes: HashMap<String, u64>,
    next_inode: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
            inodes: HashMap::new(),
            next_inode: ROOT_INODE + 1,
        };
        _ = table.entries.insert(
            ROOT_INODE,
            InodeEntry {
                path: "/".to_string(),
                lookups: 1,
            },
        );
        _ = table.inodes.insert("/".to_string(), ROOT_INODE);
        table
    }

    /// The inode of `path`, counting one kernel lookup against it.
    fn lookup(&mut self, path: &str) -> u64 {
        if let Some(&inode) = self.inodes.get(path) {
            if let Some(entry) = self.entries.get_mut(&inode) {
                entry.lookups += 1;
            }
            return inode;
        }
        let inode = self.next_inode;
        self.next_inode += 1;
        _ = self.entries.insert(
            inode,
            InodeEntry {
                path: path.to_string(),
                lookups: 1,
            },
        );
        _ = self.inodes.insert(path.to_string(), inode);
        inode
    }

    /// The inode of `path` if the kernel currently holds one.
    fn known(&self, path: &str) -> Option<u64> {
        self.inodes.get(path).copied()
    }

    /// Drops `count` kernel lookups; the inode goes away at zero. The root
    /// stays for the life of the mount.
    fn forget(&mut self, inode: u64, count: u64) {
        if inode == ROOT_INODE {
            return;
        }
        let Some(entry) = self.entries.get_mut(&inode) else {
            return;
        };
        entry.lookups = entry.lookups.saturating_sub(count);
        if entry.lookups > 0 {
            return;
        }
        if let Some(entry) = self.entries.remove(&inode) {
            _ = self.inodes.remove(&entry.path);
        }
    }

    fn path(&self, inode: u64) -> Option<&str> {
        self.entries.get(&inode).map(|entry| entry.path.as_str())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// `.`, `..` and `entries` of the directory `path`, with inode numbers for
/// whatever the kernel already knows.
fn directory_listing(
    table: &InodeTable,
    inode: u64,
    path: &str,
    entries: Vec<(String, EntryType)>,
) -> Vec<(u64, FileType, String)> {
    let parent = table.known(parent_path(path)).unwrap_or(UNKNOWN_INODE);
    let mut listing = Vec::with_capacity(entries.len() + 2);
    listing.push((inode, FileType::Directory, ".".to_string()));
    listing.push((parent, FileType::Directory, "..".to_string()));
    for (name, kind) in entries {
        let child = table
            .known(&child_path(path, &name))
            .unwrap_or(UNKNOWN_INODE);
        listing.push((child, file_type(Some(kind)), name));
    }
    listing
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

fn file_type(kind: Option<EntryType>) -> FileType {
    match kind {
        Some(EntryType::Directory) => FileType::Directory,
        Some(EntryType::Symlink) => FileType::Symlink,
        Some(EntryType::File) | None => FileType::RegularFile,
    }
}

fn attr(inode: u64, stat: &StatSnapshot) -> FileAttr {
    FileAttr {
        ino: inode,
        size: stat.size_bytes(),
        blocks: stat.size_bytes().div_ceil(u64::from(BLOCK_SIZE)),
        atime: stat.accessed_at(),
        mtime: stat.modified_at(),
        ctime: stat.created_at(),
        crtime: stat.created_at(),
        kind: file_type(stat.entry_type()),
        perm: u16::try_from(stat.permissions()).unwrap_or(0o755),
        nlink: stat.link_count(),
        uid: 0,
        gid: 0,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

fn errno(path: &str, err: &Error) -> i32 {
    if err.is_remote() {
        let err = err.to_string();
        diagnostics::warn!("{path}: {err}", path: path, err: err.as_str());
    }
    err.errno()
}

struct FuseBridge {
    fs: DcosFilesystem,
    inodes: InodeTable,
}

impl FuseBridge {
    fn new(fs: DcosFilesystem) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
        }
    }

    fn path(&self, inode: u64) -> Option<String> {
        self.inodes.path(inode).map(str::to_string)
    }
}

impl fuser::Filesystem for FuseBridge {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent) = self.path(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = child_path(&parent, &name.to_string_lossy());
        match self.fs.getattr(&path) {
            Ok(stat) => {
                let inode = self.inodes.lookup(&path);
                reply.entry(&TTL, &attr(inode, &stat), 0);
            }
            Err(e) => reply.error(errno(&path, &e)),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, inode: u64, nlookup: u64) {
        self.inodes.forget(inode, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, inode: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.getattr(&path) {
            Ok(stat) => reply.attr(&TTL, &attr(inode, &stat)),
            Err(e) => reply.error(errno(&path, &e)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, inode: u64, reply: ReplyData) {
        let Some(path) = self.path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.readlink(&path) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(e) => reply.error(errno(&path, &e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, inode: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            reply.error(libc::EROFS);
            return;
        }
        match self.fs.open(&path, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(errno(&path, &e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        inode: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        match self.fs.read(&path, u64::from(size), offset, fh) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(errno(&path, &e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        inode: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        let entries = match self.fs.list_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(errno(&path, &e));
                return;
            }
        };

        let listing = directory_listing(&self.inodes, inode, &path, entries);
        let start = usize::try_from(offset).unwrap_or(0);
        for (idx, (child, kind, name)) in listing.into_iter().enumerate().skip(start) {
            if reply.add(child, (idx + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }
}
