use std::sync::Arc;

use crate::dir::Directory;
use crate::entry_type::EntryType;
use crate::error::Result;
use crate::file::RegularFile;
use crate::stat::StatSnapshot;
use crate::symlink::Symlink;

/// Shared handle to a node.
///
/// A directory refresh replaces the parent's map of handles; anyone still
/// holding a handle from before the refresh keeps a working node.
pub type NodeRef = Arc<FileNode>;

/// One entry in the tree.
pub enum FileNode {
    File(RegularFile),
    Directory(Directory),
    Symlink(Symlink),
}

impl FileNode {
    pub fn entry_type(&self) -> EntryType {
        match self {
            FileNode::File(_) => EntryType::File,
            FileNode::Directory(_) => EntryType::Directory,
            FileNode::Symlink(_) => EntryType::Symlink,
        }
    }

    /// Metadata for `getattr`. Remote files may fetch their size here.
    pub fn stat(&self) -> Result<StatSnapshot> {
        match self {
            FileNode::File(f) => f.stat(),
            FileNode::Directory(d) => Ok(d.stat()),
            FileNode::Symlink(s) => Ok(s.stat()),
        }
    }

    pub fn as_file(&self) -> Option<&RegularFile> {
        match self {
            FileNode::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            FileNode::Directory(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_symlink(&self) -> Option<&Symlink> {
        match self {
            FileNode::Symlink(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileNode::Directory(_))
    }

    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }
}

impl From<RegularFile> for FileNode {
    fn from(file: RegularFile) -> Self {
        FileNode::File(file)
    }
}

impl From<Directory> for FileNode {
    fn from(dir: Directory) -> Self {
        FileNode::Directory(dir)
    }
}

impl From<Symlink> for FileNode {
    fn from(link: Symlink) -> Self {
        FileNode::Symlink(link)
    }
}

impl std::fmt::Debug for FileNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileNode::File(_) => write!(f, "(file)"),
            FileNode::Directory(d) if d.is_dynamic() => write!(f, "(dynamic directory)"),
            FileNode::Directory(_) => write!(f, "(directory)"),
            FileNode::Symlink(s) => write!(f, "(symlink -> {})", s.target()),
        }
    }
}
