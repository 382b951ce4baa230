use std::sync::Arc;

use crate::cache::{Listing, RemoteListingCache};
use crate::error::{Error, Result};
use crate::node::{FileNode, NodeRef};
use crate::stat::StatSnapshot;

/// A directory whose children are either fixed or listed from the cluster.
pub struct Directory {
    stat: StatSnapshot,
    children: Children,
}

enum Children {
    Static(Arc<Listing>),
    Dynamic(RemoteListingCache),
}

impl Directory {
    pub fn new_static(entries: Listing) -> Self {
        Self {
            stat: StatSnapshot::directory(),
            children: Children::Static(Arc::new(entries)),
        }
    }

    pub fn new_dynamic(cache: RemoteListingCache) -> Self {
        Self {
            stat: StatSnapshot::directory(),
            children: Children::Dynamic(cache),
        }
    }

    pub fn stat(&self) -> StatSnapshot {
        self.stat
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.children, Children::Dynamic(_))
    }

    /// The listing cache behind a dynamic directory.
    pub fn cache(&self) -> Option<&RemoteListingCache> {
        match &self.children {
            Children::Static(_) => None,
            Children::Dynamic(cache) => Some(cache),
        }
    }

    /// The current children; dynamic directories may fetch here.
    pub fn entries(&self) -> Result<Arc<Listing>> {
        match &self.children {
            Children::Static(entries) => Ok(entries.clone()),
            Children::Dynamic(cache) => cache.list(),
        }
    }

    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.keys().cloned().collect())
    }

    pub fn get(&self, name: &str) -> Result<Option<NodeRef>> {
        Ok(self.entries()?.get(name).cloned())
    }
}

/// Collects the children of a static directory.
#[derive(Default)]
pub struct DirBuilder {
    entries: Listing,
}

impl DirBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>, N: Into<FileNode>>(&mut self, name: S, node: N) -> Result<()> {
        self.insert_ref(name, Arc::new(node.into()))
    }

    pub fn insert_ref<S: Into<String>>(&mut self, name: S, node: NodeRef) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::already_exists(name));
        }
        _ = self.entries.insert(name, node);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_listing(self) -> Listing {
        self.entries
    }

    pub fn build(self) -> Directory {
        Directory::new_static(self.entries)
    }

    pub fn build_ref(self) -> NodeRef {
        Arc::new(FileNode::Directory(self.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::RegularFile;

    #[test]
    fn test_static_directory() {
        let mut builder = DirBuilder::new();
        builder.insert("a", RegularFile::new_static("1")).expect("insert a");
        builder.insert("b", RegularFile::new_static("22")).expect("insert b");
        let dir = builder.build();

        assert!(!dir.is_dynamic());
        assert_eq!(dir.names().expect("names"), vec!["a", "b"]);
        assert!(dir.get("b").expect("get").is_some());
        assert!(dir.get("c").expect("get").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = DirBuilder::new();
        builder.insert("state.json", RegularFile::new_static("{}")).expect("insert");
        let err = builder
            .insert("state.json", RegularFile::new_static("{}"))
            .expect_err("duplicate");
        assert!(matches!(err, Error::AlreadyExists(name) if name == "state.json"));
        assert_eq!(builder.len(), 1);
    }
}
