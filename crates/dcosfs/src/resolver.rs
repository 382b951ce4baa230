use crate::error::Result;
use crate::node::NodeRef;

/// Result of path resolution
#[derive(Debug)]
pub enum Lookup {
    Found(NodeRef),
    NotFound,
}

impl Lookup {
    pub fn found(self) -> Option<NodeRef> {
        match self {
            Lookup::Found(node) => Some(node),
            Lookup::NotFound => None,
        }
    }
}

/// Resolves a root-relative path (`frameworks/marathon/state.json`) by
/// descending one directory per segment.
///
/// The empty path is the root itself. A missing segment, or a segment that
/// needs to be descended into but is not a directory, yields `NotFound`.
/// Dynamic directories crossed on the way may fetch; their errors are
/// returned rather than reported as `NotFound`.
pub fn resolve(root: &NodeRef, path: &str) -> Result<Lookup> {
    let mut current = root.clone();
    let mut rest = path;

    while !rest.is_empty() {
        let (head, tail) = rest.split_once('/').unwrap_or((rest, ""));
        let Some(dir) = current.as_directory() else {
            return Ok(Lookup::NotFound);
        };
        let Some(child) = dir.get(head)? else {
            return Ok(Lookup::NotFound);
        };
        current = child;
        rest = tail;
    }

    if path.ends_with('/') && !current.is_directory() {
        return Ok(Lookup::NotFound);
    }
    Ok(Lookup::Found(current))
}
