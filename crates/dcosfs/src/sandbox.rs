// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Task sandboxes: agent directory listings turned into nodes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use crate::cache::{Listing, ListingSource, RemoteListingCache};
use crate::cluster::{BrowseEntry, ContentLocator, MasterState, Task};
use crate::context::FsContext;
use crate::dir::Directory;
use crate::entry_type::EntryType;
use crate::error::{Error, Result};
use crate::file::RegularFile;
use crate::lock;
use crate::node::{FileNode, NodeRef};

/// The task a sandbox belongs to, and where its sandbox lives on the agent
/// once that has been looked up.
struct SandboxRoot {
    task: Task,
    directory: Mutex<Option<String>>,
}

impl SandboxRoot {
    fn directory(&self, ctx: &FsContext) -> Result<String> {
        if let Some(dir) = lock(&self.directory).clone() {
            return Ok(dir);
        }
        let dir = ctx.client.sandbox_directory(&self.task)?;
        *lock(&self.directory) = Some(dir.clone());
        Ok(dir)
    }
}

/// Lists one directory of a task sandbox.
///
/// `path` is relative to the sandbox root; the root itself is `""`.
pub struct SandboxBridge {
    ctx: Arc<FsContext>,
    root: Arc<SandboxRoot>,
    path: String,
}

impl SandboxBridge {
    /// The bridge for the top of `task`'s sandbox.
    pub fn new(ctx: Arc<FsContext>, task: Task) -> Self {
        Self {
            ctx,
            root: Arc::new(SandboxRoot {
                task,
                directory: Mutex::new(None),
            }),
            path: String::new(),
        }
    }

    fn child(&self, name: &str) -> Self {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path, name)
        };
        Self {
            ctx: self.ctx.clone(),
            root: self.root.clone(),
            path,
        }
    }

    pub fn task(&self) -> &Task {
        &self.root.task
    }

    /// Sandbox-relative path of the listed directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wraps this bridge in a dynamic directory using the sandbox TTL.
    pub fn into_node(self) -> NodeRef {
        let policy = self.ctx.config.sandbox_policy();
        let clock = self.ctx.clock.clone();
        FileNode::Directory(Directory::new_dynamic(RemoteListingCache::new(
            self, policy, clock,
        )))
        .into_ref()
    }

    /// Absolute path of the listed directory on the agent.
    fn remote_path(&self) -> Result<String> {
        let dir = self.root.directory(&self.ctx)?;
        if self.path.is_empty() {
            Ok(dir)
        } else {
            Ok(format!("{}/{}", dir.trim_end_matches('/'), self.path))
        }
    }

    /// Turns one browse entry into a node: `-` is a remote file, `d` a
    /// deeper sandbox directory. Anything else is rejected.
    pub fn classify(&self, entry: &BrowseEntry) -> Result<NodeRef> {
        match EntryType::from_browse_mode(&entry.mode) {
            Some(EntryType::File) => {
                let modified_at = Duration::try_from_secs_f64(entry.mtime)
                    .ok()
                    .map(|since| UNIX_EPOCH + since);
                let file = RegularFile::new_remote(
                    ContentLocator::agent(self.task().slave_id(), entry.path.clone()),
                    Some(entry.size),
                    modified_at,
                    self.ctx.client.clone(),
                    self.ctx.clock.clone(),
                    self.ctx.config.file_size_ttl(),
                );
                Ok(FileNode::File(file).into_ref())
            }
            Some(EntryType::Directory) => Ok(self.child(entry.basename()).into_node()),
            _ => Err(Error::unknown_entry_type(&entry.path, &entry.mode)),
        }
    }
}

impl ListingSource for SandboxBridge {
    fn fetch(&self) -> Result<Listing> {
        let remote = self.remote_path()?;
        let entries = self.ctx.client.browse(self.task().slave_id(), &remote)?;

        let mut listing = Listing::new();
        for entry in &entries {
            let name = entry.basename();
            if name.is_empty() {
                continue;
            }
            _ = listing.insert(name.to_string(), self.classify(entry)?);
        }
        Ok(listing)
    }

    fn describe(&self) -> String {
        format!("sandbox {}:/{}", self.task().id(), self.path)
    }
}

/// Sandbox directories by task id.
///
/// Task directories are rebuilt on every listing; keeping their sandbox
/// nodes here lets the sandbox listing TTL outlive those rebuilds. Entries
/// for tasks missing from a newer master snapshot are dropped.
#[derive(Default)]
pub struct SandboxRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    generation: u64,
    /// Keyed by framework id and task id.
    sandboxes: HashMap<(String, String), NodeRef>,
}

impl SandboxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sandbox directory of `task` of `framework_id`, created on first
    /// request.
    pub fn sandbox_for(
        &self,
        ctx: &Arc<FsContext>,
        framework_id: &str,
        task: &Task,
        master: &MasterState,
    ) -> NodeRef {
        let mut state = lock(&self.state);
        if state.generation != master.generation() {
            let before = state.sandboxes.len();
            state
                .sandboxes
                .retain(|(framework_id, task_id), _| master.has_task(framework_id, task_id));
            state.generation = master.generation();
            let pruned = before - state.sandboxes.len();
            if pruned > 0 {
                diagnostics::debug!("Dropped {pruned} sandboxes of finished tasks", pruned: pruned);
            }
        }
        state
            .sandboxes
            .entry((framework_id.to_string(), task.id().to_string()))
            .or_insert_with(|| SandboxBridge::new(ctx.clone(), task.clone()).into_node())
            .clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).sandboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FsConfig;
    use crate::testing::{FakeCluster, ManualClock, browse_entry, task_fixture};
    use serde_json::json;

    fn setup() -> (Arc<FakeCluster>, Arc<ManualClock>, Arc<FsContext>) {
        let cluster = Arc::new(FakeCluster::new());
        let clock = Arc::new(ManualClock::new());
        let ctx = FsContext::with_clock(
            cluster.clone(),
            FsConfig::new("http://dcos.example.com"),
            clock.clone(),
        );
        cluster.set_agent_state(
            "s1",
            json!({"frameworks": [{
                "id": "fw-1",
                "executors": [{"id": "t1", "directory": "/var/sandbox/t1"}]
            }]}),
        );
        (cluster, clock, ctx)
    }

    #[test]
    fn test_classify_file() {
        let (_, _, ctx) = setup();
        let bridge = SandboxBridge::new(ctx, task_fixture("t1", "s1", "fw-1"));
        let mut entry = browse_entry("/var/sandbox/t1/stdout", "-rw-r--r--", 42);
        entry.mtime = 1_400_000_000.0;

        let node = bridge.classify(&entry).expect("classify");
        let file = node.as_file().expect("regular file");
        assert_eq!(
            file.locator(),
            Some(&ContentLocator::agent("s1", "/var/sandbox/t1/stdout"))
        );
        let stat = node.stat().expect("stat");
        assert_eq!(stat.size_bytes(), 42);
        assert_eq!(stat.modified_at(), UNIX_EPOCH + Duration::from_secs(1_400_000_000));
    }

    #[test]
    fn test_classify_rejects_unknown_mode() {
        let (_, _, ctx) = setup();
        let bridge = SandboxBridge::new(ctx, task_fixture("t1", "s1", "fw-1"));
        let entry = browse_entry("/var/sandbox/t1/sock", "srwxr-xr-x", 0);
        assert!(matches!(
            bridge.classify(&entry),
            Err(Error::UnknownEntryType { .. })
        ));
    }

    #[test]
    fn test_nested_directories_browse_deeper_paths() {
        let (cluster, _, ctx) = setup();
        cluster.set_browse(
            "s1",
            "/var/sandbox/t1",
            vec![browse_entry("/var/sandbox/t1/logs", "drwxr-xr-x", 4096)],
        );
        cluster.set_browse(
            "s1",
            "/var/sandbox/t1/logs",
            vec![browse_entry("/var/sandbox/t1/logs/app.log", "-rw-r--r--", 7)],
        );

        let root = SandboxBridge::new(ctx, task_fixture("t1", "s1", "fw-1")).into_node();
        let logs = root
            .as_directory()
            .expect("dir")
            .get("logs")
            .expect("list")
            .expect("logs");
        let names = logs.as_directory().expect("dir").names().expect("names");
        assert_eq!(names, vec!["app.log"]);
    }

    #[test]
    fn test_sandbox_directory_looked_up_once() {
        let (cluster, clock, ctx) = setup();
        cluster.set_browse("s1", "/var/sandbox/t1", vec![]);
        let root = SandboxBridge::new(ctx, task_fixture("t1", "s1", "fw-1")).into_node();
        let dir = root.as_directory().expect("dir");

        _ = dir.names().expect("first");
        clock.advance(Duration::from_secs(11));
        _ = dir.names().expect("second");
        assert_eq!(cluster.browse_calls(), 2);
        assert_eq!(cluster.agent_state_calls(), 1);
    }

    #[test]
    fn test_registry_keeps_nodes_until_task_gone() {
        let (_, _, ctx) = setup();
        let registry = SandboxRegistry::new();
        let task = task_fixture("t1", "s1", "fw-1");
        let with_task = MasterState::new(json!({
            "frameworks": [{"id": "fw-1", "name": "marathon", "tasks": [task.value().clone()]}]
        }))
        .with_generation(1);

        let first = registry.sandbox_for(&ctx, "fw-1", &task, &with_task);
        let second = registry.sandbox_for(&ctx, "fw-1", &task, &with_task);
        assert!(Arc::ptr_eq(&first, &second));

        let without = MasterState::new(json!({"frameworks": []})).with_generation(2);
        let other = task_fixture("t2", "s1", "fw-1");
        _ = registry.sandbox_for(&ctx, "fw-1", &other, &without);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_separates_frameworks() {
        let (_, _, ctx) = setup();
        let registry = SandboxRegistry::new();
        let a = task_fixture("t1", "s1", "fw-a");
        let b = task_fixture("t1", "s2", "fw-b");
        let master = MasterState::new(json!({
            "frameworks": [
                {"id": "fw-a", "tasks": [a.value().clone()]},
                {"id": "fw-b", "tasks": [b.value().clone()]}
            ]
        }))
        .with_generation(1);

        let in_a = registry.sandbox_for(&ctx, "fw-a", &a, &master);
        let in_b = registry.sandbox_for(&ctx, "fw-b", &b, &master);
        assert!(!Arc::ptr_eq(&in_a, &in_b));
        assert_eq!(registry.len(), 2);
    }
}
