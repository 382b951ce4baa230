// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory cluster and clock for tests.
//!
//! Nothing here talks to a network. [`FakeCluster`] answers every
//! [`ClusterClient`] call from maps set up by the test and counts the calls
//! so tests can assert on caching.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::{Value, json};

use crate::clock::Clock;
use crate::cluster::{BrowseEntry, ClusterClient, ContentLocator, MasterState, Task};
use crate::error::{Error, Result};
use crate::lock;

#[derive(Default)]
struct FakeState {
    master: Option<Value>,
    master_failures: usize,
    agents: HashMap<String, Value>,
    browse: HashMap<(String, String), std::result::Result<Vec<BrowseEntry>, String>>,
    files: HashMap<ContentLocator, Vec<u8>>,
    apps: Vec<Value>,
    app_tasks: HashMap<String, Vec<Value>>,
}

/// A scripted [`ClusterClient`].
///
/// The master starts out with no frameworks and no agents.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
    master_calls: AtomicUsize,
    agent_state_calls: AtomicUsize,
    browse_calls: AtomicUsize,
    read_calls: AtomicUsize,
    size_calls: AtomicUsize,
}

fn missing(what: String) -> Error {
    Error::remote_fetch(format!("fake://{what}"), "404 Not Found")
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_master(&self, state: Value) {
        lock(&self.state).master = Some(state);
    }

    /// The next `times` master fetches fail.
    pub fn fail_master(&self, times: usize) {
        lock(&self.state).master_failures = times;
    }

    pub fn set_agent_state(&self, agent_id: &str, state: Value) {
        _ = lock(&self.state).agents.insert(agent_id.to_string(), state);
    }

    pub fn set_browse(&self, agent_id: &str, path: &str, entries: Vec<BrowseEntry>) {
        _ = lock(&self.state)
            .browse
            .insert((agent_id.to_string(), path.to_string()), Ok(entries));
    }

    /// Browsing `path` on `agent_id` fails with `message`.
    pub fn fail_browse(&self, agent_id: &str, path: &str, message: &str) {
        _ = lock(&self.state)
            .browse
            .insert((agent_id.to_string(), path.to_string()), Err(message.to_string()));
    }

    pub fn set_file<C: Into<Vec<u8>>>(&self, locator: &ContentLocator, content: C) {
        _ = lock(&self.state).files.insert(locator.clone(), content.into());
    }

    pub fn remove_file(&self, locator: &ContentLocator) {
        _ = lock(&self.state).files.remove(locator);
    }

    pub fn set_apps(&self, apps: Vec<Value>) {
        lock(&self.state).apps = apps;
    }

    pub fn set_app_tasks(&self, app_id: &str, tasks: Vec<Value>) {
        _ = lock(&self.state).app_tasks.insert(app_id.to_string(), tasks);
    }

    pub fn master_calls(&self) -> usize {
        self.master_calls.load(Ordering::SeqCst)
    }

    pub fn agent_state_calls(&self) -> usize {
        self.agent_state_calls.load(Ordering::SeqCst)
    }

    pub fn browse_calls(&self) -> usize {
        self.browse_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }
}

impl ClusterClient for FakeCluster {
    fn master_state(&self) -> Result<MasterState> {
        _ = self.master_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        if state.master_failures > 0 {
            state.master_failures -= 1;
            return Err(Error::remote_fetch(
                "fake://mesos/master/state.json",
                "connection refused",
            ));
        }
        let master = state
            .master
            .clone()
            .unwrap_or_else(|| json!({"frameworks": [], "slaves": []}));
        Ok(MasterState::new(master))
    }

    fn agent_state(&self, agent_id: &str) -> Result<Value> {
        _ = self.agent_state_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.state)
            .agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| missing(format!("slave/{agent_id}/state.json")))
    }

    fn browse(&self, agent_id: &str, path: &str) -> Result<Vec<BrowseEntry>> {
        _ = self.browse_calls.fetch_add(1, Ordering::SeqCst);
        let url = format!("slave/{agent_id}/files/browse.json?path={path}");
        match lock(&self.state)
            .browse
            .get(&(agent_id.to_string(), path.to_string()))
        {
            Some(Ok(entries)) => Ok(entries.clone()),
            Some(Err(message)) => Err(Error::remote_fetch(format!("fake://{url}"), message)),
            None => Err(missing(url)),
        }
    }

    fn read(&self, locator: &ContentLocator, offset: u64, length: u64) -> Result<Vec<u8>> {
        _ = self.read_calls.fetch_add(1, Ordering::SeqCst);
        let state = lock(&self.state);
        let bytes = state
            .files
            .get(locator)
            .ok_or_else(|| missing(locator.to_string()))?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
        let len = usize::try_from(length).unwrap_or(usize::MAX);
        let end = start.saturating_add(len).min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    fn size(&self, locator: &ContentLocator) -> Result<u64> {
        _ = self.size_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.state)
            .files
            .get(locator)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| missing(locator.to_string()))
    }

    fn apps(&self) -> Result<Vec<Value>> {
        Ok(lock(&self.state).apps.clone())
    }

    fn app(&self, app_id: &str) -> Result<Value> {
        lock(&self.state)
            .apps
            .iter()
            .find(|app| app.get("id").and_then(Value::as_str) == Some(app_id))
            .cloned()
            .ok_or_else(|| missing(format!("marathon/v2/apps{app_id}")))
    }

    fn app_tasks(&self, app_id: &str) -> Result<Vec<Value>> {
        Ok(lock(&self.state)
            .app_tasks
            .get(app_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *lock(&self.now)
    }
}

/// A browse entry with the fields the filesystem reads.
pub fn browse_entry(path: &str, mode: &str, size: u64) -> BrowseEntry {
    BrowseEntry {
        path: path.to_string(),
        mode: mode.to_string(),
        size,
        mtime: 0.0,
        nlink: 1,
        uid: "root".to_string(),
        gid: "root".to_string(),
    }
}

/// A running task record as the master reports it.
pub fn task_fixture(task_id: &str, slave_id: &str, framework_id: &str) -> Task {
    Task::new(json!({
        "id": task_id,
        "name": task_id,
        "framework_id": framework_id,
        "slave_id": slave_id,
        "state": "TASK_RUNNING",
    }))
}

/// Agent `state.json` placing each `(framework_id, task_id)` executor
/// sandbox under `/var/lib/mesos/slaves/<agent>/<task>`.
pub fn agent_state_fixture(agent_id: &str, executors: &[(&str, &str)]) -> Value {
    let frameworks: Vec<Value> = executors
        .iter()
        .map(|(framework_id, task_id)| {
            json!({
                "id": framework_id,
                "executors": [{
                    "id": task_id,
                    "directory": sandbox_path(agent_id, task_id),
                }],
            })
        })
        .collect();
    json!({"id": agent_id, "frameworks": frameworks})
}

/// Where [`agent_state_fixture`] puts a task's sandbox.
pub fn sandbox_path(agent_id: &str, task_id: &str) -> String {
    format!("/var/lib/mesos/slaves/{agent_id}/{task_id}")
}
