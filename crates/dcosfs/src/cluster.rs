//! The remote side of the filesystem: master state, agent sandboxes and Marathon.
//!
//! Everything the tree needs from the cluster goes through [`ClusterClient`].
//! The records themselves stay as JSON so `state.json` files can reproduce
//! the remote documents exactly.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Blocking access to the cluster APIs the filesystem is built from.
pub trait ClusterClient: Send + Sync {
    /// The master's `state.json`.
    fn master_state(&self) -> Result<MasterState>;

    /// An agent's `state.json`.
    fn agent_state(&self, agent_id: &str) -> Result<Value>;

    /// One level of an agent directory listing.
    fn browse(&self, agent_id: &str, path: &str) -> Result<Vec<BrowseEntry>>;

    /// Up to `length` bytes of remote content starting at `offset`.
    fn read(&self, locator: &ContentLocator, offset: u64, length: u64) -> Result<Vec<u8>>;

    /// Current size in bytes of remote content.
    fn size(&self, locator: &ContentLocator) -> Result<u64>;

    /// All Marathon apps.
    fn apps(&self) -> Result<Vec<Value>>;

    /// One Marathon app by id (ids start with `/`).
    fn app(&self, app_id: &str) -> Result<Value>;

    /// The running tasks of a Marathon app.
    fn app_tasks(&self, app_id: &str) -> Result<Vec<Value>>;

    /// Absolute path of a task's sandbox on its agent.
    fn sandbox_directory(&self, task: &Task) -> Result<String> {
        let agent = self.agent_state(task.slave_id())?;
        executor_directory(&agent, task).ok_or_else(|| Error::SandboxNotFound {
            task_id: task.id().to_string(),
            agent_id: task.slave_id().to_string(),
        })
    }
}

/// Finds the executor directory of `task` in an agent `state.json`.
///
/// Completed frameworks and executors are searched too so finished tasks
/// keep a readable sandbox.
pub fn executor_directory(agent_state: &Value, task: &Task) -> Option<String> {
    let executor_id = task.executor_id();
    ["frameworks", "completed_frameworks"]
        .into_iter()
        .flat_map(|key| array(agent_state, key))
        .filter(|framework| str_field(framework, "id") == Some(task.framework_id()))
        .flat_map(|framework| {
            ["executors", "completed_executors"]
                .into_iter()
                .flat_map(move |key| array(framework, key))
        })
        .find(|executor| str_field(executor, "id") == Some(executor_id))
        .and_then(|executor| str_field(executor, "directory"))
        .map(str::to_string)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// A snapshot of the master's `state.json`.
#[derive(Debug, Clone)]
pub struct MasterState {
    state: Value,
    generation: u64,
}

impl MasterState {
    pub fn new(state: Value) -> Self {
        Self {
            state,
            generation: 0,
        }
    }

    /// Stamps the snapshot with the refresh count of the cache that holds it.
    #[must_use]
    pub fn with_generation(self, generation: u64) -> Self {
        Self { generation, ..self }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn raw(&self) -> &Value {
        &self.state
    }

    /// Active frameworks.
    pub fn frameworks(&self) -> Vec<Framework> {
        array(&self.state, "frameworks")
            .iter()
            .cloned()
            .map(Framework)
            .collect()
    }

    /// A framework by id, active or completed.
    pub fn framework(&self, framework_id: &str) -> Result<Framework> {
        self.all_frameworks()
            .find(|fw| str_field(fw, "id") == Some(framework_id))
            .cloned()
            .map(Framework)
            .ok_or_else(|| Error::UnknownFramework(framework_id.to_string()))
    }

    /// A task of `framework_id`, searched across running and completed
    /// tasks. Task ids are only unique within their framework.
    pub fn task(&self, framework_id: &str, task_id: &str) -> Result<Task> {
        self.find_task(framework_id, task_id)
            .cloned()
            .map(Task)
            .ok_or_else(|| Error::UnknownTask(task_id.to_string()))
    }

    pub fn has_task(&self, framework_id: &str, task_id: &str) -> bool {
        self.find_task(framework_id, task_id).is_some()
    }

    pub fn slaves(&self) -> Vec<Slave> {
        array(&self.state, "slaves")
            .iter()
            .cloned()
            .map(Slave)
            .collect()
    }

    pub fn slave(&self, slave_id: &str) -> Option<Slave> {
        array(&self.state, "slaves")
            .iter()
            .find(|slave| str_field(slave, "id") == Some(slave_id))
            .cloned()
            .map(Slave)
    }

    fn all_frameworks(&self) -> impl Iterator<Item = &Value> {
        array(&self.state, "frameworks")
            .iter()
            .chain(array(&self.state, "completed_frameworks"))
    }

    fn find_task(&self, framework_id: &str, task_id: &str) -> Option<&Value> {
        self.all_frameworks()
            .filter(|fw| str_field(fw, "id") == Some(framework_id))
            .flat_map(|fw| array(fw, "tasks").iter().chain(array(fw, "completed_tasks")))
            .find(|task| str_field(task, "id") == Some(task_id))
    }
}

/// A framework record from the master state.
#[derive(Debug, Clone, PartialEq)]
pub struct Framework(Value);

impl Framework {
    pub fn id(&self) -> &str {
        str_field(&self.0, "id").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        str_field(&self.0, "name").unwrap_or_default()
    }

    /// Running tasks.
    pub fn tasks(&self) -> Vec<Task> {
        array(&self.0, "tasks").iter().cloned().map(Task).collect()
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

/// A task record from the master state.
#[derive(Debug, Clone, PartialEq)]
pub struct Task(Value);

impl Task {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> &str {
        str_field(&self.0, "id").unwrap_or_default()
    }

    pub fn slave_id(&self) -> &str {
        str_field(&self.0, "slave_id").unwrap_or_default()
    }

    pub fn framework_id(&self) -> &str {
        str_field(&self.0, "framework_id").unwrap_or_default()
    }

    /// Command tasks run under an executor named after the task itself.
    pub fn executor_id(&self) -> &str {
        match str_field(&self.0, "executor_id") {
            Some(id) if !id.is_empty() => id,
            _ => self.id(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

/// An agent record from the master state.
#[derive(Debug, Clone, PartialEq)]
pub struct Slave(Value);

impl Slave {
    pub fn id(&self) -> &str {
        str_field(&self.0, "id").unwrap_or_default()
    }

    pub fn hostname(&self) -> &str {
        str_field(&self.0, "hostname").unwrap_or_default()
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

/// One entry of an agent `files/browse.json` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowseEntry {
    /// Absolute path on the agent.
    pub path: String,
    /// `ls -l` style mode string, e.g. `-rw-r--r--`.
    pub mode: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mtime: f64,
    #[serde(default)]
    pub nlink: u64,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub gid: String,
}

impl BrowseEntry {
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Where a remote file's bytes are served from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Master,
    Agent(String),
}

/// A remote file: the process serving it plus the path it serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentLocator {
    pub host: Host,
    pub path: String,
}

impl ContentLocator {
    pub fn master<P: Into<String>>(path: P) -> Self {
        Self {
            host: Host::Master,
            path: path.into(),
        }
    }

    pub fn agent<A: Into<String>, P: Into<String>>(agent_id: A, path: P) -> Self {
        Self {
            host: Host::Agent(agent_id.into()),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.host {
            Host::Master => write!(f, "master:{}", self.path),
            Host::Agent(id) => write!(f, "agent {}:{}", id, self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> MasterState {
        MasterState::new(json!({
            "frameworks": [
                {"id": "fw-1", "name": "marathon", "tasks": [
                    {"id": "web.1", "slave_id": "s1", "framework_id": "fw-1", "executor_id": ""}
                ], "completed_tasks": [
                    {"id": "web.0", "slave_id": "s1", "framework_id": "fw-1"}
                ]}
            ],
            "completed_frameworks": [
                {"id": "fw-0", "name": "spark", "tasks": [], "completed_tasks": [
                    {"id": "job.7", "slave_id": "s2", "framework_id": "fw-0", "executor_id": "exec-7"}
                ]}
            ],
            "slaves": [{"id": "s1", "hostname": "10.0.0.1"}, {"id": "s2", "hostname": "10.0.0.2"}]
        }))
    }

    #[test]
    fn test_frameworks_are_active_only() {
        let names: Vec<_> = state().frameworks().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["marathon"]);
        assert_eq!(state().framework("fw-0").expect("completed").name(), "spark");
        assert!(matches!(state().framework("nope"), Err(Error::UnknownFramework(_))));
    }

    #[test]
    fn test_task_lookup_includes_completed() {
        let st = state();
        assert_eq!(st.task("fw-1", "web.1").expect("running").slave_id(), "s1");
        assert!(st.has_task("fw-1", "web.0"));
        assert_eq!(st.task("fw-0", "job.7").expect("completed").executor_id(), "exec-7");
        assert!(matches!(st.task("fw-1", "missing"), Err(Error::UnknownTask(_))));
    }

    #[test]
    fn test_task_lookup_is_scoped_to_framework() {
        let st = MasterState::new(json!({
            "frameworks": [
                {"id": "fw-a", "tasks": [{"id": "worker", "slave_id": "s1", "framework_id": "fw-a"}]},
                {"id": "fw-b", "tasks": [{"id": "worker", "slave_id": "s2", "framework_id": "fw-b"}]}
            ]
        }));
        assert_eq!(st.task("fw-a", "worker").expect("a").slave_id(), "s1");
        assert_eq!(st.task("fw-b", "worker").expect("b").slave_id(), "s2");
        assert!(!st.has_task("fw-c", "worker"));
        assert!(!st.has_task("fw-1", "job.7"));
    }

    #[test]
    fn test_executor_id_defaults_to_task_id() {
        let task = state().task("fw-1", "web.1").expect("task");
        assert_eq!(task.executor_id(), "web.1");
    }

    #[test]
    fn test_executor_directory() {
        let agent = json!({
            "frameworks": [],
            "completed_frameworks": [
                {"id": "fw-0", "executors": [], "completed_executors": [
                    {"id": "exec-7", "directory": "/var/lib/mesos/slaves/s2/runs/abc"}
                ]}
            ]
        });
        let task = state().task("fw-0", "job.7").expect("task");
        assert_eq!(
            executor_directory(&agent, &task).as_deref(),
            Some("/var/lib/mesos/slaves/s2/runs/abc")
        );
        let other = state().task("fw-1", "web.1").expect("task");
        assert_eq!(executor_directory(&agent, &other), None);
    }

    #[test]
    fn test_browse_entry_basename() {
        let entry: BrowseEntry = serde_json::from_value(json!({
            "path": "/var/sandbox/stdout", "mode": "-rw-r--r--", "size": 42,
            "mtime": 1.5e9, "nlink": 1, "uid": "root", "gid": "root"
        }))
        .expect("entry");
        assert_eq!(entry.basename(), "stdout");
        assert_eq!(entry.size, 42);
    }
}
