// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end behavior of the mounted tree against a scripted cluster.

use std::sync::Arc;
use std::time::Duration;

use dcosfs::testing::{
    FakeCluster, ManualClock, agent_state_fixture, browse_entry, sandbox_path,
};
use dcosfs::{ContentLocator, DcosFilesystem, EntryType, Error, FsConfig, FsContext};
use serde_json::{Value, json};

struct Harness {
    cluster: Arc<FakeCluster>,
    clock: Arc<ManualClock>,
    fs: DcosFilesystem,
}

fn harness(master: Value) -> Harness {
    let cluster = Arc::new(FakeCluster::new());
    cluster.set_master(master);
    let clock = Arc::new(ManualClock::new());
    let config = FsConfig::new("http://dcos.example.com").with_mount_point("/mnt/dcos");
    let ctx = FsContext::with_clock(cluster.clone(), config, clock.clone());
    _ = ctx.master.refresh_once().expect("master state");
    let fs = DcosFilesystem::with_context(ctx).expect("filesystem");
    Harness { cluster, clock, fs }
}

fn marathon_master() -> Value {
    json!({
        "frameworks": [{
            "id": "fw-marathon",
            "name": "marathon",
            "tasks": [{
                "id": "web.1",
                "name": "web",
                "slave_id": "S1",
                "framework_id": "fw-marathon",
                "state": "TASK_RUNNING"
            }]
        }],
        "slaves": [{"id": "S1", "hostname": "10.0.0.1"}]
    })
}

/// A harness whose `web.1` sandbox holds `stdout` (42 bytes) and `logs/`.
fn sandbox_harness() -> Harness {
    let h = harness(marathon_master());
    h.cluster
        .set_agent_state("S1", agent_state_fixture("S1", &[("fw-marathon", "web.1")]));
    let root = sandbox_path("S1", "web.1");
    h.cluster.set_browse(
        "S1",
        &root,
        vec![
            browse_entry(&format!("{root}/stdout"), "-rw-r--r--", 42),
            browse_entry(&format!("{root}/logs"), "drwxr-xr-x", 4096),
        ],
    );
    h.cluster
        .set_file(&ContentLocator::agent("S1", format!("{root}/stdout")), vec![b'x'; 42]);
    h
}

const SANDBOX: &str = "/frameworks/marathon/tasks/web.1/sandbox";

#[test]
fn test_no_frameworks_lists_only_dots() {
    let h = harness(json!({"frameworks": []}));
    assert_eq!(h.fs.readdir("/frameworks").expect("readdir"), vec![".", ".."]);
}

#[test]
fn test_sandbox_file_has_listed_size() {
    let h = sandbox_harness();
    assert_eq!(
        h.fs.readdir(SANDBOX).expect("readdir"),
        vec![".", "..", "logs", "stdout"]
    );

    let stat = h.fs.getattr(&format!("{SANDBOX}/stdout")).expect("stat");
    assert_eq!(stat.entry_type(), Some(EntryType::File));
    assert_eq!(stat.size_bytes(), 42);
    assert_eq!(
        h.fs.getattr(&format!("{SANDBOX}/logs")).expect("stat").entry_type(),
        Some(EntryType::Directory)
    );
}

#[test]
fn test_stat_size_never_exceeds_read() {
    let h = sandbox_harness();
    let path = format!("{SANDBOX}/stdout");
    let size = h.fs.getattr(&path).expect("stat").size_bytes();
    let data = h.fs.read(&path, 4096, 0, 0).expect("read");
    assert!(size <= data.len() as u64);
}

#[test]
fn test_browse_failure_reaches_readdir() {
    let h = harness(marathon_master());
    h.cluster
        .set_agent_state("S1", agent_state_fixture("S1", &[("fw-marathon", "web.1")]));
    h.cluster
        .fail_browse("S1", &sandbox_path("S1", "web.1"), "connection reset");

    let err = h.fs.readdir(SANDBOX).expect_err("browse failed");
    assert!(matches!(err, Error::RemoteFetch { .. }));
    assert_eq!(err.errno(), libc::EIO);
}

#[test]
fn test_sandbox_listing_cached_within_ttl() {
    let h = sandbox_harness();
    _ = h.fs.readdir(SANDBOX).expect("first");
    _ = h.fs.readdir(SANDBOX).expect("second");
    // The task directory above is rebuilt on every call; the sandbox is not.
    assert_eq!(h.cluster.browse_calls(), 1);

    h.clock.advance(Duration::from_secs(10));
    _ = h.fs.readdir(SANDBOX).expect("third");
    assert_eq!(h.cluster.browse_calls(), 2);
}

#[test]
fn test_marathon_sandbox_link() {
    let h = harness(marathon_master());
    h.cluster
        .set_apps(vec![json!({"id": "/web", "instances": 1})]);
    h.cluster
        .set_app_tasks("/web", vec![json!({"id": "web.1", "appId": "/web"})]);

    assert_eq!(
        h.fs.readlink("/marathon/apps/_web/tasks/web.1/sandbox").expect("readlink"),
        "/mnt/dcos/frameworks/marathon/tasks/web.1/sandbox"
    );
    let stat = h
        .fs
        .getattr("/marathon/apps/_web/tasks/web.1/sandbox")
        .expect("stat");
    assert_eq!(stat.entry_type(), Some(EntryType::Symlink));
    assert_eq!(stat.size_bytes(), "/mnt/dcos/frameworks/marathon/tasks/web.1/sandbox".len() as u64);
}

#[test]
fn test_missing_intermediate_is_not_found() {
    let h = harness(marathon_master());
    assert!(matches!(
        h.fs.getattr("/frameworks/chronos/state.json"),
        Err(Error::NoSuchEntry(_))
    ));
    assert!(matches!(
        h.fs.getattr("/frameworks/marathon/state.json/x"),
        Err(Error::NoSuchEntry(_))
    ));
}

#[test]
fn test_state_json_reflects_master() {
    let h = harness(marathon_master());
    let path = "/frameworks/marathon/tasks/web.1/state.json";
    let size = h.fs.getattr(path).expect("stat").size_bytes();
    let data = h.fs.read(path, size, 0, 0).expect("read");
    let task: Value = serde_json::from_slice(&data).expect("json");
    assert_eq!(task["state"], "TASK_RUNNING");

    // A new snapshot changes what the next read sees.
    let mut updated = marathon_master();
    updated["frameworks"][0]["tasks"][0]["state"] = json!("TASK_FINISHED");
    h.cluster.set_master(updated);
    _ = h.fs.context().master.refresh_once().expect("refresh");

    let size = h.fs.getattr(path).expect("stat").size_bytes();
    let data = h.fs.read(path, size, 0, 0).expect("read");
    let task: Value = serde_json::from_slice(&data).expect("json");
    assert_eq!(task["state"], "TASK_FINISHED");
}

#[test]
fn test_master_outage_keeps_serving() {
    let h = harness(marathon_master());
    h.cluster.fail_master(1);
    assert!(h.fs.context().master.refresh_once().is_err());
    assert_eq!(
        h.fs.readdir("/frameworks").expect("readdir"),
        vec![".", "..", "marathon"]
    );
}

#[test]
fn test_new_requires_master() {
    let cluster = Arc::new(FakeCluster::new());
    cluster.fail_master(1);
    let config = FsConfig::new("http://dcos.example.com");
    assert!(DcosFilesystem::new(cluster.clone(), config.clone()).is_err());

    let fs = DcosFilesystem::new(cluster, config).expect("second attempt");
    assert!(fs.context().master.is_initialized());
}

#[test]
fn test_agent_logs() {
    let h = harness(marathon_master());
    h.cluster
        .set_file(&ContentLocator::agent("S1", "/slave/log"), "agent started\n");
    assert_eq!(
        h.fs.readdir("/nodes/slaves").expect("readdir"),
        vec![".", "..", "S1"]
    );
    assert_eq!(
        h.fs.read("/nodes/slaves/S1/log", 5, 0, 0).expect("read"),
        b"agent"
    );
}
