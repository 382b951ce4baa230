use std::sync::Arc;

use cmd::commands::{cat_command, list_command, mount_command};
use dcosfs::testing::{FakeCluster, ManualClock, agent_state_fixture, browse_entry, sandbox_path};
use dcosfs::{ContentLocator, DcosFilesystem, FsConfig, FsContext};
use serde_json::json;

fn filesystem(cluster: &Arc<FakeCluster>) -> DcosFilesystem {
    let config = FsConfig::new("http://dcos.example.com").with_mount_point("/mnt/dcos");
    let ctx = FsContext::with_clock(cluster.clone(), config, Arc::new(ManualClock::new()));
    _ = ctx.master.refresh_once().expect("master");
    DcosFilesystem::with_context(ctx).expect("filesystem")
}

fn cluster() -> Arc<FakeCluster> {
    let cluster = Arc::new(FakeCluster::new());
    cluster.set_master(json!({
        "frameworks": [{
            "id": "fw-1",
            "name": "marathon",
            "tasks": [{"id": "web.1", "slave_id": "S1", "framework_id": "fw-1"}]
        }],
        "slaves": [{"id": "S1"}]
    }));
    cluster.set_agent_state("S1", agent_state_fixture("S1", &[("fw-1", "web.1")]));
    let sandbox = sandbox_path("S1", "web.1");
    cluster.set_browse(
        "S1",
        &sandbox,
        vec![browse_entry(&format!("{sandbox}/stdout"), "-rw-r--r--", 12)],
    );
    cluster.set_file(
        &ContentLocator::agent("S1", format!("{sandbox}/stdout")),
        "hello world\n",
    );
    cluster.set_apps(vec![json!({"id": "/web"})]);
    cluster.set_app_tasks("/web", vec![json!({"id": "web.1", "appId": "/web"})]);
    cluster
}

fn list(fs: &DcosFilesystem, path: &str, long: bool) -> Vec<String> {
    let mut lines = Vec::new();
    list_command(fs, path, long, |line| lines.push(line)).expect("list");
    lines
}

#[test]
fn test_ls_root() {
    let cluster = cluster();
    let fs = filesystem(&cluster);
    assert_eq!(list(&fs, "/", false), vec!["frameworks/", "marathon/", "nodes/"]);
}

#[test]
fn test_ls_long_shows_links_and_sizes() {
    let cluster = cluster();
    let fs = filesystem(&cluster);

    let lines = list(&fs, "/marathon/apps/_web/tasks/web.1", true);
    assert_eq!(lines.len(), 2);
    assert!(
        lines[0].starts_with('l')
            && lines[0].ends_with("sandbox -> /mnt/dcos/frameworks/marathon/tasks/web.1/sandbox"),
        "{}",
        lines[0]
    );
    assert!(lines[1].starts_with("-755") && lines[1].ends_with("state.json"));

    let lines = list(&fs, "/frameworks/marathon/tasks/web.1/sandbox", true);
    assert_eq!(lines, vec![format!("-755 {:>10} stdout", 12)]);
}

#[test]
fn test_ls_of_a_file_lists_itself() {
    let cluster = cluster();
    let fs = filesystem(&cluster);
    assert_eq!(
        list(&fs, "/frameworks/marathon/state.json", false),
        vec!["/frameworks/marathon/state.json"]
    );
}

#[test]
fn test_ls_missing_path() {
    let cluster = cluster();
    let fs = filesystem(&cluster);
    let err = list_command(&fs, "/nope", false, |_| {}).expect_err("missing");
    assert!(format!("{err:#}").contains("/nope"));
}

#[test]
fn test_cat_sandbox_file() {
    let cluster = cluster();
    let fs = filesystem(&cluster);
    let mut out = Vec::new();
    let n = cat_command(&fs, "/frameworks/marathon/tasks/web.1/sandbox/stdout", &mut out)
        .expect("cat");
    assert_eq!(n, 12);
    assert_eq!(out, b"hello world\n");
}

#[test]
fn test_cat_state_json() {
    let cluster = cluster();
    let fs = filesystem(&cluster);
    let mut out = Vec::new();
    _ = cat_command(&fs, "/marathon/apps/_web/state.json", &mut out).expect("cat");
    let app: serde_json::Value = serde_json::from_slice(&out).expect("json");
    assert_eq!(app["id"], "/web");
}

#[test]
fn test_cat_directory_fails() {
    let cluster = cluster();
    let fs = filesystem(&cluster);
    let mut out = Vec::new();
    assert!(cat_command(&fs, "/nodes", &mut out).is_err());
    assert!(out.is_empty());
}

#[test]
fn test_mount_rejects_missing_mount_point() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = FsConfig::new("http://dcos.example.com").with_mount_point(dir.path().join("missing"));
    let err = mount_command(config).expect_err("missing mount point");
    assert!(err.to_string().contains("missing"));
}
