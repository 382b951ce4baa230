//! The mounted layout.
//!
//! ```text
//! /frameworks/<name>/state.json
//! /frameworks/<name>/tasks/<task-id>/{state.json,sandbox/}
//! /marathon/apps/<app>/state.json
//! /marathon/apps/<app>/tasks/<task-id>/{state.json,sandbox -> ...}
//! /nodes/master/log
//! /nodes/slaves/<slave-id>/log
//! ```

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::{Listing, ListingSource, RefreshPolicy, RemoteListingCache};
use crate::cluster::ContentLocator;
use crate::context::FsContext;
use crate::dir::{DirBuilder, Directory};
use crate::error::{Error, Result};
use crate::file::RegularFile;
use crate::node::{FileNode, NodeRef};
use crate::sandbox::SandboxRegistry;
use crate::symlink::Symlink;

pub const MASTER_LOG: &str = "/master/log";
pub const AGENT_LOG: &str = "/slave/log";

/// Directory name of a Marathon app: `/group/web` becomes `_group_web`.
pub fn app_dir_name(app_id: &str) -> String {
    app_id.replace('/', "_")
}

/// Where `/marathon/apps/<app>/tasks/<task>/sandbox` points.
pub fn marathon_sandbox_target(mount_point: &Path, task_id: &str) -> String {
    mount_point
        .join("frameworks")
        .join("marathon")
        .join("tasks")
        .join(task_id)
        .join("sandbox")
        .to_string_lossy()
        .into_owned()
}

/// Builds the root directory. Nothing is fetched until a dynamic
/// directory is listed.
pub fn build_root(ctx: &Arc<FsContext>) -> Result<NodeRef> {
    let sandboxes = Arc::new(SandboxRegistry::new());
    let topology = ctx.config.topology_policy();

    let mut marathon = DirBuilder::new();
    marathon.insert_ref("apps", dynamic(ctx, AppsListing { ctx: ctx.clone() }, topology))?;

    let mut master = DirBuilder::new();
    master.insert("log", remote_file(ctx, ContentLocator::master(MASTER_LOG)))?;

    let mut nodes = DirBuilder::new();
    nodes.insert_ref("master", master.build_ref())?;
    nodes.insert_ref("slaves", dynamic(ctx, SlavesListing { ctx: ctx.clone() }, topology))?;

    let mut root = DirBuilder::new();
    root.insert_ref(
        "frameworks",
        dynamic(
            ctx,
            FrameworksListing {
                ctx: ctx.clone(),
                sandboxes,
            },
            topology,
        ),
    )?;
    root.insert_ref("marathon", marathon.build_ref())?;
    root.insert_ref("nodes", nodes.build_ref())?;
    Ok(root.build_ref())
}

fn dynamic<S: ListingSource + 'static>(ctx: &FsContext, source: S, policy: RefreshPolicy) -> NodeRef {
    FileNode::Directory(Directory::new_dynamic(RemoteListingCache::new(
        source,
        policy,
        ctx.clock.clone(),
    )))
    .into_ref()
}

fn remote_file(ctx: &FsContext, locator: ContentLocator) -> RegularFile {
    RegularFile::new_remote(
        locator,
        None,
        None,
        ctx.client.clone(),
        ctx.clock.clone(),
        ctx.config.file_size_ttl(),
    )
}

fn id_of(value: &Value) -> Result<&str> {
    value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidResponse(format!("record without an id: {value}")))
}

/// `/frameworks`: one directory per active framework, by name.
struct FrameworksListing {
    ctx: Arc<FsContext>,
    sandboxes: Arc<SandboxRegistry>,
}

impl ListingSource for FrameworksListing {
    fn fetch(&self) -> Result<Listing> {
        let master = self.ctx.master.get()?;
        let mut listing = Listing::new();
        for framework in master.frameworks() {
            let name = framework.name().to_string();
            if listing.contains_key(&name) {
                let id = framework.id();
                diagnostics::warn!("Framework name {name} is used twice, hiding {id}", name: name, id: id);
                continue;
            }
            diagnostics::info!("Framework: {name}", name: name);
            let source = FrameworkListing {
                ctx: self.ctx.clone(),
                sandboxes: self.sandboxes.clone(),
                framework_id: framework.id().to_string(),
            };
            _ = listing.insert(name, dynamic(&self.ctx, source, self.ctx.config.topology_policy()));
        }
        Ok(listing)
    }

    fn describe(&self) -> String {
        "/frameworks".to_string()
    }
}

/// `/frameworks/<name>`: the framework record and its tasks.
struct FrameworkListing {
    ctx: Arc<FsContext>,
    sandboxes: Arc<SandboxRegistry>,
    framework_id: String,
}

impl ListingSource for FrameworkListing {
    fn fetch(&self) -> Result<Listing> {
        let master = self.ctx.master.get()?;
        let framework = master.framework(&self.framework_id)?;
        let tasks = framework.tasks();

        let name = framework.name();
        let count = tasks.len();
        diagnostics::info!("Framework: {name}: Num Tasks: {count}", name: name, count: count);

        let mut tasks_dir = DirBuilder::new();
        for task in &tasks {
            let source = TaskListing {
                ctx: self.ctx.clone(),
                sandboxes: self.sandboxes.clone(),
                framework_id: self.framework_id.clone(),
                task_id: task.id().to_string(),
            };
            tasks_dir.insert_ref(
                task.id(),
                dynamic(&self.ctx, source, self.ctx.config.topology_policy()),
            )?;
        }

        let mut listing = DirBuilder::new();
        listing.insert("state.json", RegularFile::new_json(framework.value())?)?;
        listing.insert_ref("tasks", tasks_dir.build_ref())?;
        Ok(listing.into_listing())
    }

    fn describe(&self) -> String {
        format!("framework {}", self.framework_id)
    }
}

/// `/frameworks/<name>/tasks/<task-id>`: the task record and its sandbox.
struct TaskListing {
    ctx: Arc<FsContext>,
    sandboxes: Arc<SandboxRegistry>,
    framework_id: String,
    task_id: String,
}

impl ListingSource for TaskListing {
    fn fetch(&self) -> Result<Listing> {
        let master = self.ctx.master.get()?;
        let task = master.task(&self.framework_id, &self.task_id)?;
        let sandbox = self
            .sandboxes
            .sandbox_for(&self.ctx, &self.framework_id, &task, &master);

        let mut listing = DirBuilder::new();
        listing.insert("state.json", RegularFile::new_json(task.value())?)?;
        listing.insert_ref("sandbox", sandbox)?;
        Ok(listing.into_listing())
    }

    fn describe(&self) -> String {
        format!("task {} of {}", self.task_id, self.framework_id)
    }
}

/// `/marathon/apps`: one directory per app.
struct AppsListing {
    ctx: Arc<FsContext>,
}

impl ListingSource for AppsListing {
    fn fetch(&self) -> Result<Listing> {
        let apps = self.ctx.client.apps()?;
        let count = apps.len();
        diagnostics::info!("Marathon reports {count} apps", count: count);

        let mut listing = Listing::new();
        for app in &apps {
            let app_id = id_of(app)?;
            let name = app_dir_name(app_id);
            if listing.contains_key(&name) {
                diagnostics::warn!("App directory {name} is used twice, hiding {app_id}", name: name, app_id: app_id);
                continue;
            }
            let source = AppListing {
                ctx: self.ctx.clone(),
                app_id: app_id.to_string(),
            };
            _ = listing.insert(name, dynamic(&self.ctx, source, self.ctx.config.topology_policy()));
        }
        Ok(listing)
    }

    fn describe(&self) -> String {
        "/marathon/apps".to_string()
    }
}

/// `/marathon/apps/<app>`: the app record and its running tasks. Task
/// sandboxes link into `/frameworks/marathon`.
struct AppListing {
    ctx: Arc<FsContext>,
    app_id: String,
}

impl ListingSource for AppListing {
    fn fetch(&self) -> Result<Listing> {
        let app = self.ctx.client.app(&self.app_id)?;
        let app_id = id_of(&app).unwrap_or(self.app_id.as_str());

        let mut tasks_dir = DirBuilder::new();
        for task in self.ctx.client.app_tasks(app_id)? {
            let task_id = id_of(&task)?;
            let mut task_dir = DirBuilder::new();
            task_dir.insert("state.json", RegularFile::new_json(&task)?)?;
            task_dir.insert(
                "sandbox",
                Symlink::new(marathon_sandbox_target(&self.ctx.config.mount_point, task_id)),
            )?;
            tasks_dir.insert_ref(task_id, task_dir.build_ref())?;
        }

        let mut listing = DirBuilder::new();
        listing.insert("state.json", RegularFile::new_json(&app)?)?;
        listing.insert_ref("tasks", tasks_dir.build_ref())?;
        Ok(listing.into_listing())
    }

    fn describe(&self) -> String {
        format!("app {}", self.app_id)
    }
}

/// `/nodes/slaves`: one directory per agent holding its log.
struct SlavesListing {
    ctx: Arc<FsContext>,
}

impl ListingSource for SlavesListing {
    fn fetch(&self) -> Result<Listing> {
        let master = self.ctx.master.get()?;
        let mut listing = DirBuilder::new();
        for slave in master.slaves() {
            let mut slave_dir = DirBuilder::new();
            slave_dir.insert("log", remote_file(&self.ctx, ContentLocator::agent(slave.id(), AGENT_LOG)))?;
            listing.insert_ref(slave.id(), slave_dir.build_ref())?;
        }
        Ok(listing.into_listing())
    }

    fn describe(&self) -> String {
        "/nodes/slaves".to_string()
    }
}
