use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::RefreshPolicy;
use crate::error::{Error, Result};

/// Settings for one mounted filesystem.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FsConfig {
    /// Base URL of the cluster, e.g. `https://dcos.example.com`.
    pub dcos_url: String,

    /// Sent as `Authorization: token=...` when present.
    #[serde(default)]
    pub acs_token: Option<String>,

    /// Where the tree is mounted; symlink targets are built under it.
    #[serde(default)]
    pub mount_point: PathBuf,

    #[serde(default = "default_master_refresh_secs")]
    pub master_refresh_secs: u64,

    #[serde(default = "default_sandbox_ttl_secs")]
    pub sandbox_ttl_secs: u64,

    /// 0 refreshes frameworks, tasks, apps and agents on every call.
    #[serde(default)]
    pub topology_ttl_secs: u64,

    #[serde(default = "default_file_size_ttl_secs")]
    pub file_size_ttl_secs: u64,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_allow_other")]
    pub allow_other: bool,
}

fn default_master_refresh_secs() -> u64 {
    5
}

fn default_sandbox_ttl_secs() -> u64 {
    10
}

fn default_file_size_ttl_secs() -> u64 {
    10
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_allow_other() -> bool {
    true
}

impl FsConfig {
    pub fn new<S: Into<String>>(dcos_url: S) -> Self {
        Self {
            dcos_url: dcos_url.into(),
            acs_token: None,
            mount_point: PathBuf::new(),
            master_refresh_secs: default_master_refresh_secs(),
            sandbox_ttl_secs: default_sandbox_ttl_secs(),
            topology_ttl_secs: 0,
            file_size_ttl_secs: default_file_size_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            allow_other: default_allow_other(),
        }
    }

    #[must_use]
    pub fn with_mount_point<P: AsRef<Path>>(mut self, mount_point: P) -> Self {
        self.mount_point = mount_point.as_ref().to_path_buf();
        self
    }

    pub fn master_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.master_refresh_secs)
    }

    pub fn sandbox_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_secs(self.sandbox_ttl_secs)
    }

    pub fn topology_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_secs(self.topology_ttl_secs)
    }

    pub fn file_size_ttl(&self) -> Duration {
        Duration::from_secs(self.file_size_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dcos_url.is_empty() {
            return Err(Error::config("dcos_url cannot be empty"));
        }
        let url = url::Url::parse(&self.dcos_url)
            .map_err(|e| Error::config(format!("invalid dcos_url '{}': {}", self.dcos_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "dcos_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.master_refresh_secs == 0 {
            return Err(Error::config("master_refresh_secs must be greater than 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::config("http_timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

/// Load configuration from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FsConfig> {
    let content = std::fs::read_to_string(&path)?;
    let config: FsConfig = serde_yaml_ng::from_str(&content).map_err(|e| {
        Error::config(format!(
            "failed to parse {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    config.validate()?;
    Ok(config)
}
