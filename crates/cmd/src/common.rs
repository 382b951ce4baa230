use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use dcosfs::{DcosFilesystem, FsConfig, HttpCluster, load_config};

pub const DCOS_URL_ENV: &str = "DCOS_URL";
pub const DCOS_TOKEN_ENV: &str = "DCOS_ACS_TOKEN";

/// Settings given on the command line; they win over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub dcos_url: Option<String>,
    pub mount_point: Option<PathBuf>,
}

/// Builds the filesystem configuration from the config file, the command
/// line and the environment, in that order of increasing precedence for
/// flags. The environment only fills values that are still unset.
pub fn resolve_config<F>(overrides: &ConfigOverrides, env: F) -> Result<FsConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &overrides.config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let url = overrides
                .dcos_url
                .clone()
                .or_else(|| env(DCOS_URL_ENV))
                .ok_or_else(|| {
                    anyhow!("No cluster URL: pass --dcos-url, --config or set {DCOS_URL_ENV}")
                })?;
            FsConfig::new(url)
        }
    };

    if let Some(url) = &overrides.dcos_url {
        config.dcos_url = url.clone();
    }
    if let Some(mount_point) = &overrides.mount_point {
        config.mount_point = mount_point.clone();
    }
    if config.acs_token.is_none() {
        config.acs_token = env(DCOS_TOKEN_ENV);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// `resolve_config` against the process environment.
pub fn resolve_config_from_env(overrides: &ConfigOverrides) -> Result<FsConfig> {
    resolve_config(overrides, |name| std::env::var(name).ok())
}

/// Connects to the cluster and builds the tree. Fails if the master cannot
/// be reached.
pub fn open_filesystem(config: FsConfig) -> Result<DcosFilesystem> {
    let url = config.dcos_url.clone();
    let client = HttpCluster::new(&config).context("Failed to create HTTP client")?;
    DcosFilesystem::new(Arc::new(client), config)
        .with_context(|| format!("Failed to read master state from {url}"))
}

/// Checks that `mount_point` is an existing directory and returns its
/// absolute, symlink-free form.
pub fn check_mount_point(mount_point: &Path) -> Result<PathBuf> {
    let meta = std::fs::metadata(mount_point)
        .with_context(|| format!("Mount point {} is not accessible", mount_point.display()))?;
    if !meta.is_dir() {
        return Err(anyhow!("Mount point {} is not a directory", mount_point.display()));
    }
    std::fs::canonicalize(mount_point)
        .with_context(|| format!("Cannot resolve mount point {}", mount_point.display()))
}

/// Replaces the configured mount point with its absolute form, so the
/// Marathon sandbox links point into the mount wherever they are read from.
pub fn prepare_mount(mut config: FsConfig) -> Result<FsConfig> {
    config.mount_point = check_mount_point(&config.mount_point)?;
    Ok(config)
}
