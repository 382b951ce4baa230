use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cmd::commands::{cat_command, list_command, mount_command};
use cmd::common::{ConfigOverrides, open_filesystem, resolve_config_from_env};

#[derive(Parser)]
#[command(author, version, about = "Browse a DC/OS cluster as a filesystem", long_about = None)]
#[command(name = "dcos-fs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cluster URL, overrides the config file and DCOS_URL
    #[arg(long, global = true)]
    dcos_url: Option<String>,

    /// Log at debug level regardless of DCOSFS_LOG
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the cluster and serve it until unmounted
    Mount {
        /// Existing directory to mount on
        mount_point: PathBuf,
    },
    /// List a directory of the cluster tree without mounting
    Ls {
        /// Path inside the tree, e.g. /frameworks
        #[arg(default_value = "/")]
        path: String,
        /// Show type, permissions, size and link targets
        #[arg(short, long)]
        long: bool,
    },
    /// Print a file of the cluster tree without mounting
    Cat {
        /// Path inside the tree, e.g. /nodes/master/log
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        diagnostics::init_with_level(diagnostics::emit::Level::Debug);
    } else {
        diagnostics::init_diagnostics();
    }

    let mut overrides = ConfigOverrides {
        config_path: cli.config,
        dcos_url: cli.dcos_url,
        mount_point: None,
    };

    match cli.command {
        Commands::Mount { mount_point } => {
            overrides.mount_point = Some(mount_point);
            let config = resolve_config_from_env(&overrides)?;
            mount_command(config)
        }
        Commands::Ls { path, long } => {
            let fs = open_filesystem(resolve_config_from_env(&overrides)?)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mut result = Ok(());
            list_command(&fs, &path, long, |line| {
                if result.is_ok() {
                    result = writeln!(out, "{line}");
                }
            })?;
            result.context("Failed to write output")
        }
        Commands::Cat { path } => {
            let fs = open_filesystem(resolve_config_from_env(&overrides)?)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            _ = cat_command(&fs, &path, &mut out)?;
            Ok(())
        }
    }
}
