//! CLI for kbin.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use kbin_core::config;
use std::path::{Path, PathBuf};

use commands::{run_artifact, run_checksum, run_completions, run_fetch, run_man, run_plan};

/// Top-level CLI for kbin.
#[derive(Debug, Parser)]
#[command(name = "kbin")]
#[command(about = "kbin: fetch, verify and cache Kubernetes node binaries", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/kbin/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the binaries for an online cluster install.
    Fetch {
        /// Kubernetes version for kubeadm, kubelet and kubectl (e.g. v1.21.5).
        #[arg(long)]
        kube_version: String,
        /// Target architectures, comma separated.
        #[arg(long = "arch", default_value = "amd64", value_delimiter = ',')]
        arches: Vec<String>,
        /// KubeSphere version; v2.1.1 also fetches the helm2 client.
        #[arg(long)]
        kubesphere_version: Option<String>,
        /// Print the resolved binaries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Download the binaries listed in an offline artifact manifest.
    Artifact {
        /// Path to the artifact manifest (TOML).
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long)]
        kube_version: String,
        #[arg(long = "arch", default_value = "amd64", value_delimiter = ',')]
        arches: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show what would be fetched and where, without downloading.
    Plan {
        #[arg(long)]
        kube_version: String,
        #[arg(long = "arch", default_value = "amd64", value_delimiter = ',')]
        arches: Vec<String>,
        /// Plan from an artifact manifest instead of the default versions.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Compute SHA-256 of a file (e.g. to fill in the checksum table).
    Checksum {
        /// Path to the file.
        path: String,
    },

    /// Print shell completions.
    Completions {
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match &cli.command {
            CliCommand::Completions { shell } => return run_completions(*shell),
            CliCommand::Man => return run_man(),
            CliCommand::Checksum { path } => return run_checksum(Path::new(path)),
            _ => {}
        }

        let cfg = match &cli.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                kube_version,
                arches,
                kubesphere_version,
                json,
            } => run_fetch(&cfg, &kube_version, &arches, kubesphere_version.as_deref(), json)?,
            CliCommand::Artifact {
                manifest,
                kube_version,
                arches,
                json,
            } => run_artifact(&cfg, &manifest, &kube_version, &arches, json)?,
            CliCommand::Plan {
                kube_version,
                arches,
                manifest,
            } => run_plan(&cfg, &kube_version, &arches, manifest.as_deref())?,
            CliCommand::Checksum { .. } | CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
