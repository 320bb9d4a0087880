//! `acm-mirror` run: sync ACM images into a mirror registry and write the
//! ImageContentSourcePolicy.

use std::path::PathBuf;

use acm_mirror_core::config::default_pull_secret;
use acm_mirror_core::{FailedEntryPolicy, ManifestLocation, MirrorConfig};
use acm_mirror_runtime::Pipeline;
use clap::Args;

use crate::output;

#[derive(Args, Debug, Default)]
pub struct MirrorArgs {
    /// Mirror registry to copy images into (e.g., "registry.local:5000")
    #[arg(short = 'm', long = "mirror", value_name = "REGISTRY")]
    pub mirror: Option<String>,

    /// Registry auth file (default: acmd-pull-secret.json next to the binary)
    #[arg(short = 'p', long = "pullsecret", value_name = "PATH")]
    pub pull_secret: Option<PathBuf>,

    /// Print the copy commands without running them
    #[arg(short = 'd', long = "dryrun")]
    pub dry_run: bool,

    /// Pull manifest images from this registry/namespace instead
    #[arg(short = 'r', long = "remote", value_name = "REGISTRY/NAMESPACE")]
    pub remote: Option<String>,

    /// YAML configuration file; flags override its values
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use a local manifest instead of downloading one
    #[arg(long, value_name = "PATH", conflicts_with = "manifest_url")]
    pub manifest: Option<PathBuf>,

    /// Download the manifest from this URL
    #[arg(long, value_name = "URL")]
    pub manifest_url: Option<String>,

    /// Policy output file
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Leave images whose copy failed out of the policy
    #[arg(long)]
    pub skip_failed_entries: bool,

    /// Kill a copy that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub copy_timeout: Option<u64>,

    /// Registry copy binary
    #[arg(long, value_name = "BIN")]
    pub copy_tool: Option<String>,

    /// Cluster admin binary
    #[arg(long, value_name = "BIN")]
    pub admin_tool: Option<String>,

    /// Also build and mirror the operator catalogs
    #[arg(long)]
    pub sync_catalogs: bool,
}

impl MirrorArgs {
    /// Merge flags over the config file (or defaults).
    pub fn into_config(self) -> acm_mirror_core::Result<MirrorConfig> {
        let mut config = match self.config {
            Some(ref path) => MirrorConfig::from_file(path)?,
            None => MirrorConfig::default(),
        };

        if let Some(mirror) = self.mirror {
            config.mirror_registry = Some(mirror);
        }
        if let Some(pull_secret) = self.pull_secret {
            config.pull_secret = Some(pull_secret);
        }
        if config.pull_secret.is_none() {
            config.pull_secret = Some(default_pull_secret());
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(remote) = self.remote {
            config.source_override = Some(remote);
        }

        if let Some(path) = self.manifest {
            config.manifest = ManifestLocation::File { path };
        } else if let Some(url) = self.manifest_url {
            let dir = match config.manifest {
                ManifestLocation::Fetch { dir, .. } => dir,
                ManifestLocation::File { .. } => PathBuf::from("."),
            };
            config.manifest = ManifestLocation::Fetch { url, dir };
        }

        if let Some(output) = self.output {
            config.output = output;
        }
        if self.skip_failed_entries {
            config.policy_on_failure = FailedEntryPolicy::Skip;
        }
        if self.copy_timeout.is_some() {
            config.copy_timeout_secs = self.copy_timeout;
        }
        if let Some(tool) = self.copy_tool {
            config.copy_tool = tool;
        }
        if let Some(tool) = self.admin_tool {
            config.admin_tool = tool;
        }
        if self.sync_catalogs {
            config.catalogs.enabled = true;
        }

        Ok(config)
    }
}

/// Run the mirror pipeline and return the process exit code.
pub async fn execute(args: MirrorArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = args.into_config()?;
    tracing::debug!(config = ?config, "Resolved configuration");

    let pipeline = Pipeline::with_process_runner(config);
    let report = match pipeline.run().await {
        Ok(report) => report,
        Err(e) => {
            if let Some(hint) = e.hint() {
                eprintln!("Hint: {hint}");
            }
            return Err(e.into());
        }
    };

    output::print_summary(&report);
    Ok(report.exit_code())
}
