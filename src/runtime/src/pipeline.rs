//! Mirror pipeline driver.
//!
//! `Init -> LoadManifest -> per image {Resolve -> Sync -> Accumulate} -> Serialize`.
//! Configuration and tool checks abort before anything is fetched or copied;
//! per-image problems only affect that image.

use std::path::PathBuf;

use acm_mirror_core::error::{MirrorError, Result};
use acm_mirror_core::{FailedEntryPolicy, ManifestLocation, MirrorConfig};

use crate::catalog::{sync_catalogs, CatalogReport};
use crate::image::{
    fetch_manifest, policy_source, resolve, DescriptorSource, ImageDescriptor, LatestManifestInDir,
    ManifestFile,
};
use crate::policy::MirrorPolicy;
use crate::sync::{SyncExecutor, SyncOutcome};
use crate::tools::{ProcessToolRunner, ToolRunner};

/// Exit code when every image and catalog synced.
pub const EXIT_OK: i32 = 0;

/// Exit code when the run completed but some images failed or were skipped.
pub const EXIT_PARTIAL_FAILURE: i32 = 3;

/// Summary of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Manifest the descriptors were loaded from
    pub manifest: PathBuf,
    /// Policy output path
    pub output: PathBuf,
    /// Entries written to the policy
    pub entries: usize,
    /// Images copied (or that would be copied, in dry-run)
    pub succeeded: usize,
    /// Sources whose copy failed
    pub failed: Vec<String>,
    /// Descriptors that could not be resolved
    pub skipped: Vec<String>,
    /// Catalog results, when catalog sync ran
    pub catalogs: Option<CatalogReport>,
}

impl RunReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
            && self.skipped.is_empty()
            && self.catalogs.as_ref().map_or(true, |c| c.failed.is_empty())
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_complete_success() {
            EXIT_OK
        } else {
            EXIT_PARTIAL_FAILURE
        }
    }
}

/// Drives one mirror run.
pub struct Pipeline {
    config: MirrorConfig,
    runner: Box<dyn ToolRunner>,
}

impl Pipeline {
    pub fn new(config: MirrorConfig, runner: Box<dyn ToolRunner>) -> Self {
        Self { config, runner }
    }

    /// Pipeline that spawns the configured binaries.
    pub fn with_process_runner(config: MirrorConfig) -> Self {
        let runner = ProcessToolRunner::from_config(&config);
        Self::new(config, Box::new(runner))
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Run the whole pipeline. The policy is written exactly once, after
    /// every image has been processed.
    pub async fn run(&self) -> Result<RunReport> {
        // Init
        self.config.validate()?;
        self.runner.check_available()?;

        let mirror = self.config.mirror().ok_or_else(|| {
            MirrorError::ConfigError("A mirror registry is required".to_string())
        })?;
        let pull_secret = self.config.pull_secret.clone().ok_or_else(|| {
            MirrorError::ConfigError("Pull secret is required".to_string())
        })?;

        println!("00 pull_secret: {}", pull_secret.display());
        println!("00 mirror registry: {}", mirror);

        // LoadManifest
        let source = self.descriptor_source().await?;
        let manifest = source.manifest_path()?;
        println!("01 download manifest: {}", manifest.display());
        let descriptors = source.descriptors()?;

        // Per image
        println!("02 sync images");
        let executor = SyncExecutor::new(
            self.runner.as_ref(),
            self.config.copy_tool.clone(),
            pull_secret.clone(),
            self.config.dry_run,
        )
        .with_timeout(self.config.copy_timeout_secs);
        let mut policy = MirrorPolicy::new();
        let mut report = RunReport {
            manifest,
            output: self.config.output.clone(),
            ..Default::default()
        };

        for descriptor in &descriptors {
            self.process_image(descriptor, mirror, &executor, &mut policy, &mut report)
                .await?;
        }

        // Serialize
        println!("03 write policy: {}", self.config.output.display());
        policy.write_atomic(&self.config.output)?;
        report.entries = policy.len();

        if self.config.catalogs.enabled {
            println!("04 sync catalogs");
            let catalogs = sync_catalogs(
                self.runner.as_ref(),
                &self.config.admin_tool,
                &self.config.catalogs,
                mirror,
                &pull_secret,
                self.config.dry_run,
            )
            .await;
            report.catalogs = Some(catalogs);
        }

        tracing::info!(
            entries = report.entries,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Mirror run finished"
        );
        Ok(report)
    }

    /// Resolve, sync and record one image. Per-image errors skip the image
    /// before anything is copied; fatal ones end the run.
    async fn process_image(
        &self,
        descriptor: &ImageDescriptor,
        mirror: &str,
        executor: &SyncExecutor<'_>,
        policy: &mut MirrorPolicy,
        report: &mut RunReport,
    ) -> Result<()> {
        let resolved = resolve(descriptor, mirror, self.config.source_override.as_deref())
            .and_then(|target| policy_source(descriptor).map(|source| (target, source)));
        let (target, source) = match resolved {
            Ok(resolved) => resolved,
            Err(e) if !e.is_fatal() => {
                tracing::warn!(image = %descriptor, error = %e, "Skipping image");
                println!("Skipping {}: {}", descriptor, e);
                report.skipped.push(descriptor.to_string());
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let outcome = executor.sync(&target).await;
        match outcome {
            SyncOutcome::Success => report.succeeded += 1,
            SyncOutcome::Failure => report.failed.push(target.source.clone()),
        }

        if outcome == SyncOutcome::Failure
            && self.config.policy_on_failure == FailedEntryPolicy::Skip
        {
            tracing::debug!(source = %target.source, "Leaving failed image out of the policy");
            return Ok(());
        }

        policy.push(source, mirror);
        Ok(())
    }

    async fn descriptor_source(&self) -> Result<Box<dyn DescriptorSource>> {
        match &self.config.manifest {
            ManifestLocation::File { path } => Ok(Box::new(ManifestFile::new(path.clone()))),
            ManifestLocation::Fetch { url, dir } => {
                fetch_manifest(url, dir).await?;
                Ok(Box::new(LatestManifestInDir::new(dir.clone())))
            }
        }
    }
}
