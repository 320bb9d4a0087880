//! Per-image sync through the copy tool.

use std::path::PathBuf;

use acm_mirror_core::error::MirrorError;

use crate::image::MirrorTarget;
use crate::tools::{command_line, CopyRequest, ToolRunner, ToolStatus};

/// Result of syncing one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Failure,
}

/// Issues one copy per resolved image. A failed copy is reported, never raised.
pub struct SyncExecutor<'a> {
    runner: &'a dyn ToolRunner,
    copy_tool: String,
    auth_file: PathBuf,
    dry_run: bool,
    timeout_secs: Option<u64>,
}

impl<'a> SyncExecutor<'a> {
    pub fn new(
        runner: &'a dyn ToolRunner,
        copy_tool: impl Into<String>,
        auth_file: impl Into<PathBuf>,
        dry_run: bool,
    ) -> Self {
        Self {
            runner,
            copy_tool: copy_tool.into(),
            auth_file: auth_file.into(),
            dry_run,
            timeout_secs: None,
        }
    }

    /// Copy timeout the runner enforces, reported when a copy is killed.
    pub fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Copy request for a target, as it would be handed to the runner.
    pub fn request(&self, target: &MirrorTarget) -> CopyRequest {
        CopyRequest {
            source: target.source.clone(),
            destination: target.destination.clone(),
            auth_file: self.auth_file.clone(),
            all_platforms: target.all_platforms,
        }
    }

    /// Sync one image. Dry-run prints the command and always succeeds.
    pub async fn sync(&self, target: &MirrorTarget) -> SyncOutcome {
        let request = self.request(target);
        println!("{}", banner(target));
        println!("{}", command_line(&self.copy_tool, &request.args()));

        if self.dry_run {
            tracing::debug!(source = %target.source, "Dry run, skipping copy");
            return SyncOutcome::Success;
        }

        let outcome = match self.runner.copy_image(&request).await {
            Ok(status) if status.success() => {
                tracing::info!(source = %target.source, destination = %target.destination, "Image synced");
                SyncOutcome::Success
            }
            Ok(status) => {
                let error = self.failure(target, status);
                tracing::warn!(source = %target.source, status = ?status, "{}", error);
                SyncOutcome::Failure
            }
            Err(e) => {
                tracing::warn!(source = %target.source, error = %e, "Copy could not be run");
                SyncOutcome::Failure
            }
        };

        match outcome {
            SyncOutcome::Success => println!("Done!"),
            SyncOutcome::Failure => println!("Failed!"),
        }
        println!();
        outcome
    }

    /// Diagnostic for a copy that did not exit cleanly.
    pub fn failure(&self, target: &MirrorTarget, status: ToolStatus) -> MirrorError {
        match (status, self.timeout_secs) {
            (ToolStatus::TimedOut, Some(seconds)) => MirrorError::ToolTimeout {
                tool: self.copy_tool.clone(),
                seconds,
            },
            _ => MirrorError::SyncFailure {
                source_uri: target.source.clone(),
                exit_code: status.code(),
            },
        }
    }
}

/// Progress line printed before each copy.
pub fn banner(target: &MirrorTarget) -> String {
    if target.ad_hoc {
        format!("Syncing Extra Images: {}", target.display_name)
    } else {
        format!("Syncing Images: {}", target.display_name)
    }
}
