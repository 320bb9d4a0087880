//! Fake tool runner for unit tests.

use std::sync::Arc;

use acm_mirror_core::error::{MirrorError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::tools::{CatalogBuild, CatalogMirror, CopyRequest, ToolRunner, ToolStatus};

/// Records every invocation; fails those whose source contains a configured pattern.
#[derive(Default)]
pub(crate) struct RecordingRunner {
    copies: Mutex<Vec<CopyRequest>>,
    builds: Mutex<Vec<CatalogBuild>>,
    mirrors: Mutex<Vec<CatalogMirror>>,
    failures: Vec<(String, ToolStatus)>,
    copy_error: bool,
    missing_tool: Option<String>,
}

impl RecordingRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_source(mut self, pattern: &str, status: ToolStatus) -> Self {
        self.failures.push((pattern.to_string(), status));
        self
    }

    pub(crate) fn error_on_copy(mut self) -> Self {
        self.copy_error = true;
        self
    }

    pub(crate) fn missing(mut self, tool: &str) -> Self {
        self.missing_tool = Some(tool.to_string());
        self
    }

    pub(crate) fn copies(&self) -> Vec<CopyRequest> {
        self.copies.lock().clone()
    }

    pub(crate) fn builds(&self) -> Vec<CatalogBuild> {
        self.builds.lock().clone()
    }

    pub(crate) fn mirrors(&self) -> Vec<CatalogMirror> {
        self.mirrors.lock().clone()
    }

    fn status_for(&self, subject: &str) -> ToolStatus {
        self.failures
            .iter()
            .find(|(pattern, _)| subject.contains(pattern.as_str()))
            .map(|(_, status)| *status)
            .unwrap_or(ToolStatus::Exited(0))
    }
}

#[async_trait]
impl ToolRunner for RecordingRunner {
    fn check_available(&self) -> Result<()> {
        match self.missing_tool {
            Some(ref tool) => Err(MirrorError::ToolMissing {
                tool: tool.clone(),
                hint: None,
            }),
            None => Ok(()),
        }
    }

    async fn copy_image(&self, request: &CopyRequest) -> Result<ToolStatus> {
        self.copies.lock().push(request.clone());
        if self.copy_error {
            return Err(MirrorError::Other("spawn failed".to_string()));
        }
        Ok(self.status_for(&request.source))
    }

    async fn build_catalog(&self, request: &CatalogBuild) -> Result<ToolStatus> {
        self.builds.lock().push(request.clone());
        Ok(self.status_for(&request.to))
    }

    async fn mirror_catalog(&self, request: &CatalogMirror) -> Result<ToolStatus> {
        self.mirrors.lock().push(request.clone());
        Ok(self.status_for(&request.catalog))
    }
}

/// Lets a test keep a handle on a runner the pipeline owns.
pub(crate) struct SharedRunner(pub(crate) Arc<RecordingRunner>);

#[async_trait]
impl ToolRunner for SharedRunner {
    fn check_available(&self) -> Result<()> {
        self.0.check_available()
    }

    async fn copy_image(&self, request: &CopyRequest) -> Result<ToolStatus> {
        self.0.copy_image(request).await
    }

    async fn build_catalog(&self, request: &CatalogBuild) -> Result<ToolStatus> {
        self.0.build_catalog(request).await
    }

    async fn mirror_catalog(&self, request: &CatalogMirror) -> Result<ToolStatus> {
        self.0.mirror_catalog(request).await
    }
}
