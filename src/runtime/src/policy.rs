//! ImageContentSourcePolicy accumulation and output.
//!
//! One `repositoryDigestMirrors` entry is appended per processed image, in
//! processing order. The document is written once, atomically.

use std::path::Path;

use acm_mirror_core::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};

use crate::image::{policy_source, ImageDescriptor};

/// API group/version of the policy resource.
pub const API_VERSION: &str = "operator.openshift.io/v1alpha1";

/// Kind of the policy resource.
pub const KIND: &str = "ImageContentSourcePolicy";

/// Name of the generated policy.
pub const POLICY_NAME: &str = "acm-images-icsp";

/// ImageContentSourcePolicy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorPolicy {
    pub api_version: String,
    pub kind: String,
    pub metadata: PolicyMetadata,
    pub spec: PolicySpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    pub repository_digest_mirrors: Vec<MirrorEntry>,
}

/// Redirect of one source repository to its mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorEntry {
    pub mirrors: Vec<String>,
    pub source: String,
}

impl Default for MirrorPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorPolicy {
    /// Empty policy with the fixed header.
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: PolicyMetadata {
                name: POLICY_NAME.to_string(),
            },
            spec: PolicySpec::default(),
        }
    }

    /// Append the entry for `descriptor`, mirrored to `destination_registry`.
    pub fn append(&mut self, descriptor: &ImageDescriptor, destination_registry: &str) -> Result<()> {
        let source = policy_source(descriptor)?;
        self.push(source, destination_registry);
        Ok(())
    }

    /// Append an entry for an already computed source path.
    pub fn push(&mut self, source: impl Into<String>, destination_registry: &str) {
        self.spec.repository_digest_mirrors.push(MirrorEntry {
            mirrors: vec![destination_registry.to_string()],
            source: source.into(),
        });
    }

    pub fn entries(&self) -> &[MirrorEntry] {
        &self.spec.repository_digest_mirrors
    }

    pub fn len(&self) -> usize {
        self.spec.repository_digest_mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spec.repository_digest_mirrors.is_empty()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the policy as YAML (write tmp, rename).
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let data = self.to_yaml()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MirrorError::Other(format!(
                    "Failed to create output directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, &data).map_err(|e| {
            MirrorError::Other(format!(
                "Failed to write policy {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        std::fs::rename(&tmp_path, path).map_err(|e| {
            MirrorError::Other(format!(
                "Failed to rename policy {} -> {}: {}",
                tmp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!(path = %path.display(), entries = self.len(), "Policy written");
        Ok(())
    }
}
