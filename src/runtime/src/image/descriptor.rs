//! Image descriptors and the sources that produce them.
//!
//! A descriptor is either a structured manifest entry (registry, namespace,
//! name, tag, digest) or a raw ad-hoc reference such as
//! `quay.io/coreos/etcd:v3.2.13`.

use std::fmt;
use std::path::{Path, PathBuf};

use acm_mirror_core::config::split_remote;
use acm_mirror_core::error::{MirrorError, Result};
use serde::Deserialize;

use super::manifest::latest_manifest;

/// Images mirrored on every run in addition to the manifest content.
pub const EXTRA_IMAGES: [&str; 3] = [
    "docker.io/library/busybox:1.28.0-glibc",
    "quay.io/coreos/etcd-operator:v0.9.4",
    "quay.io/coreos/etcd:v3.2.13",
];

/// One image to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDescriptor {
    /// Entry read from the image manifest
    Structured(StructuredImage),
    /// Raw `registry/path:tag` reference
    AdHoc(String),
}

/// Manifest image with separate coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredImage {
    /// Source registry hostname (e.g., "registry.redhat.io")
    pub registry: String,
    /// Repository namespace (e.g., "rhacm1-tech-preview"). Empty if the
    /// manifest entry carried no namespace.
    pub namespace: String,
    /// Image name (e.g., "multicluster-operators-subscription-rhel7")
    pub name: String,
    /// Tag, for display only
    pub tag: Option<String>,
    /// Content digest used to pin the copy
    pub digest: Option<String>,
}

impl ImageDescriptor {
    /// Build an ad-hoc descriptor from a raw reference.
    pub fn ad_hoc(reference: impl Into<String>) -> Self {
        ImageDescriptor::AdHoc(reference.into().trim().to_string())
    }

    /// The statically known extra images, in mirroring order.
    pub fn extras() -> Vec<Self> {
        EXTRA_IMAGES.iter().map(|r| Self::ad_hoc(*r)).collect()
    }
}

impl fmt::Display for ImageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDescriptor::Structured(image) => {
                write!(f, "{}/{}/{}", image.registry, image.namespace, image.name)?;
                if let Some(ref tag) = image.tag {
                    write!(f, ":{}", tag)?;
                }
                if let Some(ref digest) = image.digest {
                    write!(f, "@{}", digest)?;
                }
                Ok(())
            }
            ImageDescriptor::AdHoc(reference) => f.write_str(reference),
        }
    }
}

/// Raw manifest entry as published in the ACM manifest JSON.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "image-remote")]
    image_remote: String,
    #[serde(rename = "image-name")]
    image_name: String,
    #[serde(rename = "image-tag", default)]
    image_tag: Option<String>,
    #[serde(rename = "image-digest", default)]
    image_digest: Option<String>,
}

impl From<ManifestEntry> for StructuredImage {
    fn from(entry: ManifestEntry) -> Self {
        let remote = entry.image_remote.trim();
        let (registry, namespace) = match split_remote(remote) {
            Some((registry, namespace)) => (registry.to_string(), namespace.to_string()),
            None => (remote.trim_end_matches('/').to_string(), String::new()),
        };
        StructuredImage {
            registry,
            namespace,
            name: entry.image_name.trim().to_string(),
            tag: entry.image_tag.filter(|t| !t.is_empty()),
            digest: entry.image_digest.filter(|d| !d.is_empty()),
        }
    }
}

/// Parse manifest JSON (an array of image entries) into descriptors.
pub fn parse_manifest(data: &str, path: &Path) -> Result<Vec<ImageDescriptor>> {
    let entries: Vec<ManifestEntry> =
        serde_json::from_str(data).map_err(|e| MirrorError::ManifestParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(entries
        .into_iter()
        .map(|e| ImageDescriptor::Structured(e.into()))
        .collect())
}

/// Load the full descriptor list: extra images first, then manifest entries
/// in file order.
pub fn load_descriptors(manifest_path: &Path) -> Result<Vec<ImageDescriptor>> {
    let data = std::fs::read_to_string(manifest_path).map_err(|e| {
        tracing::debug!(path = %manifest_path.display(), error = %e, "Cannot read manifest");
        MirrorError::ManifestNotFound(manifest_path.to_path_buf())
    })?;

    let mut descriptors = ImageDescriptor::extras();
    descriptors.extend(parse_manifest(&data, manifest_path)?);

    tracing::info!(
        path = %manifest_path.display(),
        count = descriptors.len(),
        "Loaded image descriptors"
    );
    Ok(descriptors)
}

/// Where the descriptor list comes from.
pub trait DescriptorSource: Send + Sync {
    /// Path of the manifest this source reads.
    fn manifest_path(&self) -> Result<PathBuf>;

    /// Extra images followed by the manifest images.
    fn descriptors(&self) -> Result<Vec<ImageDescriptor>> {
        load_descriptors(&self.manifest_path()?)
    }
}

/// Explicit manifest file.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DescriptorSource for ManifestFile {
    fn manifest_path(&self) -> Result<PathBuf> {
        Ok(self.path.clone())
    }
}

/// Newest `*.json` file in a directory, the layout left behind by a
/// manifest download into the working directory.
#[derive(Debug, Clone)]
pub struct LatestManifestInDir {
    dir: PathBuf,
}

impl LatestManifestInDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DescriptorSource for LatestManifestInDir {
    fn manifest_path(&self) -> Result<PathBuf> {
        latest_manifest(&self.dir)
    }
}
