//! Source/destination coordinates for mirroring a single image.
//!
//! Structured images keep their namespace and name and move to the mirror
//! registry; ad-hoc references lose their leading registry host, and the
//! remaining path is placed under the mirror registry verbatim.

use acm_mirror_core::config::split_remote;
use acm_mirror_core::error::{MirrorError, Result};

use super::descriptor::{ImageDescriptor, StructuredImage};

/// Transport prefix understood by the copy tool.
pub const TRANSPORT: &str = "docker";

/// Resolved copy source and destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTarget {
    /// Transport-qualified source (e.g., "docker://quay.io/ns/img@sha256:...")
    pub source: String,
    /// Transport-qualified destination (e.g., "docker://myhost:5000/ns/img")
    pub destination: String,
    /// Copy every platform of a manifest list
    pub all_platforms: bool,
    /// Short name printed while syncing
    pub display_name: String,
    /// Resolved from an ad-hoc reference rather than a manifest entry
    pub ad_hoc: bool,
}

/// Resolve a descriptor against the mirror registry.
///
/// `source_override` (`registry/namespace`) replaces the source registry and
/// namespace of structured images; ad-hoc references ignore it.
pub fn resolve(
    descriptor: &ImageDescriptor,
    destination_registry: &str,
    source_override: Option<&str>,
) -> Result<MirrorTarget> {
    match descriptor {
        ImageDescriptor::Structured(image) => {
            let (registry, namespace) = match source_override {
                Some(remote) => split_remote(remote).ok_or_else(|| {
                    MirrorError::MalformedReference(format!(
                        "source override '{}' is not registry/namespace",
                        remote
                    ))
                })?,
                None => own_coordinates(image)?,
            };

            let mut source = format!(
                "{}://{}/{}/{}",
                TRANSPORT, registry, namespace, image.name
            );
            if let Some(ref digest) = image.digest {
                source.push('@');
                source.push_str(digest);
            } else if let Some(ref tag) = image.tag {
                source.push(':');
                source.push_str(tag);
            }

            let display_name = match image.tag {
                Some(ref tag) => format!("{}:{}", image.name, tag),
                None => image.name.clone(),
            };

            Ok(MirrorTarget {
                source,
                destination: format!(
                    "{}://{}/{}/{}",
                    TRANSPORT, destination_registry, namespace, image.name
                ),
                all_platforms: true,
                display_name,
                ad_hoc: false,
            })
        }
        ImageDescriptor::AdHoc(reference) => {
            let path = strip_registry(reference)?;
            Ok(MirrorTarget {
                source: format!("{}://{}", TRANSPORT, reference),
                destination: format!("{}://{}/{}", TRANSPORT, destination_registry, path),
                all_platforms: false,
                display_name: path.to_string(),
                ad_hoc: true,
            })
        }
    }
}

/// Source path recorded in the mirror policy for a descriptor.
///
/// Structured images always use their own registry and namespace, even when
/// the copy was redirected by a source override.
pub fn policy_source(descriptor: &ImageDescriptor) -> Result<String> {
    match descriptor {
        ImageDescriptor::Structured(image) => {
            let (registry, namespace) = own_coordinates(image)?;
            Ok(format!("{}/{}/{}", registry, namespace, image.name))
        }
        ImageDescriptor::AdHoc(reference) => {
            strip_registry(reference)?;
            Ok(reference.clone())
        }
    }
}

fn own_coordinates(image: &StructuredImage) -> Result<(&str, &str)> {
    if image.registry.is_empty() || image.namespace.is_empty() || image.name.is_empty() {
        return Err(MirrorError::MalformedReference(format!(
            "{}/{}/{}",
            image.registry, image.namespace, image.name
        )));
    }
    Ok((&image.registry, &image.namespace))
}

/// Drop the leading registry host from a reference.
fn strip_registry(reference: &str) -> Result<&str> {
    match reference.split_once('/') {
        Some((host, path)) if !host.is_empty() && !path.is_empty() => Ok(path),
        _ => Err(MirrorError::MalformedReference(reference.to_string())),
    }
}
