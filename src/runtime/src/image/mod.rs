//! Image descriptors and mirror coordinates.
//!
//! - `descriptor`: the two descriptor shapes and the sources that load them
//! - `manifest`: manifest download and newest-file discovery
//! - `resolve`: source/destination coordinates and policy source paths

pub mod descriptor;
pub mod manifest;
pub mod resolve;

pub use descriptor::{
    load_descriptors, DescriptorSource, ImageDescriptor, LatestManifestInDir, ManifestFile,
    StructuredImage, EXTRA_IMAGES,
};
pub use manifest::{fetch_manifest, latest_manifest};
pub use resolve::{policy_source, resolve, MirrorTarget, TRANSPORT};
