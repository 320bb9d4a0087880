//! ACM Mirror Runtime - image mirroring engine.
//!
//! Loads image descriptors from the ACM manifest, resolves each one to a
//! source/destination pair on the mirror registry, copies it with the
//! external copy tool and accumulates the ImageContentSourcePolicy that
//! redirects cluster pulls to the mirror.

pub mod catalog;
pub mod image;
pub mod pipeline;
pub mod policy;
pub mod sync;
pub mod tools;

#[cfg(test)]
mod testing;

// Re-export common types
pub use catalog::{sync_catalogs, CatalogReport};
pub use image::{
    load_descriptors, policy_source, resolve, DescriptorSource, ImageDescriptor,
    LatestManifestInDir, ManifestFile, MirrorTarget, StructuredImage, EXTRA_IMAGES,
};
pub use pipeline::{Pipeline, RunReport, EXIT_OK, EXIT_PARTIAL_FAILURE};
pub use policy::{MirrorEntry, MirrorPolicy};
pub use sync::{SyncExecutor, SyncOutcome};
pub use tools::{check_tools, find_tool, ProcessToolRunner, ToolRunner, ToolStatus};

/// ACM Mirror Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
