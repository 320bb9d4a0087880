//! ACM Mirror Core - Foundational Types
//!
//! Error taxonomy and run configuration shared by the mirror runtime and CLI.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{CatalogConfig, FailedEntryPolicy, ManifestLocation, MirrorConfig};
pub use error::{MirrorError, Result};

/// ACM Mirror version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
