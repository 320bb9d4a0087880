use std::path::PathBuf;

use thiserror::Error;

/// ACM mirror error types
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Missing or invalid run configuration (mirror registry, pull secret)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A required external binary is not on PATH
    #[error("Required tool not found: {tool}")]
    ToolMissing { tool: String, hint: Option<String> },

    /// Manifest file absent or unreadable
    #[error("Manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// Manifest download failed
    #[error("Manifest download failed: {url} -> {status_code}")]
    ManifestFetchError {
        url: String,
        status_code: u16,
        message: String,
    },

    /// Manifest content is not a valid image list
    #[error("Manifest parse error: {} - {message}", path.display())]
    ManifestParseError { path: PathBuf, message: String },

    /// Image reference that cannot be mapped onto the mirror registry
    #[error("Malformed image reference: {0}")]
    MalformedReference(String),

    /// Copy tool exited nonzero for one image
    #[error("Sync failed: {source_uri} (exit code {exit_code:?})")]
    SyncFailure {
        source_uri: String,
        exit_code: Option<i32>,
    },

    /// External tool did not finish within the configured timeout
    #[error("Timeout: {tool} did not finish within {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl MirrorError {
    /// Whether this error terminates the whole run.
    ///
    /// Per-image errors (malformed references, failed or timed-out copies)
    /// only end processing of the offending image.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MirrorError::MalformedReference(_)
                | MirrorError::SyncFailure { .. }
                | MirrorError::ToolTimeout { .. }
        )
    }

    /// Optional remediation hint shown below the error message.
    pub fn hint(&self) -> Option<&str> {
        match self {
            MirrorError::ToolMissing { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for MirrorError {
    fn from(err: serde_yaml::Error) -> Self {
        MirrorError::SerializationError(err.to_string())
    }
}

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = MirrorError::ConfigError("A mirror registry is required".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: A mirror registry is required"
        );
    }

    #[test]
    fn test_tool_missing_display_and_hint() {
        let error = MirrorError::ToolMissing {
            tool: "skopeo".to_string(),
            hint: Some("Install skopeo".to_string()),
        };
        assert_eq!(error.to_string(), "Required tool not found: skopeo");
        assert_eq!(error.hint(), Some("Install skopeo"));
    }

    #[test]
    fn test_manifest_not_found_display() {
        let error = MirrorError::ManifestNotFound(PathBuf::from("./rc2-manifest.json"));
        assert_eq!(error.to_string(), "Manifest not found: ./rc2-manifest.json");
    }

    #[test]
    fn test_manifest_fetch_error_display() {
        let error = MirrorError::ManifestFetchError {
            url: "https://example.com/manifest.json".to_string(),
            status_code: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Manifest download failed: https://example.com/manifest.json -> 404"
        );
    }

    #[test]
    fn test_manifest_parse_error_display() {
        let error = MirrorError::ManifestParseError {
            path: PathBuf::from("m.json"),
            message: "expected value".to_string(),
        };
        assert_eq!(error.to_string(), "Manifest parse error: m.json - expected value");
    }

    #[test]
    fn test_sync_failure_display() {
        let error = MirrorError::SyncFailure {
            source_uri: "docker://quay.io/coreos/etcd:v3.2.13".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(
            error.to_string(),
            "Sync failed: docker://quay.io/coreos/etcd:v3.2.13 (exit code Some(1))"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(MirrorError::ConfigError("x".to_string()).is_fatal());
        assert!(MirrorError::ManifestNotFound(PathBuf::from("x")).is_fatal());
        assert!(MirrorError::ToolMissing {
            tool: "oc".to_string(),
            hint: None
        }
        .is_fatal());
        assert!(!MirrorError::MalformedReference("busybox".to_string()).is_fatal());
        assert!(!MirrorError::SyncFailure {
            source_uri: "x".to_string(),
            exit_code: None
        }
        .is_fatal());
        assert!(!MirrorError::ToolTimeout {
            tool: "skopeo".to_string(),
            seconds: 5
        }
        .is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: MirrorError = io_error.into();
        assert!(matches!(error, MirrorError::IoError(_)));
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope");
        let error: MirrorError = result.unwrap_err().into();
        assert!(matches!(error, MirrorError::SerializationError(_)));
    }

    #[test]
    fn test_serde_yaml_error_conversion() {
        let result: std::result::Result<serde_yaml::Value, _> =
            serde_yaml::from_str("invalid: yaml: content:");
        let error: MirrorError = result.unwrap_err().into();
        assert!(matches!(error, MirrorError::SerializationError(_)));
    }
}
