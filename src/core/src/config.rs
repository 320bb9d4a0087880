use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};

/// Location of the published ACM image manifest.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://gist.githubusercontent.com/cdoan1/11302f6ebb48fc4c02097897fc116d50/raw/rc2-manifest.json";

/// File name of the generated ImageContentSourcePolicy.
pub const DEFAULT_OUTPUT_FILE: &str = "99-acm-images-icsp.yaml";

/// Pull secret looked up next to the executable when `--pullsecret` is absent.
pub const DEFAULT_PULL_SECRET_FILE: &str = "acmd-pull-secret.json";

/// Mirror run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Destination registry (`host[:port]`)
    pub mirror_registry: Option<String>,

    /// Registry auth file passed to the copy tool
    pub pull_secret: Option<PathBuf>,

    /// Print commands without executing them
    pub dry_run: bool,

    /// Replacement `registry/namespace` for manifest images
    pub source_override: Option<String>,

    /// Where the image manifest comes from
    pub manifest: ManifestLocation,

    /// Output path for the generated policy
    pub output: PathBuf,

    /// Whether images whose copy failed still get a policy entry
    pub policy_on_failure: FailedEntryPolicy,

    /// Upper bound for a single copy invocation
    pub copy_timeout_secs: Option<u64>,

    /// Registry copy binary
    pub copy_tool: String,

    /// Cluster admin binary
    pub admin_tool: String,

    /// Operator catalog synchronization
    pub catalogs: CatalogConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            mirror_registry: None,
            pull_secret: None,
            dry_run: false,
            source_override: None,
            manifest: ManifestLocation::default(),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            policy_on_failure: FailedEntryPolicy::Include,
            copy_timeout_secs: None,
            copy_tool: "skopeo".to_string(),
            admin_tool: "oc".to_string(),
            catalogs: CatalogConfig::default(),
        }
    }
}

impl MirrorConfig {
    /// Load configuration from a YAML file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_yaml::from_str(&data).map_err(|e| {
            MirrorError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Check required settings before anything touches the network.
    ///
    /// The pull secret is checked before the mirror registry.
    pub fn validate(&self) -> Result<()> {
        match &self.pull_secret {
            Some(path) if path.is_file() => {}
            Some(path) => {
                return Err(MirrorError::ConfigError(format!(
                    "Pull secret {} is required",
                    path.display()
                )))
            }
            None => {
                return Err(MirrorError::ConfigError(
                    "Pull secret is required".to_string(),
                ))
            }
        }

        if self.mirror().is_none() {
            return Err(MirrorError::ConfigError(
                "A mirror registry is required".to_string(),
            ));
        }

        if let Some(ref remote) = self.source_override {
            if split_remote(remote).is_none() {
                return Err(MirrorError::ConfigError(format!(
                    "Source override '{}' must be in registry/namespace form",
                    remote
                )));
            }
        }

        if self.copy_timeout_secs == Some(0) {
            return Err(MirrorError::ConfigError(
                "Copy timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Destination registry with surrounding whitespace removed, if set.
    pub fn mirror(&self) -> Option<&str> {
        self.mirror_registry
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Default pull secret path: `acmd-pull-secret.json` beside the running binary.
pub fn default_pull_secret() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_PULL_SECRET_FILE)
}

/// Split a `registry/namespace` string on its first `/`.
///
/// Returns `None` when either side is empty.
pub fn split_remote(remote: &str) -> Option<(&str, &str)> {
    let (registry, namespace) = remote.split_once('/')?;
    if registry.is_empty() || namespace.is_empty() {
        return None;
    }
    Some((registry, namespace))
}

/// Source of the image manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestLocation {
    /// Download from `url` into `dir`, then use the newest `*.json` in `dir`
    Fetch { url: String, dir: PathBuf },
    /// Read an already-present manifest file
    File { path: PathBuf },
}

impl Default for ManifestLocation {
    fn default() -> Self {
        ManifestLocation::Fetch {
            url: DEFAULT_MANIFEST_URL.to_string(),
            dir: PathBuf::from("."),
        }
    }
}

/// What to do with the policy entry of an image whose copy failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedEntryPolicy {
    /// Keep the entry; the policy reflects every attempted image
    #[default]
    Include,
    /// Drop the entry; the policy reflects only images that were copied
    Skip,
}

/// Operator catalog build/mirror settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Run catalog build and mirror after the image sync
    pub enabled: bool,

    /// App-registry organizations to build catalogs for
    pub catalogs: Vec<String>,

    /// Operator registry base image
    pub from_image: String,

    /// Tag of the base image (cluster version)
    pub version: String,

    /// Repository prefix inside the mirror registry
    pub prefix: String,

    /// Tag of the built catalog images
    pub tag: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            catalogs: vec![
                "community-operators".to_string(),
                "redhat-operators".to_string(),
                "certified-operators".to_string(),
            ],
            from_image: "registry.redhat.io/openshift4/ose-operator-registry".to_string(),
            version: "v4.3".to_string(),
            prefix: "local-operators".to_string(),
            tag: "v1".to_string(),
        }
    }
}
