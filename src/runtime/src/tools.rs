//! External tool invocation.
//!
//! Image copies go through the registry copy tool (`skopeo copy`), operator
//! catalogs through the cluster admin tool (`oc adm catalog ...`). Both are
//! reached only through the [`ToolRunner`] trait so the pipeline can run
//! against a fake in tests.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use acm_mirror_core::error::{MirrorError, Result};
use acm_mirror_core::MirrorConfig;
use async_trait::async_trait;

/// Exit state of an external tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    /// Process exited with a code
    Exited(i32),
    /// Process was terminated by a signal
    Signaled,
    /// Process exceeded the configured timeout and was killed
    TimedOut,
}

impl ToolStatus {
    /// Whether the tool exited with code 0.
    pub fn success(&self) -> bool {
        matches!(self, ToolStatus::Exited(0))
    }

    /// Exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            ToolStatus::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

/// `copy <src> <dst> --authfile=<path> [--all]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub source: String,
    pub destination: String,
    pub auth_file: PathBuf,
    pub all_platforms: bool,
}

impl CopyRequest {
    /// Arguments passed to the copy tool.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "copy".to_string(),
            self.source.clone(),
            self.destination.clone(),
            format!("--authfile={}", self.auth_file.display()),
        ];
        if self.all_platforms {
            args.push("--all".to_string());
        }
        args
    }
}

/// `adm catalog build --appregistry-org <org> --from=<from> --to=<to> --registry-config=<path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogBuild {
    pub organization: String,
    pub from: String,
    pub to: String,
    pub registry_config: PathBuf,
}

impl CatalogBuild {
    pub fn args(&self) -> Vec<String> {
        vec![
            "adm".to_string(),
            "catalog".to_string(),
            "build".to_string(),
            "--appregistry-org".to_string(),
            self.organization.clone(),
            format!("--from={}", self.from),
            format!("--to={}", self.to),
            format!("--registry-config={}", self.registry_config.display()),
        ]
    }
}

/// `adm catalog mirror <catalog> <registry> --registry-config=<path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMirror {
    pub catalog: String,
    pub destination: String,
    pub registry_config: PathBuf,
}

impl CatalogMirror {
    pub fn args(&self) -> Vec<String> {
        vec![
            "adm".to_string(),
            "catalog".to_string(),
            "mirror".to_string(),
            self.catalog.clone(),
            self.destination.clone(),
            format!("--registry-config={}", self.registry_config.display()),
        ]
    }
}

/// Render a tool invocation as a single printable command line.
pub fn command_line(tool: &str, args: &[String]) -> String {
    let mut line = tool.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Narrow interface to the external binaries.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Ensure every binary this runner needs is available.
    fn check_available(&self) -> Result<()>;

    /// Copy one image between registries.
    async fn copy_image(&self, request: &CopyRequest) -> Result<ToolStatus>;

    /// Build an operator catalog image.
    async fn build_catalog(&self, request: &CatalogBuild) -> Result<ToolStatus>;

    /// Mirror the content of an operator catalog.
    async fn mirror_catalog(&self, request: &CatalogMirror) -> Result<ToolStatus>;
}

/// Runs the real binaries as child processes.
#[derive(Debug, Clone)]
pub struct ProcessToolRunner {
    copy_tool: String,
    admin_tool: String,
    timeout: Option<Duration>,
}

impl ProcessToolRunner {
    pub fn new(copy_tool: impl Into<String>, admin_tool: impl Into<String>) -> Self {
        Self {
            copy_tool: copy_tool.into(),
            admin_tool: admin_tool.into(),
            timeout: None,
        }
    }

    /// Bound every invocation by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(config.copy_tool.clone(), config.admin_tool.clone())
            .with_timeout(config.copy_timeout_secs.map(Duration::from_secs))
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<ToolStatus> {
        tracing::debug!(program = %program, args = ?args, "Spawning tool");

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MirrorError::Other(format!("Failed to spawn {}: {}", program, e))
            })?;

        let status = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        tracing::warn!(
                            program = %program,
                            seconds = limit.as_secs(),
                            "Tool timed out, killing"
                        );
                        let _ = child.kill().await;
                        return Ok(ToolStatus::TimedOut);
                    }
                }
            }
            None => child.wait().await?,
        };

        Ok(match status.code() {
            Some(code) => ToolStatus::Exited(code),
            None => ToolStatus::Signaled,
        })
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    fn check_available(&self) -> Result<()> {
        check_tools(&[self.copy_tool.as_str(), self.admin_tool.as_str()])
    }

    async fn copy_image(&self, request: &CopyRequest) -> Result<ToolStatus> {
        self.run(&self.copy_tool, &request.args()).await
    }

    async fn build_catalog(&self, request: &CatalogBuild) -> Result<ToolStatus> {
        self.run(&self.admin_tool, &request.args()).await
    }

    async fn mirror_catalog(&self, request: &CatalogMirror) -> Result<ToolStatus> {
        self.run(&self.admin_tool, &request.args()).await
    }
}

/// Return an error for the first tool that cannot be found.
pub fn check_tools(tools: &[&str]) -> Result<()> {
    for tool in tools {
        match find_tool(tool) {
            Some(path) => tracing::debug!(tool = %tool, path = %path.display(), "Found tool"),
            None => {
                return Err(MirrorError::ToolMissing {
                    tool: tool.to_string(),
                    hint: Some(format!("You need to download the {} client", tool)),
                })
            }
        }
    }
    Ok(())
}

/// Locate an executable by name on `PATH`, or by path if it contains a separator.
pub fn find_tool(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let as_path = Path::new(name);
    if as_path.components().count() > 1 {
        return is_executable(as_path).then(|| as_path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_request_args_structured() {
        let request = CopyRequest {
            source: "docker://registry.example.com/ns1/foo@sha256:abc".to_string(),
            destination: "docker://myhost:5000/ns1/foo".to_string(),
            auth_file: PathBuf::from("/tmp/pull-secret.json"),
            all_platforms: true,
        };
        assert_eq!(
            command_line("skopeo", &request.args()),
            "skopeo copy docker://registry.example.com/ns1/foo@sha256:abc \
             docker://myhost:5000/ns1/foo --authfile=/tmp/pull-secret.json --all"
        );
    }

    #[test]
    fn test_copy_request_args_ad_hoc() {
        let request = CopyRequest {
            source: "docker://quay.io/coreos/etcd:v3.2.13".to_string(),
            destination: "docker://m:5000/coreos/etcd:v3.2.13".to_string(),
            auth_file: PathBuf::from("ps.json"),
            all_platforms: false,
        };
        let args = request.args();
        assert_eq!(args.last().unwrap(), "--authfile=ps.json");
        assert!(!args.contains(&"--all".to_string()));
    }

    #[test]
    fn test_catalog_build_args() {
        let request = CatalogBuild {
            organization: "redhat-operators".to_string(),
            from: "registry.redhat.io/openshift4/ose-operator-registry:v4.3".to_string(),
            to: "m:5000/local-operators/redhat-operators:v1".to_string(),
            registry_config: PathBuf::from("ps.json"),
        };
        assert_eq!(
            command_line("oc", &request.args()),
            "oc adm catalog build --appregistry-org redhat-operators \
             --from=registry.redhat.io/openshift4/ose-operator-registry:v4.3 \
             --to=m:5000/local-operators/redhat-operators:v1 --registry-config=ps.json"
        );
    }

    #[test]
    fn test_catalog_mirror_args() {
        let request = CatalogMirror {
            catalog: "m:5000/local-operators/redhat-operators:v1".to_string(),
            destination: "m:5000".to_string(),
            registry_config: PathBuf::from("ps.json"),
        };
        assert_eq!(
            command_line("oc", &request.args()),
            "oc adm catalog mirror m:5000/local-operators/redhat-operators:v1 m:5000 \
             --registry-config=ps.json"
        );
    }

    #[test]
    fn test_tool_status() {
        assert!(ToolStatus::Exited(0).success());
        assert!(!ToolStatus::Exited(1).success());
        assert!(!ToolStatus::TimedOut.success());
        assert!(!ToolStatus::Signaled.success());
        assert_eq!(ToolStatus::Exited(3).code(), Some(3));
        assert_eq!(ToolStatus::TimedOut.code(), None);
    }

    #[test]
    fn test_check_tools_missing() {
        let err = check_tools(&["acm-mirror-definitely-not-installed"]).unwrap_err();
        match err {
            MirrorError::ToolMissing { tool, hint } => {
                assert_eq!(tool, "acm-mirror-definitely-not-installed");
                assert!(hint.is_some());
            }
            other => panic!("expected ToolMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_find_tool_empty_name() {
        assert_eq!(find_tool(""), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_tool_by_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("fake-skopeo");
        std::fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();

        // Not executable yet
        assert_eq!(find_tool(tool.to_str().unwrap()), None);

        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_tool(tool.to_str().unwrap()), Some(tool.clone()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_exit_codes() {
        let runner = ProcessToolRunner::new("sh", "sh");
        let ok = runner
            .run("sh", &["-c".to_string(), "exit 0".to_string()])
            .await
            .unwrap();
        assert_eq!(ok, ToolStatus::Exited(0));

        let failed = runner
            .run("sh", &["-c".to_string(), "exit 7".to_string()])
            .await
            .unwrap();
        assert_eq!(failed, ToolStatus::Exited(7));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let runner =
            ProcessToolRunner::new("sh", "sh").with_timeout(Some(Duration::from_millis(100)));
        let status = runner
            .run("sh", &["-c".to_string(), "sleep 5".to_string()])
            .await
            .unwrap();
        assert_eq!(status, ToolStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_process_runner_spawn_failure() {
        let runner = ProcessToolRunner::new("acm-mirror-no-such-binary", "oc");
        let request = CopyRequest {
            source: "docker://a/b/c".to_string(),
            destination: "docker://m/b/c".to_string(),
            auth_file: PathBuf::from("ps.json"),
            all_platforms: false,
        };
        assert!(runner.copy_image(&request).await.is_err());
    }
}
