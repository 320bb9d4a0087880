//! Manifest download and discovery.
//!
//! The ACM image manifest is published as a JSON document. It is downloaded
//! into a working directory and the newest `*.json` there is taken as the
//! manifest for the run.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use acm_mirror_core::error::{MirrorError, Result};

/// File name used when the URL has no usable last path segment.
const FALLBACK_MANIFEST_NAME: &str = "manifest.json";

/// Download the manifest at `url` into `dir`.
///
/// The file is named after the last path segment of the URL
/// (`.../raw/rc2-manifest.json` → `rc2-manifest.json`). Returns the written path.
pub async fn fetch_manifest(url: &str, dir: &Path) -> Result<PathBuf> {
    let target = dir.join(manifest_file_name(url));

    tracing::info!(url = %url, target = %target.display(), "Downloading manifest");

    let response = reqwest::get(url)
        .await
        .map_err(|e| MirrorError::ManifestFetchError {
            url: url.to_string(),
            status_code: 0,
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(MirrorError::ManifestFetchError {
            url: url.to_string(),
            status_code: response.status().as_u16(),
            message: "Download failed".to_string(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MirrorError::ManifestFetchError {
            url: url.to_string(),
            status_code: 0,
            message: e.to_string(),
        })?;

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&target, &bytes).await?;

    tracing::debug!(bytes = bytes.len(), "Manifest downloaded");
    Ok(target)
}

/// Pick the most recently created `*.json` file in `dir`.
///
/// Creation time falls back to modification time on filesystems without
/// birth time. Equal timestamps are ordered by file name.
pub fn latest_manifest(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        tracing::debug!(dir = %dir.display(), error = %e, "Cannot list manifest directory");
        MirrorError::ManifestNotFound(dir.to_path_buf())
    })?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .map(|path| (created_at(&path), path))
        .max()
        .map(|(_, path)| path)
        .ok_or_else(|| MirrorError::ManifestNotFound(dir.to_path_buf()))
}

fn created_at(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn manifest_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() && !name.contains(':') => name.to_string(),
        _ => FALLBACK_MANIFEST_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_file_name() {
        assert_eq!(
            manifest_file_name(
                "https://gist.githubusercontent.com/cdoan1/1130/raw/rc2-manifest.json"
            ),
            "rc2-manifest.json"
        );
        assert_eq!(
            manifest_file_name("https://example.com/m.json?token=abc"),
            "m.json"
        );
        assert_eq!(manifest_file_name("https://example.com/"), "manifest.json");
        assert_eq!(manifest_file_name("https://example.com"), "example.com");
    }

    #[test]
    fn test_latest_manifest_picks_newest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a-older.json"), "[]").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        std::fs::write(dir.path().join("b-newer.json"), "[]").unwrap();

        let latest = latest_manifest(dir.path()).unwrap();
        assert_eq!(latest.file_name().unwrap(), "b-newer.json");
    }

    #[test]
    fn test_latest_manifest_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("manifest.json"), "[]").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("zz.json")).unwrap();

        let latest = latest_manifest(dir.path()).unwrap();
        assert_eq!(latest.file_name().unwrap(), "manifest.json");
    }

    #[test]
    fn test_latest_manifest_empty_dir() {
        let dir = TempDir::new().unwrap();
        let err = latest_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, MirrorError::ManifestNotFound(_)));
    }

    #[test]
    fn test_latest_manifest_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = latest_manifest(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, MirrorError::ManifestNotFound(_)));
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });
        format!("http://{}/raw/rc2-manifest.json", addr)
    }

    #[tokio::test]
    async fn test_fetch_manifest_http_error_status() {
        let dir = TempDir::new().unwrap();
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let err = fetch_manifest(&url, dir.path()).await.unwrap_err();
        match err {
            MirrorError::ManifestFetchError {
                url: failed_url,
                status_code,
                ..
            } => {
                assert_eq!(failed_url, url);
                assert_eq!(status_code, 404);
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert!(!dir.path().join("rc2-manifest.json").exists());
    }

    #[tokio::test]
    async fn test_fetch_manifest_writes_body() {
        let dir = TempDir::new().unwrap();
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n[]",
        )
        .await;

        let path = fetch_manifest(&url, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("rc2-manifest.json"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_fetch_manifest_invalid_url() {
        let dir = TempDir::new().unwrap();
        let err = fetch_manifest("not a url", dir.path()).await.unwrap_err();
        match err {
            MirrorError::ManifestFetchError { status_code, .. } => assert_eq!(status_code, 0),
            other => panic!("expected fetch error, got {:?}", other),
        }
    }
}
