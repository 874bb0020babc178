use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, UpdaterError};
use crate::hashing::HASH_ALGORITHM;
use crate::util::format_speed;

const USER_AGENT: &str = concat!("mod-updater/", env!("CARGO_PKG_VERSION"));

/// A published version as reported for one content hash.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionRecord {
    #[serde(default)]
    pub version_number: Option<String>,
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

impl VersionRecord {
    /// Download link of the file flagged primary, if any.
    pub fn primary_url(&self) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.primary)
            .map(|f| f.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionFile {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub primary: bool,
}

/// Hash -> record, as returned by both lookups.
pub type VersionMap = HashMap<String, VersionRecord>;

#[derive(Debug, Serialize)]
struct HashQuery<'a> {
    hashes: &'a [String],
    algorithm: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    loaders: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_versions: Option<&'a [String]>,
}

#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    api_url: String,
}

impl RegistryClient {
    pub fn new(api_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("registry: failed to build HTTP client ({err}); using default configuration");
                Client::new()
            });
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Resolve the exact published version for each hash. Unknown hashes are absent.
    pub async fn lookup_current(&self, hashes: &[String]) -> Result<VersionMap> {
        let query = HashQuery {
            hashes,
            algorithm: HASH_ALGORITHM,
            loaders: None,
            game_versions: None,
        };
        self.post_hashes("version_files", &query).await
    }

    /// Resolve the newest version of each hash's project compatible with the given filters.
    pub async fn lookup_latest(
        &self,
        hashes: &[String],
        loaders: &[String],
        game_versions: &[String],
    ) -> Result<VersionMap> {
        let query = HashQuery {
            hashes,
            algorithm: HASH_ALGORITHM,
            loaders: Some(loaders),
            game_versions: Some(game_versions),
        };
        self.post_hashes("version_files/update", &query).await
    }

    async fn post_hashes(&self, endpoint: &str, query: &HashQuery<'_>) -> Result<VersionMap> {
        let url = format!("{}/{endpoint}", self.api_url);
        debug!("registry: POST {url} ({} hashes)", query.hashes.len());
        let resp = self
            .client
            .post(&url)
            .json(query)
            .send()
            .await
            .map_err(|e| UpdaterError::Network(format!("POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpdaterError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<VersionMap>()
            .await
            .map_err(|e| UpdaterError::Parse(format!("registry response from {url}: {e}")))
    }

    /// Stream `url` into `dest`, calling `progress` with (downloaded, total).
    /// A partially written `dest` is removed on failure.
    pub async fn download_to_path<F>(&self, url: &str, dest: &Path, mut progress: F) -> Result<u64>
    where
        F: FnMut(u64, Option<u64>),
    {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpdaterError::Network(format!("download request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpdaterError::Status {
                status: status.as_u16(),
                body: format!("download of {url} rejected"),
            });
        }

        let result = self.write_stream(resp, dest, &mut progress).await;
        if result.is_err()
            && let Err(err) = fs::remove_file(dest).await
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!("registry: unable to remove partial download {}: {err}", dest.display());
        }
        result
    }

    async fn write_stream<F>(
        &self,
        resp: reqwest::Response,
        dest: &Path,
        progress: &mut F,
    ) -> Result<u64>
    where
        F: FnMut(u64, Option<u64>),
    {
        let mut file = fs::File::create(dest)
            .await
            .map_err(|e| UpdaterError::io("failed to create download file", dest, e))?;
        let total = resp.content_length();
        let mut stream = resp.bytes_stream();
        let mut downloaded: u64 = 0;
        let started = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdaterError::Network(format!("stream error: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdaterError::io("download write error", dest, e))?;
            downloaded += chunk.len() as u64;
            progress(downloaded, total);
        }

        file.flush()
            .await
            .map_err(|e| UpdaterError::io("download flush error", dest, e))?;

        if let Some(total) = total
            && downloaded < total
        {
            return Err(UpdaterError::Network(format!(
                "download incomplete: received {downloaded} of {total} bytes"
            )));
        }

        let elapsed = started.elapsed().as_secs_f32();
        if elapsed > 0.0 {
            debug!(
                "registry: fetched {} ({downloaded} bytes, {})",
                dest.display(),
                format_speed(downloaded as f32 / elapsed)
            );
        }
        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record_json(version: &str, url: &str) -> serde_json::Value {
        json!({
            "version_number": version,
            "files": [
                { "url": format!("{url}-sources"), "primary": false },
                { "url": url, "primary": true, "filename": "x.jar" }
            ]
        })
    }

    #[test]
    fn picks_primary_file_url() {
        let record: VersionRecord =
            serde_json::from_value(record_json("1.0.0", "https://cdn/x.jar")).unwrap();
        assert_eq!(record.primary_url(), Some("https://cdn/x.jar"));

        let no_primary: VersionRecord = serde_json::from_value(json!({
            "version_number": "1.0.0",
            "files": [{ "url": "https://cdn/y.jar" }]
        }))
        .unwrap();
        assert_eq!(no_primary.primary_url(), None);
    }

    #[tokio::test]
    async fn lookup_current_posts_hashes_with_algorithm() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/version_files"))
            .and(body_partial_json(json!({ "hashes": ["aaa"], "algorithm": "sha512" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "aaa": record_json("1.2.3", "https://cdn/a.jar") })),
            )
            .mount(&server)
            .await;

        let client = RegistryClient::new(&server.uri());
        let found = client.lookup_current(&["aaa".to_string()]).await.unwrap();
        assert_eq!(found["aaa"].version_number.as_deref(), Some("1.2.3"));
    }

    #[tokio::test]
    async fn lookup_latest_sends_platform_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/version_files/update"))
            .and(body_partial_json(json!({
                "loaders": ["fabric"],
                "game_versions": ["1.21.5"]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "aaa": record_json("1.3.0", "https://cdn/a.jar") })),
            )
            .mount(&server)
            .await;

        let client = RegistryClient::new(&format!("{}/", server.uri()));
        let found = client
            .lookup_latest(&["aaa".to_string()], &["fabric".to_string()], &["1.21.5".to_string()])
            .await
            .unwrap();
        assert_eq!(found["aaa"].version_number.as_deref(), Some("1.3.0"));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/version_files"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = RegistryClient::new(&server.uri());
        let err = client.lookup_current(&["aaa".to_string()]).await.unwrap_err();
        match err {
            UpdaterError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn downloads_to_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/new.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new build".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("UPDATING_old.jar");
        let client = RegistryClient::new(&server.uri());
        let mut last = 0;
        let written = client
            .download_to_path(&format!("{}/files/new.jar", server.uri()), &dest, |d, _| last = d)
            .await
            .unwrap();
        assert_eq!(written, 9);
        assert_eq!(last, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"new build");
    }

    #[tokio::test]
    async fn truncated_download_is_removed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/short.jar"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Length", "4096")
                    .set_body_bytes(b"partial".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("UPDATING_short.jar");
        let client = RegistryClient::new(&server.uri());
        let err = client
            .download_to_path(&format!("{}/files/short.jar", server.uri()), &dest, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::Network(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn failed_download_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("UPDATING_old.jar");
        let client = RegistryClient::new(&server.uri());
        let err = client
            .download_to_path(&format!("{}/missing.jar", server.uri()), &dest, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::Status { status: 404, .. }));
        assert!(!dest.exists());
    }
}
