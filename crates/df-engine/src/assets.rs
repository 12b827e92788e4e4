//! Engine asset bundle contract.
//!
//! The engine is initialized from a fixed three-asset bundle: a version
//! manifest plus the engine and prober binaries. Assets are probed at a
//! self-hosted base URL first; when any is absent the versioned remote
//! bundle is fetched instead and materialized into the local cache
//! directory before initialization.

use std::path::Path;

use df_core::config::EngineConfig;
use df_core::{Error, Result};

/// Which remote base URL serves an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    /// The versioned package base (`remote_bundle_base`).
    Bundle,
    /// The versioned core-package base (`remote_core_base`).
    Core,
}

/// One asset in the engine bundle.
#[derive(Debug, Clone, Copy)]
pub struct AssetSpec {
    /// Fixed file name, identical locally and remotely.
    pub name: &'static str,
    /// Remote base serving this asset on the fallback path.
    pub source: AssetSource,
    /// Whether the materialized file must be marked executable.
    pub executable: bool,
}

/// The complete engine asset bundle. Absence of any one asset forces the
/// remote-fallback path.
pub const ENGINE_ASSETS: &[AssetSpec] = &[
    AssetSpec {
        name: "manifest.json",
        source: AssetSource::Bundle,
        executable: false,
    },
    AssetSpec {
        name: "ffmpeg",
        source: AssetSource::Core,
        executable: true,
    },
    AssetSpec {
        name: "ffprobe",
        source: AssetSource::Core,
        executable: true,
    },
];

impl AssetSpec {
    /// URL of this asset on the self-hosted bundle.
    pub fn local_url(&self, config: &EngineConfig) -> String {
        format!("{}/{}", config.local_base_url.trim_end_matches('/'), self.name)
    }

    /// URL of this asset on the remote fallback bundle.
    pub fn remote_url(&self, config: &EngineConfig) -> String {
        let base = match self.source {
            AssetSource::Bundle => &config.remote_bundle_base,
            AssetSource::Core => &config.remote_core_base,
        };
        format!("{}/{}", base.trim_end_matches('/'), self.name)
    }
}

/// Probe one asset URL with an uncached GET.
///
/// Any non-success status or transport error counts as absent; the host
/// environment's own network-failure semantics apply, with no retries.
pub async fn probe(client: &reqwest::Client, url: &str) -> bool {
    match client
        .get(url)
        .header(reqwest::header::CACHE_CONTROL, "no-store")
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!("asset probe failed for {url}: {e}");
            false
        }
    }
}

/// Probe the full local bundle, returning the names of unreachable assets.
pub async fn probe_local(client: &reqwest::Client, config: &EngineConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    for spec in ENGINE_ASSETS {
        if !probe(client, &spec.local_url(config)).await {
            missing.push(spec.name);
        }
    }
    missing
}

/// Download one asset and materialize it at `dest`.
///
/// Returns the number of bytes written. A zero-byte asset is rejected; an
/// empty payload means the server lied about having the asset.
pub async fn fetch_to(client: &reqwest::Client, url: &str, dest: &Path) -> Result<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::http(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::http(format!("GET {url}: status {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::http(format!("reading body of {url}: {e}")))?;

    if bytes.is_empty() {
        return Err(Error::http(format!("GET {url}: empty asset body")));
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &bytes).await?;

    Ok(bytes.len() as u64)
}

/// Mark a materialized binary asset executable.
#[cfg(unix)]
pub fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Contents of the bundle's `manifest.json`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BundleManifest {
    /// Bundle version string.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(local: &str, remote: &str) -> EngineConfig {
        EngineConfig {
            local_base_url: local.to_string(),
            remote_bundle_base: format!("{remote}/bundle"),
            remote_core_base: format!("{remote}/core"),
            cache_dir: None,
            command_timeout_secs: 10,
        }
    }

    #[test]
    fn bundle_has_three_fixed_assets() {
        assert_eq!(ENGINE_ASSETS.len(), 3);
        let names: Vec<_> = ENGINE_ASSETS.iter().map(|a| a.name).collect();
        assert!(names.contains(&"manifest.json"));
        assert!(names.contains(&"ffmpeg"));
        assert!(names.contains(&"ffprobe"));
    }

    #[test]
    fn urls_are_joined_without_double_slash() {
        let config = config_for("http://local/engine/", "http://remote");
        let ffmpeg = &ENGINE_ASSETS[1];
        assert_eq!(ffmpeg.local_url(&config), "http://local/engine/ffmpeg");
        assert_eq!(ffmpeg.remote_url(&config), "http://remote/core/ffmpeg");
        let manifest = &ENGINE_ASSETS[0];
        assert_eq!(
            manifest.remote_url(&config),
            "http://remote/bundle/manifest.json"
        );
    }

    #[tokio::test]
    async fn probe_sends_uncached_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/engine/ffmpeg"))
            .and(header("cache-control", "no-store"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        assert!(probe(&client, &format!("{}/engine/ffmpeg", server.uri())).await);
    }

    #[tokio::test]
    async fn probe_treats_non_success_as_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/engine/ffmpeg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        assert!(!probe(&client, &format!("{}/engine/ffmpeg", server.uri())).await);
        // Unreachable host: transport error, also absent.
        assert!(!probe(&client, "http://127.0.0.1:1/engine/ffmpeg").await);
    }

    #[tokio::test]
    async fn probe_local_names_missing_assets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/engine/manifest.json"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        // ffmpeg and ffprobe are not mounted.

        let client = reqwest::Client::new();
        let config = config_for(&format!("{}/engine", server.uri()), "http://remote");
        let missing = probe_local(&client, &config).await;
        assert_eq!(missing, vec!["ffmpeg", "ffprobe"]);
    }

    #[tokio::test]
    async fn fetch_materializes_asset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/core/ffmpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"binary".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("ffmpeg");
        let client = reqwest::Client::new();
        let written = fetch_to(&client, &format!("{}/core/ffmpeg", server.uri()), &dest)
            .await
            .unwrap();
        assert_eq!(written, 6);
        assert_eq!(std::fs::read(&dest).unwrap(), b"binary");
    }

    #[tokio::test]
    async fn fetch_rejects_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/core/ffmpeg"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let result = fetch_to(
            &client,
            &format!("{}/core/ffmpeg", server.uri()),
            &dir.path().join("ffmpeg"),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn manifest_parses() {
        let manifest: BundleManifest =
            serde_json::from_str(r#"{"version": "0.12.10"}"#).unwrap();
        assert_eq!(manifest.version, "0.12.10");
    }
}
