//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! engine and conversion sub-configs. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Size ceiling applied before classification: 1 GiB.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 1024 * 1024 * 1024;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub convert: ConvertConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            convert: ConvertConfig::default(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, url) in [
            ("engine.local_base_url", &self.engine.local_base_url),
            ("engine.remote_bundle_base", &self.engine.remote_bundle_base),
            ("engine.remote_core_base", &self.engine.remote_core_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(format!("{name} is not an http(s) URL: {url}"));
            }
        }

        if self.engine.command_timeout_secs == 0 {
            warnings.push("engine.command_timeout_secs is 0; commands will never time out".into());
        }

        if self.convert.max_input_bytes == 0 {
            warnings.push("convert.max_input_bytes is 0; every input will be rejected".into());
        }

        if self.convert.quality > 100 {
            warnings.push(format!(
                "convert.quality {} exceeds 100 and will be clamped",
                self.convert.quality
            ));
        }

        warnings
    }
}

/// Transcoding-engine asset and execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the self-hosted asset bundle, probed first.
    pub local_base_url: String,
    /// Versioned package base URL for the bundle manifest (remote fallback).
    pub remote_bundle_base: String,
    /// Versioned core-package base URL for the engine binaries (remote fallback).
    pub remote_core_base: String,
    /// Directory where fetched assets are materialized. Defaults to a
    /// per-user directory under the system temp dir.
    pub cache_dir: Option<PathBuf>,
    /// Maximum execution time for one engine command, in seconds.
    pub command_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_base_url: "http://127.0.0.1:8763/engine".to_string(),
            remote_bundle_base: "https://cdn.dropforge.dev/bundle/0.12".to_string(),
            remote_core_base: "https://cdn.dropforge.dev/core/0.12".to_string(),
            cache_dir: None,
            command_timeout_secs: 300,
        }
    }
}

impl EngineConfig {
    /// The directory where engine assets are materialized.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("dropforge-engine"))
    }
}

/// Conversion behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Inputs above this many bytes are rejected before classification.
    pub max_input_bytes: u64,
    /// Lossy-encode quality on a 0..=100 scale (jpeg/webp fast path).
    pub quality: u8,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            quality: 92,
        }
    }
}

impl ConvertConfig {
    /// The fast-path encode quality normalized into `[0.5, 1.0]`.
    pub fn normalized_quality(&self) -> f32 {
        (f32::from(self.quality.min(100)) / 100.0).clamp(0.5, 1.0)
    }
}
