//! The transcoding engine: a scratch-directory virtual filesystem plus
//! command execution over the materialized engine binary.
//!
//! [`TranscodeEngine`] is the seam the transcode executor works against;
//! [`ProcessEngine`] is the process-backed implementation produced by the
//! loader. Tests substitute scripted fakes.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use df_core::{Error, Result};

use crate::command::EngineCommand;

/// Number of diagnostic log lines retained for error reporting.
const LOG_TAIL_LINES: usize = 30;

/// Outcome of one engine command.
#[derive(Debug, Clone)]
pub struct ExecReport {
    /// Whether the command exited cleanly.
    pub success: bool,
    /// Trimmed stderr, for candidate-failure messages.
    pub detail: String,
}

/// Capability contract for the heavyweight transcoding engine.
///
/// File names address the engine's private scratch filesystem; they must be
/// bare names, never paths. `remove_file` is synchronous and best-effort so
/// cleanup can run from drop guards on every exit path.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Write bytes into the scratch filesystem under the given name.
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a scratch file back.
    ///
    /// A missing file reads as empty: the executor treats absent and
    /// zero-byte output identically (both mean the command produced
    /// nothing usable).
    async fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    /// Delete a scratch file, swallowing any error.
    fn remove_file(&self, name: &str);

    /// Run one engine command.
    async fn exec(&self, args: &[String]) -> Result<ExecReport>;

    /// The most recent diagnostic log lines (oldest first).
    fn log_tail(&self) -> Vec<String>;
}

/// Process-backed engine running the materialized `ffmpeg` binary inside a
/// temporary scratch directory.
#[derive(Debug)]
pub struct ProcessEngine {
    binary: PathBuf,
    scratch: TempDir,
    timeout: Duration,
    log: Mutex<VecDeque<String>>,
    version: Option<String>,
}

impl ProcessEngine {
    /// Initialize the engine against a materialized binary.
    ///
    /// Runs `<binary> -version` once to verify the asset actually executes;
    /// a bundle that downloads fine but cannot run fails here, inside the
    /// load protocol, rather than on the first conversion.
    pub async fn initialize(binary: PathBuf, timeout: Duration) -> Result<Self> {
        let scratch = TempDir::new().map_err(|e| {
            Error::engine_load(format!("failed to create scratch dir: {e}"))
        })?;

        let output = EngineCommand::new(binary.clone())
            .arg("-version")
            .timeout(Duration::from_secs(15))
            .execute()
            .await
            .map_err(|e| Error::engine_load(format!("engine binary does not run: {e}")))?;

        if !output.success() {
            return Err(Error::engine_load(format!(
                "engine binary exited with {} during version check",
                output.status
            )));
        }

        let version = output.stdout.lines().next().map(|s| s.to_string());
        tracing::debug!("engine initialized: {:?}", version);

        Ok(Self {
            binary,
            scratch,
            timeout,
            log: Mutex::new(VecDeque::with_capacity(LOG_TAIL_LINES)),
            version,
        })
    }

    /// First line of the binary's `-version` output.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Path of the scratch directory (exposed for tests).
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    fn scratch_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(Error::Validation(format!(
                "scratch file name must be a bare name: {name:?}"
            )));
        }
        Ok(self.scratch.path().join(name))
    }

    fn record_log(&self, text: &str) {
        let mut log = self.log.lock();
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if log.len() >= LOG_TAIL_LINES {
                log.pop_front();
            }
            log.push_back(line.to_string());
        }
    }
}

#[async_trait]
impl TranscodeEngine for ProcessEngine {
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.scratch_path(name)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.scratch_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_file(&self, name: &str) {
        if let Ok(path) = self.scratch_path(name) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::trace!("scratch cleanup of {name} failed: {e}");
                }
            }
        }
    }

    async fn exec(&self, args: &[String]) -> Result<ExecReport> {
        let output = EngineCommand::new(self.binary.clone())
            .args(["-hide_banner".to_string(), "-y".to_string()])
            .args(args.iter().cloned())
            .current_dir(self.scratch.path())
            .timeout(self.timeout)
            .execute()
            .await?;

        self.record_log(&output.stderr);

        Ok(ExecReport {
            success: output.success(),
            detail: output
                .stderr
                .lines()
                .last()
                .unwrap_or_default()
                .trim()
                .to_string(),
        })
    }

    fn log_tail(&self) -> Vec<String> {
        self.log.lock().iter().cloned().collect()
    }
}
