//! Unified error type for the dropforge application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the batch orchestrator to turn any per-file failure into a
//! user-visible record (including the engine's diagnostic log tail).

/// Unified error type covering all failure modes in dropforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No codec or conversion path exists for the requested combination.
    #[error("Unsupported conversion: {detail}")]
    UnsupportedConversion {
        /// Human-readable description of the rejected combination.
        detail: String,
    },

    /// Neither the local nor the remote engine asset bundle could be
    /// initialized. The loader rolls back to unloaded so a later call can
    /// retry.
    #[error("Engine load failed: {message}")]
    EngineLoad {
        /// What went wrong, naming the unreachable assets.
        message: String,
    },

    /// Every codec candidate was exhausted without producing usable output.
    #[error("Engine execution failed for '{format}': {message}")]
    EngineExecution {
        /// The output format that was requested.
        format: String,
        /// Human-readable error description.
        message: String,
        /// Most recent lines of the engine's diagnostic log.
        log_tail: Vec<String>,
    },

    /// Audio extraction produced zero bytes because the source has no
    /// audio stream.
    #[error("Source has no audio track")]
    NoAudioTrack,

    /// The input exceeds the size ceiling.
    #[error("Input too large: {size} bytes (limit {limit})")]
    InputTooLarge {
        /// Actual input size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// The classifier returned Unknown and no output options exist.
    #[error("Unrecognized format: {name}")]
    UnrecognizedFormat {
        /// The offending file name.
        name: String,
    },

    /// An external tool failed to spawn, timed out, or misbehaved.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An HTTP request (asset probe or bundle download) failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::UnsupportedConversion`].
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Error::UnsupportedConversion {
            detail: detail.into(),
        }
    }

    /// Convenience constructor for [`Error::EngineLoad`].
    pub fn engine_load(message: impl Into<String>) -> Self {
        Error::EngineLoad {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::EngineExecution`].
    pub fn engine_execution(
        format: impl Into<String>,
        message: impl Into<String>,
        log_tail: Vec<String>,
    ) -> Self {
        Error::EngineExecution {
            format: format.into(),
            message: message.into(),
            log_tail,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Http`].
    pub fn http(message: impl Into<String>) -> Self {
        Error::Http(message.into())
    }

    /// The engine diagnostic log tail attached to this error, if any.
    pub fn log_tail(&self) -> Option<&[String]> {
        match self {
            Error::EngineExecution { log_tail, .. } => Some(log_tail),
            _ => None,
        }
    }

    /// Whether this failure happens before any engine work starts.
    ///
    /// Cheap rejections are surfaced per file without touching the engine
    /// loader at all.
    pub fn is_cheap_rejection(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedConversion { .. }
                | Error::InputTooLarge { .. }
                | Error::UnrecognizedFormat { .. }
        )
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_display() {
        let err = Error::unsupported("eps -> png requires a rasterizer");
        assert_eq!(
            err.to_string(),
            "Unsupported conversion: eps -> png requires a rasterizer"
        );
        assert!(err.is_cheap_rejection());
    }

    #[test]
    fn engine_load_display() {
        let err = Error::engine_load("local assets unreachable: ffmpeg, manifest.json");
        assert!(err.to_string().contains("ffmpeg"));
        assert!(!err.is_cheap_rejection());
    }

    #[test]
    fn engine_execution_carries_log_tail() {
        let err = Error::engine_execution(
            "mp3",
            "all 3 candidates failed",
            vec!["line one".into(), "line two".into()],
        );
        assert!(err.to_string().contains("mp3"));
        assert_eq!(err.log_tail().unwrap().len(), 2);
    }

    #[test]
    fn no_audio_track_display() {
        let err = Error::NoAudioTrack;
        assert_eq!(err.to_string(), "Source has no audio track");
        assert!(err.log_tail().is_none());
    }

    #[test]
    fn input_too_large_display() {
        let err = Error::InputTooLarge {
            size: 2_000_000_000,
            limit: 1_073_741_824,
        };
        assert!(err.to_string().contains("2000000000"));
        assert!(err.is_cheap_rejection());
    }

    #[test]
    fn unrecognized_format_display() {
        let err = Error::UnrecognizedFormat {
            name: "blob.xyz".into(),
        };
        assert_eq!(err.to_string(), "Unrecognized format: blob.xyz");
        assert!(err.is_cheap_rejection());
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exited with status 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exited with status 1");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);
    }
}
