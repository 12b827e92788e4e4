//! # df-engine
//!
//! Transcoding-engine lifecycle for dropforge.
//!
//! This crate provides:
//!
//! - **Asset contract** ([`assets`]) -- the fixed three-asset engine bundle,
//!   uncached reachability probing, and download/materialization.
//! - **Engine loader** ([`EngineLoader`]) -- lazy single-flight
//!   initialization with the local-asset / remote-fallback protocol and
//!   rollback on failure.
//! - **Command execution** ([`EngineCommand`]) -- async process builder with
//!   timeout support.
//! - **The engine itself** ([`TranscodeEngine`], [`ProcessEngine`]) -- a
//!   scratch-directory virtual filesystem, command execution, and a bounded
//!   diagnostic log ring.

pub mod assets;
pub mod command;
pub mod engine;
pub mod loader;

// ---- Re-exports for convenience ----

pub use command::{CommandOutput, EngineCommand};
pub use engine::{ExecReport, ProcessEngine, TranscodeEngine};
pub use loader::{EngineLoader, EngineProvider, EngineState};
