//! df-core: shared types, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for the other df-* crates,
//! providing the unified error type, application configuration, the
//! content-kind model with its static output matrix, and a broadcast
//! event bus for conversion progress.

pub mod config;
pub mod error;
pub mod events;
pub mod kind;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use kind::*;
