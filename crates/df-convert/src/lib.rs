//! Conversion pipeline: strategy selection, the transcode executor, and the
//! batch orchestrator that drives whole runs through the engine.

pub mod batch;
pub mod document;
pub mod executor;
pub mod progress;
pub mod raster;
pub mod strategy;

pub use batch::{BatchItem, BatchOrchestrator, ConvertedFile, FileReport};
pub use executor::ConversionResult;
pub use progress::{ProgressMapper, ProgressSender};
pub use strategy::Strategy;
