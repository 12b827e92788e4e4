//! Dropforge - local batch file conversion tool
//!
//! This library crate re-exports the workspace API for integration testing.

pub use df_convert::{
    BatchItem, BatchOrchestrator, ConversionResult, ConvertedFile, FileReport, ProgressMapper,
    ProgressSender, Strategy,
};
pub use df_core::config::{Config, ConvertConfig, EngineConfig};
pub use df_core::events::{ConvertEvent, EngineSource, EventBus};
pub use df_core::{
    auto_select_format, classify, format_bytes, options_for, Error, FormatOption, InputFile, Kind,
    Result,
};
pub use df_engine::{EngineLoader, EngineProvider, EngineState, ProcessEngine, TranscodeEngine};
