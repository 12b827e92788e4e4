//! Batch orchestrator: runs a list of inputs through the conversion
//! pipeline one at a time, isolating per-item failures so one bad file
//! never aborts the rest of the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use df_core::events::{ConvertEvent, EventBus};
use df_core::{config::ConvertConfig, Error, InputFile, Kind, Result};
use df_engine::EngineProvider;

use crate::document;
use crate::executor;
use crate::progress::{ProgressMapper, ProgressSender};
use crate::raster;
use crate::strategy::{self, Strategy};

/// One file queued into a batch, paired with its bytes.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub file: InputFile,
    pub bytes: Vec<u8>,
    /// Optional override for the output name's stem; the extension always
    /// reflects the actual encoded format.
    pub output_base: Option<String>,
}

impl BatchItem {
    pub fn new(file: InputFile, bytes: Vec<u8>) -> Self {
        Self {
            file,
            bytes,
            output_base: None,
        }
    }
}

/// A successfully converted file, ready to hand back to the caller.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    /// Suggested output filename; its extension is the actual encoded
    /// format, which may differ from the requested one.
    pub output_name: String,
    pub media_type: String,
    pub format: String,
    pub bytes: Vec<u8>,
    pub note: Option<String>,
}

/// Per-item outcome of a batch run, in input order.
#[derive(Debug)]
pub struct FileReport {
    pub input_name: String,
    pub outcome: Result<ConvertedFile>,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Resets the in-flight flag when a run finishes, on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives whole batches through classification, strategy selection, and
/// the engine, emitting lifecycle events and monotonic progress as it goes.
///
/// At most one batch runs at a time; a second call while one is in flight
/// is a warned no-op.
pub struct BatchOrchestrator {
    provider: Arc<dyn EngineProvider>,
    events: Arc<EventBus>,
    config: ConvertConfig,
    progress: ProgressSender,
    in_flight: AtomicBool,
    last_percent: Mutex<f32>,
}

impl BatchOrchestrator {
    pub fn new(
        provider: Arc<dyn EngineProvider>,
        events: Arc<EventBus>,
        config: ConvertConfig,
    ) -> Self {
        Self {
            provider,
            events,
            config,
            progress: ProgressSender::noop(),
            in_flight: AtomicBool::new(false),
            last_percent: Mutex::new(0.0),
        }
    }

    /// Attach a progress callback; replaces the default no-op sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Convert every item to the requested output format.
    ///
    /// Items are processed sequentially in input order; each gets its own
    /// [`FileReport`] whether it succeeded or failed. Returns an empty list
    /// without doing any work if a batch is already running.
    pub async fn convert_all(&self, items: Vec<BatchItem>, output: &str) -> Vec<FileReport> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("a batch is already running; ignoring convert_all call");
            return Vec::new();
        }
        let _guard = RunGuard(&self.in_flight);
        *self.last_percent.lock() = 0.0;

        let total = items.len();
        self.events.emit(ConvertEvent::BatchStarted {
            total,
            format: output.to_string(),
        });

        let mut reports = Vec::with_capacity(total);
        let mut failed = 0usize;
        for (index, item) in items.into_iter().enumerate() {
            let name = item.file.name.clone();
            let per_item = 100.0 / total.max(1) as f32;
            let mapper =
                ProgressMapper::new(per_item * index as f32, per_item * (index + 1) as f32);

            self.events.emit(ConvertEvent::FileStarted {
                index,
                name: name.clone(),
            });
            self.report(mapper.map(0.0), &format!("converting {name}"));

            let outcome = self.convert_one(&item, output).await;
            match &outcome {
                Ok(converted) => {
                    self.events.emit(ConvertEvent::FileCompleted {
                        index,
                        name: name.clone(),
                        output_name: converted.output_name.clone(),
                    });
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!("conversion of '{name}' failed: {e}");
                    self.events.emit(ConvertEvent::FileFailed {
                        index,
                        name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
            self.report(mapper.map(1.0), &format!("finished {name}"));

            reports.push(FileReport {
                input_name: name,
                outcome,
            });
        }

        self.events.emit(ConvertEvent::BatchCompleted { total, failed });
        self.report(100.0, "batch complete");
        reports
    }

    async fn convert_one(&self, item: &BatchItem, output: &str) -> Result<ConvertedFile> {
        let size = item.file.byte_size.max(item.bytes.len() as u64);
        if size > self.config.max_input_bytes {
            return Err(Error::InputTooLarge {
                size,
                limit: self.config.max_input_bytes,
            });
        }

        let kind = item.file.kind();
        if kind == Kind::Unknown {
            return Err(Error::UnrecognizedFormat {
                name: item.file.name.clone(),
            });
        }

        let options = df_core::options_for(kind);
        if !options.iter().any(|o| o.code == output) {
            let legal: Vec<&str> = options.iter().map(|o| o.code).collect();
            return Err(Error::unsupported(format!(
                "'{output}' is not a legal output for {kind} (options: {})",
                legal.join(", ")
            )));
        }

        let input_ext = item.file.extension();

        if kind == Kind::Document {
            let result = document::passthrough(&item.bytes, &input_ext, output)?;
            return Ok(self.finish(item, result));
        }

        if strategy::select(kind, &input_ext, output) == Strategy::FastPath {
            match raster::re_encode(&item.bytes, output, self.config.normalized_quality()) {
                Ok(result) => return Ok(self.finish(item, result)),
                Err(e) => {
                    // In-process decode is best effort; the engine gets one
                    // shot at anything it couldn't handle.
                    tracing::debug!("in-process re-encode failed, using engine: {e}");
                }
            }
        }

        let engine = self.provider.engine().await?;
        let result = executor::execute(engine.as_ref(), &item.bytes, &input_ext, kind, output).await?;
        Ok(self.finish(item, result))
    }

    fn finish(&self, item: &BatchItem, result: executor::ConversionResult) -> ConvertedFile {
        let base = item
            .output_base
            .clone()
            .unwrap_or_else(|| item.file.stem().to_string());
        ConvertedFile {
            output_name: format!("{base}.{}", result.format),
            media_type: result.media_type,
            format: result.format,
            bytes: result.output,
            note: result.note,
        }
    }

    /// Emit a progress value, latched so it never moves backwards within a
    /// run.
    fn report(&self, percent: f32, label: &str) {
        let percent = {
            let mut last = self.last_percent.lock();
            if percent > *last {
                *last = percent;
            }
            *last
        };
        self.progress.send(percent, label);
        self.events.emit(ConvertEvent::Progress {
            percent,
            label: label.to_string(),
        });
    }
}
