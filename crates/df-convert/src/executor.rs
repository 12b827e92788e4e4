//! Transcode executor: drives one conversion through the engine's scratch
//! filesystem, walking an ordered codec-candidate list until one produces
//! usable output.

use parking_lot::Mutex;

use df_core::{Error, Kind, Result};
use df_engine::TranscodeEngine;

/// The finished product of one conversion.
///
/// Ownership transfers to the caller, which is responsible for exposing the
/// bytes; engine-side scratch storage is already released by the time this
/// is returned.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Converted bytes. Never empty on success.
    pub output: Vec<u8>,
    /// Media type of the converted bytes.
    pub media_type: String,
    /// Actual format code; may differ from the requested one when a
    /// fallback candidate succeeded.
    pub format: String,
    /// Diagnostic or informational note.
    pub note: Option<String>,
}

/// One codec/container pairing attempted in priority order.
struct CodecCandidate {
    format: &'static str,
    media_type: &'static str,
    args: Vec<String>,
}

/// Stream-selection arguments for audio extraction: drop video, subtitle,
/// and data streams, keep the first audio stream if present.
fn audio_extract_args() -> Vec<String> {
    ["-vn", "-sn", "-dn", "-map", "0:a:0?"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn audio_candidates(output: &str) -> Option<Vec<CodecCandidate>> {
    let candidates = match output {
        // Primary high-compatibility codec first, then an alternate
        // container, then a third pairing.
        "mp3" => vec![
            CodecCandidate {
                format: "mp3",
                media_type: "audio/mpeg",
                args: vec!["-acodec".into(), "libmp3lame".into(), "-q:a".into(), "2".into()],
            },
            CodecCandidate {
                format: "m4a",
                media_type: "audio/mp4",
                args: vec!["-acodec".into(), "aac".into(), "-b:a".into(), "192k".into()],
            },
            CodecCandidate {
                format: "ogg",
                media_type: "audio/ogg",
                args: vec!["-acodec".into(), "libvorbis".into(), "-q:a".into(), "5".into()],
            },
        ],
        "wav" => vec![CodecCandidate {
            format: "wav",
            media_type: "audio/wav",
            args: vec![
                "-acodec".into(),
                "pcm_s16le".into(),
                "-ar".into(),
                "44100".into(),
                "-ac".into(),
                "2".into(),
            ],
        }],
        "ogg" => vec![
            CodecCandidate {
                format: "ogg",
                media_type: "audio/ogg",
                args: vec!["-acodec".into(), "libvorbis".into(), "-q:a".into(), "5".into()],
            },
            CodecCandidate {
                format: "opus",
                media_type: "audio/ogg",
                args: vec!["-acodec".into(), "libopus".into(), "-b:a".into(), "128k".into()],
            },
        ],
        "flac" => vec![CodecCandidate {
            format: "flac",
            media_type: "audio/flac",
            args: vec!["-acodec".into(), "flac".into()],
        }],
        _ => return None,
    };
    Some(candidates)
}

/// The single canonical command for an image output format.
///
/// Legacy vector/print inputs and vector outputs are rejected here, before
/// any engine invocation.
fn image_command(input_ext: &str, output: &str) -> Result<CodecCandidate> {
    if matches!(input_ext, "eps" | "ai") {
        return Err(Error::unsupported(format!(
            "'{input_ext}' input requires a rasterizer, which is unavailable"
        )));
    }
    if output == "svg" {
        return Err(Error::unsupported(
            "raster input cannot be converted to a vector format",
        ));
    }

    let (media_type, args): (&'static str, Vec<String>) = match output {
        "png" => ("image/png", vec![]),
        "jpg" => ("image/jpeg", vec!["-q:v".into(), "2".into()]),
        "webp" => ("image/webp", vec![]),
        "gif" => ("image/gif", vec![]),
        "bmp" => ("image/bmp", vec![]),
        // Icons are forced square before encoding.
        "ico" => ("image/x-icon", vec!["-vf".into(), "scale=256:256".into()]),
        other => {
            return Err(Error::unsupported(format!(
                "no image encoder for '{other}'"
            )))
        }
    };

    // 'static names come from the output matrix; resolve through it so the
    // candidate carries the canonical code.
    let format = df_core::options_for(Kind::Image)
        .iter()
        .map(|o| o.code)
        .find(|c| *c == output)
        .ok_or_else(|| Error::unsupported(format!("'{output}' is not an image output")))?;

    Ok(CodecCandidate {
        format,
        media_type,
        args,
    })
}

/// Removes tracked scratch files when dropped, on every exit path.
///
/// Cleanup failures are swallowed inside `remove_file`; they never mask the
/// primary result or error.
struct ScratchGuard<'a> {
    engine: &'a dyn TranscodeEngine,
    names: Mutex<Vec<String>>,
}

impl<'a> ScratchGuard<'a> {
    fn new(engine: &'a dyn TranscodeEngine) -> Self {
        Self {
            engine,
            names: Mutex::new(Vec::new()),
        }
    }

    fn track(&self, name: String) {
        self.names.lock().push(name);
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        for name in self.names.lock().drain(..) {
            self.engine.remove_file(&name);
        }
    }
}

/// Run one conversion through the engine.
///
/// Walks the ordered candidate list for the requested output, accepting the
/// first candidate that exits cleanly *and* yields non-empty output; the
/// accepted candidate's format code is surfaced so the final filename can
/// reflect the true encoded format.
///
/// # Errors
///
/// - [`Error::UnsupportedConversion`] when no candidate exists for the
///   requested combination (raised before any engine invocation).
/// - [`Error::NoAudioTrack`] when audio extraction exits cleanly but reads
///   back empty.
/// - [`Error::EngineExecution`] when every candidate fails, with the
///   engine's diagnostic log tail attached.
pub async fn execute(
    engine: &dyn TranscodeEngine,
    input: &[u8],
    input_ext: &str,
    kind: Kind,
    output: &str,
) -> Result<ConversionResult> {
    let candidates = match kind {
        Kind::Image => vec![image_command(input_ext, output)?],
        Kind::Video | Kind::Audio => audio_candidates(output).ok_or_else(|| {
            Error::unsupported(format!("no audio codec candidates for '{output}'"))
        })?,
        other => {
            return Err(Error::unsupported(format!(
                "the engine does not handle {other} inputs"
            )))
        }
    };
    let is_audio_extraction = matches!(kind, Kind::Video | Kind::Audio);

    let in_ext = if input_ext.is_empty() { "bin" } else { input_ext };
    let input_name = format!("input.{in_ext}");

    let guard = ScratchGuard::new(engine);
    guard.track(input_name.clone());
    engine.write_file(&input_name, input).await?;

    let mut failures: Vec<String> = Vec::new();
    for candidate in &candidates {
        let output_name = format!("output.{}", candidate.format);
        guard.track(output_name.clone());

        let mut args: Vec<String> = vec!["-i".into(), input_name.clone()];
        if is_audio_extraction {
            args.extend(audio_extract_args());
        }
        args.extend(candidate.args.iter().cloned());
        args.push(output_name.clone());

        tracing::debug!("trying candidate '{}' for '{output}'", candidate.format);
        match engine.exec(&args).await {
            Ok(report) if report.success => {
                let bytes = engine.read_file(&output_name).await?;
                if bytes.is_empty() {
                    if is_audio_extraction {
                        // Clean exit with nothing to read back: the source
                        // carries no audio stream. Hard failure, not a
                        // candidate problem.
                        return Err(Error::NoAudioTrack);
                    }
                    failures.push(format!("{}: produced empty output", candidate.format));
                } else {
                    let note = (candidate.format != output).then(|| {
                        format!("requested '{output}', encoded as '{}'", candidate.format)
                    });
                    return Ok(ConversionResult {
                        output: bytes,
                        media_type: candidate.media_type.to_string(),
                        format: candidate.format.to_string(),
                        note,
                    });
                }
            }
            Ok(report) => {
                failures.push(format!("{}: {}", candidate.format, report.detail));
            }
            Err(e) => {
                failures.push(format!("{}: {e}", candidate.format));
            }
        }
    }

    Err(Error::engine_execution(
        output,
        format!(
            "all {} candidate(s) failed: {}",
            candidates.len(),
            failures.join("; ")
        ),
        engine.log_tail(),
    ))
}
