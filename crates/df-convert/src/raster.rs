//! In-process raster re-encode: the fast path for image conversions.
//!
//! Decodes arbitrary raster bytes and encodes to png, jpeg, or webp with an
//! optional quality parameter. Any failure here is recoverable -- the caller
//! falls back to the engine path.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::ImageFormat;

use df_core::{Error, Result};

use crate::executor::ConversionResult;

/// Re-encode raster bytes into the requested format.
///
/// `quality` is a fraction in `[0, 1]`, applied to jpeg output (webp encoding
/// here is lossless, png has no quality knob).
///
/// # Errors
///
/// - [`Error::UnsupportedConversion`] when `output` is not one of
///   `png`/`jpg`/`webp`.
/// - [`Error::Internal`] when decoding or encoding fails; the caller treats
///   this as "fall back to the engine", not as a final verdict.
pub fn re_encode(input: &[u8], output: &str, quality: f32) -> Result<ConversionResult> {
    let media_type = match output {
        "png" => "image/png",
        "jpg" => "image/jpeg",
        "webp" => "image/webp",
        other => {
            return Err(Error::unsupported(format!(
                "in-process re-encode cannot produce '{other}'"
            )))
        }
    };

    let img = image::load_from_memory(input)
        .map_err(|e| Error::Internal(format!("raster decode failed: {e}")))?;

    let mut buf = Vec::new();
    match output {
        "png" => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| Error::Internal(format!("png encode failed: {e}")))?;
        }
        "jpg" => {
            let q = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
            let mut cursor = Cursor::new(&mut buf);
            let encoder = JpegEncoder::new_with_quality(&mut cursor, q);
            // Jpeg has no alpha channel.
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| Error::Internal(format!("jpeg encode failed: {e}")))?;
        }
        "webp" => {
            let mut cursor = Cursor::new(&mut buf);
            let encoder = WebPEncoder::new_lossless(&mut cursor);
            img.to_rgba8()
                .write_with_encoder(encoder)
                .map_err(|e| Error::Internal(format!("webp encode failed: {e}")))?;
        }
        _ => unreachable!("validated above"),
    }

    Ok(ConversionResult {
        output: buf,
        media_type: media_type.to_string(),
        format: output.to_string(),
        note: None,
    })
}
