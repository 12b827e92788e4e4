//! Document handling: plain-text passthrough only.
//!
//! Rich document conversion needs a server-side collaborator, which is out
//! of scope; the only legal document operation returns the original bytes
//! unchanged.

use df_core::{Error, Result};

use crate::executor::ConversionResult;

/// Handle a document conversion request.
///
/// `txt -> txt` returns the input unchanged with an explanatory note. Every
/// other combination is an [`Error::UnsupportedConversion`].
pub fn passthrough(input: &[u8], input_ext: &str, output: &str) -> Result<ConversionResult> {
    if input_ext == "txt" && output == "txt" {
        return Ok(ConversionResult {
            output: input.to_vec(),
            media_type: "text/plain".to_string(),
            format: "txt".to_string(),
            note: Some("passthrough; richer document formats need a server-side converter".into()),
        });
    }

    Err(Error::unsupported(format!(
        "document conversion {input_ext} -> {output} needs a server-side converter"
    )))
}
