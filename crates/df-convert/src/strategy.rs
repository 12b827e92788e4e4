//! Encoding-strategy selection: fast in-process re-encode vs. the
//! heavyweight engine.

use df_core::Kind;

/// Image input extensions the in-process decoder handles.
pub const FAST_DECODABLE: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff", "tif", "ico",
];

/// Output formats the in-process encoder handles (a strict subset of the
/// image output matrix).
pub const FAST_ENCODABLE: &[&str] = &["png", "jpg", "webp"];

/// How a single conversion will be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// In-process raster re-encode; no engine involvement.
    FastPath,
    /// The transcoding engine's virtual filesystem and command execution.
    EnginePath,
}

/// Decide the strategy for one (kind, input extension, output) triple.
///
/// The fast path applies only to images whose input extension the in-process
/// decoder understands and whose requested output it can encode; everything
/// else, including images headed to formats like `gif` or `ico`, requires
/// the engine.
pub fn select(kind: Kind, input_ext: &str, output: &str) -> Strategy {
    if kind == Kind::Image
        && FAST_DECODABLE.contains(&input_ext)
        && FAST_ENCODABLE.contains(&output)
    {
        Strategy::FastPath
    } else {
        Strategy::EnginePath
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_image_conversions_take_the_fast_path() {
        assert_eq!(select(Kind::Image, "png", "jpg"), Strategy::FastPath);
        assert_eq!(select(Kind::Image, "jpeg", "webp"), Strategy::FastPath);
        assert_eq!(select(Kind::Image, "bmp", "png"), Strategy::FastPath);
    }

    #[test]
    fn undecodable_inputs_need_the_engine() {
        assert_eq!(select(Kind::Image, "heic", "jpg"), Strategy::EnginePath);
        assert_eq!(select(Kind::Image, "avif", "png"), Strategy::EnginePath);
        assert_eq!(select(Kind::Image, "", "png"), Strategy::EnginePath);
    }

    #[test]
    fn unencodable_outputs_need_the_engine() {
        assert_eq!(select(Kind::Image, "png", "gif"), Strategy::EnginePath);
        assert_eq!(select(Kind::Image, "png", "ico"), Strategy::EnginePath);
        assert_eq!(select(Kind::Image, "png", "bmp"), Strategy::EnginePath);
    }

    #[test]
    fn media_always_needs_the_engine() {
        assert_eq!(select(Kind::Video, "mov", "mp3"), Strategy::EnginePath);
        assert_eq!(select(Kind::Audio, "wav", "mp3"), Strategy::EnginePath);
    }

    #[test]
    fn fast_encodable_is_subset_of_image_matrix() {
        let matrix: Vec<_> = df_core::options_for(Kind::Image)
            .iter()
            .map(|o| o.code)
            .collect();
        for code in FAST_ENCODABLE {
            assert!(matrix.contains(code), "{code} not in image matrix");
        }
        assert!(FAST_ENCODABLE.len() < matrix.len());
    }
}
