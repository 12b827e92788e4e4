//! Content-kind model: input classification and the static output matrix.
//!
//! A [`Kind`] is a pure function of a file's name and declared media type.
//! Once computed for a batch item it never changes during a run. The output
//! matrix ([`options_for`]) is a set of immutable static tables; an empty
//! table means the kind is unconvertible.

use serde::{Deserialize, Serialize};

/// A file queued for conversion.
///
/// Immutable once accepted into a batch; owned by the batch orchestrator for
/// the duration of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// Original file name, including extension.
    pub name: String,
    /// Size in bytes.
    pub byte_size: u64,
    /// Declared media type (e.g. "video/quicktime"); may be empty.
    pub declared_media_type: String,
}

impl InputFile {
    /// Create an input file record.
    pub fn new(
        name: impl Into<String>,
        byte_size: u64,
        declared_media_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            byte_size,
            declared_media_type: declared_media_type.into(),
        }
    }

    /// The content kind of this file.
    pub fn kind(&self) -> Kind {
        classify(&self.name, &self.declared_media_type)
    }

    /// The lowercase filename extension, or empty string.
    pub fn extension(&self) -> String {
        ext_of(&self.name)
    }

    /// The filename without its extension.
    pub fn stem(&self) -> &str {
        stem_of(&self.name)
    }
}

/// Coarse content category of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Image,
    Video,
    Audio,
    Document,
    Unknown,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::Image => "image",
            Kind::Video => "video",
            Kind::Audio => "audio",
            Kind::Document => "document",
            Kind::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Recognized image input extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff", "tif", "ico", "heic", "avif", "svg",
    "eps", "ai",
];

/// Recognized video input extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "webm", "mkv", "avi", "m4v", "mpg", "mpeg", "wmv", "flv", "ts",
];

/// Recognized audio input extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "ogg", "oga", "m4a", "aac", "flac", "opus", "wma",
];

/// Recognized document input extensions.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "log", "pdf", "doc", "docx", "rtf", "odt",
];

/// Extract the lowercase filename extension: the trailing run of ASCII
/// alphanumerics after the last `.`, or the empty string if there is none.
pub fn ext_of(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) => {
            ext.to_string()
        }
        _ => String::new(),
    }
}

/// The filename with its final `.<ext>` segment removed.
///
/// Only a recognized extension (per [`ext_of`]) is stripped, so names like
/// `archive.v2~` pass through unchanged.
pub fn stem_of(name: &str) -> &str {
    if ext_of(name).is_empty() {
        name
    } else {
        match name.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => name,
        }
    }
}

/// Classify a file into a [`Kind`].
///
/// Extension sets win over the declared media type; the sets are checked in
/// image, video, audio, document priority order. Files with no extension
/// match fall back to the media type's top-level token. Deterministic and
/// side-effect free.
pub fn classify(name: &str, declared_media_type: &str) -> Kind {
    let ext = ext_of(name);
    if !ext.is_empty() {
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Kind::Image;
        }
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            return Kind::Video;
        }
        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            return Kind::Audio;
        }
        if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            return Kind::Document;
        }
    }

    let top = declared_media_type
        .split('/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match top.as_str() {
        "image" => Kind::Image,
        "video" => Kind::Video,
        "audio" => Kind::Audio,
        _ => Kind::Unknown,
    }
}

/// One legal output format, as advertised to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatOption {
    /// Lowercase extension-like token (e.g. "jpg").
    pub code: &'static str,
    /// Display label.
    pub label: &'static str,
}

const IMAGE_OUTPUTS: &[FormatOption] = &[
    FormatOption { code: "png", label: "PNG (image/png)" },
    FormatOption { code: "jpg", label: "JPG (image/jpeg)" },
    FormatOption { code: "webp", label: "WEBP (image/webp)" },
    FormatOption { code: "gif", label: "GIF (image/gif)" },
    FormatOption { code: "bmp", label: "BMP (image/bmp)" },
    FormatOption { code: "ico", label: "ICO (image/x-icon)" },
];

const AUDIO_OUTPUTS: &[FormatOption] = &[
    FormatOption { code: "mp3", label: "MP3 (audio/mpeg)" },
    FormatOption { code: "wav", label: "WAV (audio/wav)" },
    FormatOption { code: "ogg", label: "OGG (audio/ogg)" },
    FormatOption { code: "flac", label: "FLAC (audio/flac)" },
];

const DOCUMENT_OUTPUTS: &[FormatOption] = &[FormatOption {
    code: "txt",
    label: "TXT (text/plain, passthrough)",
}];

/// The ordered legal output formats for a kind.
///
/// `Unknown` yields an empty slice, which callers must treat as "no legal
/// conversion" rather than an error. Video and audio share one table: both
/// convert to extracted/transcoded audio.
pub fn options_for(kind: Kind) -> &'static [FormatOption] {
    match kind {
        Kind::Image => IMAGE_OUTPUTS,
        Kind::Video | Kind::Audio => AUDIO_OUTPUTS,
        Kind::Document => DOCUMENT_OUTPUTS,
        Kind::Unknown => &[],
    }
}

/// Suggest a default output format for a mixed set of kinds.
///
/// Prefers `jpg` when images are at least as common as media files, `mp3`
/// otherwise; `None` when nothing is convertible.
pub fn auto_select_format(kinds: &[Kind]) -> Option<&'static str> {
    let images = kinds.iter().filter(|k| **k == Kind::Image).count();
    let media = kinds
        .iter()
        .filter(|k| matches!(k, Kind::Video | Kind::Audio))
        .count();

    if images == 0 && media == 0 {
        return kinds
            .iter()
            .find(|k| **k == Kind::Document)
            .map(|_| "txt");
    }
    if images >= media {
        Some("jpg")
    } else {
        Some("mp3")
    }
}

/// Render a byte count with a binary unit suffix (e.g. "3.4 MB").
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if value >= 10.0 || unit == 0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_extraction() {
        assert_eq!(ext_of("photo.PNG"), "png");
        assert_eq!(ext_of("archive.tar.gz"), "gz");
        assert_eq!(ext_of("noext"), "");
        assert_eq!(ext_of("trailing."), "");
        assert_eq!(ext_of("weird.mp4~"), "");
        assert_eq!(ext_of(".hidden"), "hidden");
    }

    #[test]
    fn stem_extraction() {
        assert_eq!(stem_of("photo.png"), "photo");
        assert_eq!(stem_of("archive.tar.gz"), "archive.tar");
        assert_eq!(stem_of("noext"), "noext");
        assert_eq!(stem_of("weird.mp4~"), "weird.mp4~");
    }

    #[test]
    fn classify_by_extension() {
        for ext in IMAGE_EXTENSIONS {
            assert_eq!(classify(&format!("f.{ext}"), ""), Kind::Image, "{ext}");
        }
        for ext in VIDEO_EXTENSIONS {
            assert_eq!(classify(&format!("f.{ext}"), ""), Kind::Video, "{ext}");
        }
        for ext in AUDIO_EXTENSIONS {
            assert_eq!(classify(&format!("f.{ext}"), ""), Kind::Audio, "{ext}");
        }
        for ext in DOCUMENT_EXTENSIONS {
            assert_eq!(classify(&format!("f.{ext}"), ""), Kind::Document, "{ext}");
        }
    }

    #[test]
    fn classify_falls_back_to_media_type() {
        assert_eq!(classify("snapshot", "image/png"), Kind::Image);
        assert_eq!(classify("recording.xyz", "video/mp4"), Kind::Video);
        assert_eq!(classify("voice", "audio/ogg"), Kind::Audio);
        assert_eq!(classify("data.bin", "application/octet-stream"), Kind::Unknown);
        assert_eq!(classify("mystery", ""), Kind::Unknown);
    }

    #[test]
    fn classify_extension_wins_over_media_type() {
        // Extension sets take priority over a conflicting declared type.
        assert_eq!(classify("photo.png", "video/mp4"), Kind::Image);
    }

    #[test]
    fn classify_is_stable() {
        let a = classify("clip.mov", "video/quicktime");
        let b = classify("clip.mov", "video/quicktime");
        assert_eq!(a, b);
        assert_eq!(a, Kind::Video);
    }

    #[test]
    fn extension_sets_are_disjoint() {
        let sets = [
            IMAGE_EXTENSIONS,
            VIDEO_EXTENSIONS,
            AUDIO_EXTENSIONS,
            DOCUMENT_EXTENSIONS,
        ];
        for (i, a) in sets.iter().enumerate() {
            for b in sets.iter().skip(i + 1) {
                for ext in *a {
                    assert!(!b.contains(ext), "{ext} appears in two sets");
                }
            }
        }
    }

    #[test]
    fn unknown_kind_has_no_options() {
        assert!(options_for(Kind::Unknown).is_empty());
    }

    #[test]
    fn non_unknown_kinds_have_unique_options() {
        for kind in [Kind::Image, Kind::Video, Kind::Audio, Kind::Document] {
            let opts = options_for(kind);
            assert!(!opts.is_empty(), "{kind} has no options");
            let mut codes: Vec<_> = opts.iter().map(|o| o.code).collect();
            codes.sort_unstable();
            codes.dedup();
            assert_eq!(codes.len(), opts.len(), "duplicate codes for {kind}");
        }
    }

    #[test]
    fn auto_select_prefers_dominant_kind() {
        assert_eq!(
            auto_select_format(&[Kind::Image, Kind::Image, Kind::Video]),
            Some("jpg")
        );
        assert_eq!(
            auto_select_format(&[Kind::Video, Kind::Audio, Kind::Image]),
            Some("mp3")
        );
        assert_eq!(auto_select_format(&[Kind::Document]), Some("txt"));
        assert_eq!(auto_select_format(&[Kind::Unknown]), None);
        assert_eq!(auto_select_format(&[]), None);
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_bytes(3_500_000), "3.3 MB");
    }

    #[test]
    fn input_file_accessors() {
        let file = InputFile::new("clip.MOV", 1024, "video/quicktime");
        assert_eq!(file.kind(), Kind::Video);
        assert_eq!(file.extension(), "mov");
        assert_eq!(file.stem(), "clip");
    }
}
