//! Dialect Detector
//!
//! Chooses between the two BC3 grammars by peeking at the start of a
//! document. This is a heuristic, not a grammar check.

use ofitec_models::Dialect;

/// Non-empty lines inspected when no window is configured.
pub const DEFAULT_DETECTION_WINDOW: usize = 20;

/// Prefix shared by every extended-dialect record.
pub const EXTENDED_TAG_MARKER: char = '~';

/// Detect the dialect from the first [`DEFAULT_DETECTION_WINDOW`] non-empty lines.
pub fn detect(source: &str) -> Dialect {
    detect_within(source, DEFAULT_DETECTION_WINDOW)
}

/// Detect the dialect from the first `window` non-empty lines: any line
/// starting with `~` selects the extended dialect.
pub fn detect_within(source: &str, window: usize) -> Dialect {
    let extended = source
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.trim_end().is_empty())
        .take(window)
        .any(|line| line.starts_with(EXTENDED_TAG_MARKER));

    if extended {
        Dialect::Extended
    } else {
        Dialect::Simple
    }
}

/// Lenient UTF-8 decoding used for detection and the simple dialect.
pub fn decode_utf8_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// ISO-8859-1 decoding used for the extended dialect: every byte maps to
/// the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Decode a document with the encoding its dialect prescribes.
pub fn decode(bytes: &[u8], dialect: Dialect) -> String {
    match dialect {
        Dialect::Simple => decode_utf8_lossy(bytes),
        Dialect::Extended => decode_latin1(bytes),
    }
}
