//! Encoding label resolution and transcoding.
//!
//! Bridges the document's encoding label to `encoding_rs`. The label is
//! validated once when a document is constructed and later used to decode
//! byte-level markup fragments and to encode rendered output.
//!
//! Latin-1 input follows the WHATWG resolution of the `iso-8859-1` label,
//! which `encoding_rs` maps to `windows-1252`.

use std::fmt;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// An error that occurs during encoding lookup or transcoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    /// Creates a new `EncodingError` with the given message.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error: {}", self.message)
    }
}

impl std::error::Error for EncodingError {}

/// Looks up an encoding by label (case-insensitive, surrounding whitespace
/// ignored).
///
/// # Errors
///
/// Returns `EncodingError` if `encoding_rs` does not know the label.
///
/// # Examples
///
/// ```
/// use xmlscribe::encoding::resolve;
///
/// assert_eq!(resolve("UTF-8").unwrap().name(), "UTF-8");
/// assert_eq!(resolve("iso-8859-1").unwrap().name(), "windows-1252");
/// assert!(resolve("klingon").is_err());
/// ```
pub fn resolve(label: &str) -> Result<&'static Encoding, EncodingError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {label}")))
}

/// Returns `true` if the label names UTF-8.
#[must_use]
pub fn is_utf8(label: &str) -> bool {
    resolve(label).is_ok_and(|enc| enc == UTF_8)
}

/// Transcodes a byte slice from the named encoding into a UTF-8 `String`.
///
/// A leading byte order mark matching the encoding is removed.
///
/// # Errors
///
/// Returns `EncodingError` if the encoding name is not recognized or if
/// the input contains malformed byte sequences.
///
/// # Examples
///
/// ```
/// use xmlscribe::encoding::transcode;
///
/// assert_eq!(transcode(b"caf\xE9", "ISO-8859-1").unwrap(), "caf\u{e9}");
/// ```
pub fn transcode(bytes: &[u8], encoding_name: &str) -> Result<String, EncodingError> {
    let encoding = resolve(encoding_name)?;
    let (result, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        return Err(EncodingError::new(format!(
            "malformed byte sequence for encoding {encoding_name}"
        )));
    }
    Ok(result.into_owned())
}

/// Decodes single-byte Latin-1 input. Every byte maps to a character, so
/// this never fails.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

/// Requires `bytes` to be valid UTF-8.
///
/// # Errors
///
/// Returns `EncodingError` naming the offset of the first invalid byte.
pub fn require_utf8(bytes: &[u8]) -> Result<&str, EncodingError> {
    std::str::from_utf8(bytes).map_err(|e| {
        EncodingError::new(format!(
            "input is not valid UTF-8 (invalid byte at offset {})",
            e.valid_up_to()
        ))
    })
}

/// Encodes `text` into `encoding`.
///
/// Characters the target encoding cannot represent are written as decimal
/// numeric character references (`&#NNNN;`). UTF-16 targets are written
/// without a byte order mark.
#[must_use]
pub fn encode(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    if encoding == UTF_16LE {
        return text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    }
    if encoding == UTF_16BE {
        return text.encode_utf16().flat_map(u16::to_be_bytes).collect();
    }
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}
