//! Entity-safe text sanitizing.
//!
//! [`safe_xml`] turns arbitrary text into content that can be dropped into
//! XML markup as-is. Bare `&`, `<` and `>` are escaped, while anything that
//! already looks like an entity reference is kept. HTML-only named entities
//! are then rewritten to numeric references, since XML predefines just five
//! names.

use std::borrow::Cow;

use memchr::memchr;

use crate::encoding;
use crate::entities::replace_html_entities;
use crate::error::Result;

/// Sanitizes `text` for use as XML character data.
///
/// A reference is `&`, one or more characters other than space, `<`, `>`,
/// `;` and `&`, then `;`. References are copied through unchanged; every
/// other `&`, `<` and `>` is escaped. Quotes are never escaped.
///
/// # Examples
///
/// ```
/// use xmlscribe::safe_xml;
///
/// assert_eq!(safe_xml("a & b &amp; c"), "a &amp; b &amp; c");
/// assert_eq!(safe_xml("&nbsp;&copy;"), "&#160;&#169;");
/// assert_eq!(safe_xml("<b>\"x\"</b>"), "&lt;b&gt;\"x\"&lt;/b&gt;");
/// ```
#[must_use]
pub fn safe_xml(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut pos = 0;

    while let Some(offset) = memchr(b'&', &bytes[pos..]) {
        let amp = pos + offset;
        out.push_str(&escape_markup(&text[pos..amp]));
        match reference_end(&bytes[amp..]) {
            Some(len) => {
                out.push_str(&text[amp..amp + len]);
                pos = amp + len;
            }
            None => {
                out.push_str("&amp;");
                pos = amp + 1;
            }
        }
    }
    out.push_str(&escape_markup(&text[pos..]));

    match replace_html_entities(&out) {
        Cow::Borrowed(_) => out,
        Cow::Owned(replaced) => replaced,
    }
}

/// Sanitizes raw bytes.
///
/// With `to_utf8` the input is decoded as Latin-1 first. Without it the
/// bytes must already be UTF-8.
///
/// # Errors
///
/// Returns [`BuildError::Encoding`](crate::BuildError::Encoding) if `to_utf8`
/// is false and `bytes` is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use xmlscribe::sanitize::safe_xml_bytes;
///
/// assert_eq!(safe_xml_bytes(b"caf\xE9 & co", true).unwrap(), "caf\u{e9} &amp; co");
/// assert!(safe_xml_bytes(b"caf\xE9", false).is_err());
/// ```
pub fn safe_xml_bytes(bytes: &[u8], to_utf8: bool) -> Result<String> {
    if to_utf8 {
        Ok(safe_xml(&encoding::decode_latin1(bytes)))
    } else {
        Ok(safe_xml(encoding::require_utf8(bytes)?))
    }
}

/// Escapes `&`, `<` and `>`, leaving quotes alone.
#[must_use]
pub fn escape_markup(text: &str) -> Cow<'_, str> {
    if !text.bytes().any(|b| matches!(b, b'&' | b'<' | b'>')) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// If `bytes` (starting at `&`) opens a reference, returns its full length
/// including `&` and `;`.
fn reference_end(bytes: &[u8]) -> Option<usize> {
    let body = bytes.get(1..)?;
    let name_len = body
        .iter()
        .position(|&b| matches!(b, b' ' | b'<' | b'>' | b';' | b'&'))?;
    (name_len > 0 && body[name_len] == b';').then_some(name_len + 2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(safe_xml("hello world"), "hello world");
        assert_eq!(safe_xml(""), "");
    }

    #[test]
    fn test_bare_ampersand_escaped() {
        assert_eq!(safe_xml("a & b &amp; c"), "a &amp; b &amp; c");
    }

    #[test]
    fn test_angle_brackets_escaped() {
        assert_eq!(safe_xml("1 < 2 > 0"), "1 &lt; 2 &gt; 0");
    }

    #[test]
    fn test_quotes_untouched() {
        assert_eq!(safe_xml("say \"hi\" & 'bye'"), "say \"hi\" &amp; 'bye'");
    }

    #[test]
    fn test_named_entities_become_numeric() {
        assert_eq!(safe_xml("&nbsp;&copy;"), "&#160;&#169;");
        assert_eq!(safe_xml("&mdash; &euro;"), "&#8212; &#8364;");
    }

    #[test]
    fn test_builtins_and_numeric_references_kept() {
        assert_eq!(safe_xml("&lt;&gt;&quot;&apos;"), "&lt;&gt;&quot;&apos;");
        assert_eq!(safe_xml("&#160;&#xA0;"), "&#160;&#xA0;");
    }

    #[test]
    fn test_unknown_reference_passes_through() {
        assert_eq!(safe_xml("&foo; &alpha;"), "&foo; &alpha;");
    }

    #[test]
    fn test_trailing_ampersand() {
        assert_eq!(safe_xml("fish &"), "fish &amp;");
        assert_eq!(safe_xml("&"), "&amp;");
    }

    #[test]
    fn test_invalid_reference_names() {
        assert_eq!(safe_xml("&;"), "&amp;;");
        assert_eq!(safe_xml("&a b;"), "&amp;a b;");
        assert_eq!(safe_xml("&a<b;"), "&amp;a&lt;b;");
        assert_eq!(safe_xml("&&amp;"), "&amp;&amp;");
    }

    #[test]
    fn test_no_double_escaping() {
        let once = safe_xml("Tom & Jerry <3 &copy; &#169;");
        assert_eq!(once, "Tom &amp; Jerry &lt;3 &#169; &#169;");
        assert_eq!(safe_xml(&once), once);
    }

    #[test]
    fn test_non_ascii_text() {
        assert_eq!(safe_xml("naïve & café"), "naïve &amp; café");
    }

    #[test]
    fn test_bytes_latin1() {
        assert_eq!(safe_xml_bytes(b"\xA9 2024 &copy;", true).unwrap(), "\u{a9} 2024 &#169;");
    }

    #[test]
    fn test_bytes_utf8_required() {
        assert_eq!(safe_xml_bytes("é<".as_bytes(), false).unwrap(), "é&lt;");
        let err = safe_xml_bytes(b"\xE9", false).unwrap_err();
        assert!(matches!(err, crate::BuildError::Encoding(_)));
    }

    #[test]
    fn test_escape_markup_borrows() {
        assert!(matches!(escape_markup("abc"), Cow::Borrowed("abc")));
        assert_eq!(escape_markup("<&>\""), "&lt;&amp;&gt;\"");
    }
}
