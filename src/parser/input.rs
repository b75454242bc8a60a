//! Cursor over the markup being imported.
//!
//! [`Cursor`] tracks the byte offset together with a line and column for
//! error reports, and knows how to read the small lexical pieces the parser
//! in `xml.rs` is built from: names, references, quoted literals and the
//! delimited bodies of comments, CDATA sections and processing
//! instructions.
//!
//! Only the five builtin entities and character references are resolved.
//! Anything declared in a DTD stays undeclared.

use memchr::memmem;

use crate::error::{ParseError, SourceLocation};
use crate::tree::XML_NAMESPACE;

pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;
pub(crate) const DEFAULT_MAX_ATTRIBUTES: u32 = 256;
pub(crate) const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// `Char` (XML 1.0 §2.2).
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(u32::from(c),
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x1_0000..=0x10_FFFF)
}

/// `NameStartChar` (XML 1.0 §2.3).
pub(crate) fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic()
        || c == '_'
        || c == ':'
        || matches!(u32::from(c),
            0xC0..=0xD6 | 0xD8..=0xF6 | 0xF8..=0x2FF | 0x370..=0x37D | 0x37F..=0x1FFF
            | 0x200C..=0x200D | 0x2070..=0x218F | 0x2C00..=0x2FEF | 0x3001..=0xD7FF
            | 0xF900..=0xFDCF | 0xFDF0..=0xFFFD | 0x1_0000..=0xE_FFFF)
}

/// `NameChar` (XML 1.0 §2.3).
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || c.is_ascii_digit()
        || c == '-'
        || c == '.'
        || matches!(u32::from(c), 0xB7 | 0x300..=0x36F | 0x203F..=0x2040)
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// The XML declaration of parsed input.
#[derive(Debug, Clone, Default)]
pub(crate) struct XmlDecl {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// Pseudo-attributes of the XML declaration, in the order they must appear.
const DECL_KEYS: [&str; 3] = ["version", "encoding", "standalone"];

pub(crate) struct Cursor<'a> {
    src: &'a str,
    offset: usize,
    line: u32,
    col: u32,
    depth: u32,
    max_depth: u32,
    max_name_length: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str, max_depth: u32, max_name_length: usize) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            col: 1,
            depth: 0,
            max_depth,
            max_name_length,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.col,
            byte_offset: self.offset,
        }
    }

    /// A fatal error at the current position.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
        }
    }

    pub fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.offset..]
    }

    pub fn at_end(&self) -> bool {
        self.offset == self.src.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.rest().as_bytes().first().copied()
    }

    pub fn at(&self, token: &str) -> bool {
        self.rest().starts_with(token)
    }

    /// `true` on `<` followed by the first character of a tag name.
    pub fn at_start_tag(&self) -> bool {
        matches!(self.rest().as_bytes(), [b'<', next, ..] if !matches!(next, b'!' | b'?' | b'/'))
    }

    /// Moves `len` bytes forward. The target must be a character boundary.
    pub fn bump(&mut self, len: usize) {
        let end = (self.offset + len).min(self.src.len());
        for &b in &self.src.as_bytes()[self.offset..end] {
            if b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else if b & 0xC0 != 0x80 {
                // Count only lead bytes so the column is in characters.
                self.col += 1;
            }
        }
        self.offset = end;
    }

    /// Consumes one character, rejecting non-`Char`s and folding `\r\n`
    /// and lone `\r` into `\n`.
    pub fn take_char(&mut self) -> Result<char, ParseError> {
        let c = self
            .rest()
            .chars()
            .next()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        if !is_xml_char(c) {
            return Err(self.error(format!("invalid XML character: U+{:04X}", u32::from(c))));
        }
        self.bump(c.len_utf8());
        if c != '\r' {
            return Ok(c);
        }
        if self.peek() == Some(b'\n') {
            self.bump(1);
        }
        Ok('\n')
    }

    pub fn expect(&mut self, token: &str) -> Result<(), ParseError> {
        if self.at(token) {
            self.bump(token.len());
            return Ok(());
        }
        Err(match self.rest().chars().next() {
            Some(found) => self.error(format!("expected '{token}', found '{found}'")),
            None => self.error(format!("expected '{token}', found end of input")),
        })
    }

    /// Skips XML whitespace and reports whether there was any.
    pub fn skip_space(&mut self) -> bool {
        let len = self.rest().bytes().take_while(|&b| is_space(b)).count();
        self.bump(len);
        len > 0
    }

    pub fn require_space(&mut self) -> Result<(), ParseError> {
        if self.skip_space() {
            Ok(())
        } else {
            Err(self.error("whitespace required"))
        }
    }

    pub fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error(format!(
                "maximum nesting depth exceeded ({})",
                self.max_depth
            )));
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Reads a `Name`, enforcing the name length limit.
    pub fn name(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if is_name_start_char(c) => {}
            Some((_, c)) => return Err(self.error(format!("invalid name start character: '{c}'"))),
            None => return Err(self.error("expected name, found end of input")),
        }
        let len = chars
            .find(|&(_, c)| !is_name_char(c))
            .map_or(rest.len(), |(i, _)| i);
        if len > self.max_name_length {
            return Err(self.error(format!(
                "name length ({len}) exceeds maximum ({})",
                self.max_name_length
            )));
        }
        self.bump(len);
        Ok(rest[..len].to_string())
    }

    /// Reads `&name;`, `&#N;` or `&#xH;` and returns the character.
    pub fn reference(&mut self) -> Result<char, ParseError> {
        self.expect("&")?;
        if self.peek() != Some(b'#') {
            let name = self.name()?;
            self.expect(";")?;
            return match name.as_str() {
                "lt" => Ok('<'),
                "gt" => Ok('>'),
                "amp" => Ok('&'),
                "apos" => Ok('\''),
                "quot" => Ok('"'),
                _ => Err(self.error(format!("undeclared entity reference: &{name};"))),
            };
        }
        self.bump(1);
        let radix = if self.peek() == Some(b'x') {
            self.bump(1);
            16
        } else {
            10
        };
        let digits = self.rest().bytes().take_while(|b| b.is_ascii_hexdigit()).count();
        let code = u32::from_str_radix(&self.rest()[..digits], radix)
            .map_err(|_| self.error("malformed character reference"))?;
        self.bump(digits);
        self.expect(";")?;
        char::from_u32(code).filter(|&c| is_xml_char(c)).ok_or_else(|| {
            self.error(format!(
                "character reference &#x{code:X}; is not a legal XML character"
            ))
        })
    }

    fn open_quote(&mut self) -> Result<u8, ParseError> {
        match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                self.bump(1);
                Ok(q)
            }
            _ => Err(self.error("expected a quoted value")),
        }
    }

    /// Reads a quoted literal verbatim.
    pub fn literal(&mut self) -> Result<String, ParseError> {
        let quote = self.open_quote()?;
        let len = memchr::memchr(quote, self.rest().as_bytes())
            .ok_or_else(|| self.error("unterminated quoted value"))?;
        let value = self.rest()[..len].to_string();
        self.bump(len + 1);
        Ok(value)
    }

    /// Reads a quoted attribute value, resolving references and turning
    /// tabs and newlines into spaces.
    pub fn attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.open_quote()?;
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(b) if b == quote => break,
                Some(b'<') => return Err(self.error("'<' not allowed in attribute values")),
                Some(b'&') => value.push(self.reference()?),
                Some(_) => {
                    let c = self.take_char()?;
                    value.push(if c == '\t' || c == '\n' { ' ' } else { c });
                }
                None => return Err(self.error("unexpected end of input in attribute value")),
            }
        }
        self.bump(1);
        Ok(value)
    }

    /// Reads everything up to `end`, validating characters and normalizing
    /// line ends, then consumes `end` as well.
    fn until(&mut self, end: &str, what: &str) -> Result<String, ParseError> {
        let len = memmem::find(self.rest().as_bytes(), end.as_bytes())
            .ok_or_else(|| self.error(format!("unexpected end of input in {what}")))?;
        let stop = self.offset + len;
        let mut body = String::with_capacity(len);
        while self.offset < stop {
            body.push(self.take_char()?);
        }
        self.bump(end.len());
        Ok(body)
    }

    /// `<!-- ... -->`
    pub fn comment(&mut self) -> Result<String, ParseError> {
        self.expect("<!--")?;
        let body = self.until("-->", "comment")?;
        if body.contains("--") || body.ends_with('-') {
            return Err(self.error("'--' not allowed inside comments"));
        }
        Ok(body)
    }

    /// `<![CDATA[ ... ]]>`
    pub fn cdata(&mut self) -> Result<String, ParseError> {
        self.expect("<![CDATA[")?;
        self.until("]]>", "CDATA section")
    }

    /// `<?target data?>`. Empty data is reported as `None`.
    pub fn processing_instruction(&mut self) -> Result<(String, Option<String>), ParseError> {
        self.expect("<?")?;
        let target = self.name()?;
        if target.eq_ignore_ascii_case("xml") {
            return Err(self.error("PI target 'xml' is reserved"));
        }
        if target.contains(':') {
            return Err(self.error("PI target must not contain a colon"));
        }
        if !self.skip_space() {
            self.expect("?>")?;
            return Ok((target, None));
        }
        let data = self.until("?>", "processing instruction")?;
        Ok((target, Some(data).filter(|d| !d.is_empty())))
    }

    /// `<?xml version="1.0" encoding="..." standalone="..."?>`. Version
    /// comes first and the optional keys keep their order.
    pub fn xml_decl(&mut self) -> Result<XmlDecl, ParseError> {
        self.expect("<?xml")?;
        let mut decl = XmlDecl::default();
        let mut next_key = 0;
        loop {
            let spaced = self.skip_space();
            if self.at("?>") {
                self.bump(2);
                break;
            }
            if !spaced {
                return Err(self.error("whitespace required in XML declaration"));
            }
            let key = self.name()?;
            let index = DECL_KEYS
                .iter()
                .position(|k| *k == key)
                .ok_or_else(|| self.error(format!("unknown XML declaration field '{key}'")))?;
            if index < next_key || (next_key == 0 && index != 0) {
                return Err(self.error(format!("'{key}' out of place in XML declaration")));
            }
            next_key = index + 1;
            self.skip_space();
            self.expect("=")?;
            self.skip_space();
            let value = self.literal()?;
            match index {
                0 if is_version_num(&value) => decl.version = value,
                1 if is_encoding_name(&value) => decl.encoding = Some(value),
                2 if value == "yes" || value == "no" => decl.standalone = Some(value == "yes"),
                _ => return Err(self.error(format!("invalid {key} '{value}'"))),
            }
        }
        if next_key == 0 {
            return Err(self.error("XML declaration without version"));
        }
        Ok(decl)
    }
}

/// `'1.' [0-9]+`
fn is_version_num(s: &str) -> bool {
    s.strip_prefix("1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

/// `[A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_encoding_name(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().enumerate().all(|(i, b)| {
            b.is_ascii_alphabetic()
                || (i > 0 && (b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-')))
        })
}

/// In-scope namespace bindings while parsing. Each element opens a scope;
/// closing it drops the bindings its start tag declared.
pub(crate) struct Scopes {
    bindings: Vec<(Option<String>, String)>,
    marks: Vec<usize>,
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            bindings: vec![(Some("xml".to_string()), XML_NAMESPACE.to_string())],
            marks: Vec::new(),
        }
    }

    pub fn open(&mut self) {
        self.marks.push(self.bindings.len());
    }

    pub fn close(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
    }

    pub fn bind(&mut self, prefix: Option<String>, uri: String) {
        self.bindings.push((prefix, uri));
    }

    /// The URI for `prefix`, or `None` if unbound or undeclared with `""`.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        let (_, uri) = self.bindings.iter().rev().find(|(p, _)| p.as_deref() == prefix)?;
        Some(uri.as_str()).filter(|u| !u.is_empty())
    }

    pub fn is_bound(&self, prefix: &str) -> bool {
        self.bindings.iter().any(|(p, _)| p.as_deref() == Some(prefix))
    }
}
