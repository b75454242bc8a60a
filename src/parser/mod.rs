//! Well-formedness parser for standalone markup fragments.
//!
//! A hand-rolled recursive descent parser for the XML 1.0 subset needed to
//! import caller-supplied markup: elements, attributes, namespaces, text,
//! CDATA, comments, processing instructions, the XML declaration and a
//! DOCTYPE whose internal subset is skipped. The first well-formedness
//! violation aborts the parse with a located [`ParseError`].

pub(crate) mod input;
mod xml;

use crate::error::ParseError;
use crate::tree::Tree;

use input::{DEFAULT_MAX_ATTRIBUTES, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NAME_LENGTH};

/// Parse options controlling whitespace handling and size limits.
///
/// ```
/// use xmlscribe::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .no_blanks(true)
///     .max_depth(128);
/// assert!(opts.no_blanks);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// If true, drop text nodes that consist only of whitespace.
    pub no_blanks: bool,
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum number of attributes on a single element (default: 256).
    pub max_attributes: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            no_blanks: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl ParseOptions {
    /// Enables or disables stripping of blank text nodes.
    #[must_use]
    pub fn no_blanks(mut self, yes: bool) -> Self {
        self.no_blanks = yes;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of attributes per element.
    #[must_use]
    pub fn max_attributes(mut self, max: u32) -> Self {
        self.max_attributes = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }
}

/// Parses a markup string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed.
///
/// # Examples
///
/// ```
/// use xmlscribe::parser::parse_str;
///
/// let tree = parse_str("<item><title>Hello</title></item>").unwrap();
/// let item = tree.root_element().unwrap();
/// assert_eq!(tree.text_content(item), "Hello");
/// assert!(parse_str("<a><b></a>").is_err());
/// ```
pub fn parse_str(input: &str) -> Result<Tree, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses a markup string with the given options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed or exceeds one of
/// the configured limits.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Tree, ParseError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    xml::XmlParser::new(input, options).parse()
}
