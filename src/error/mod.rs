//! Error types for markup import and document building.
//!
//! Fragment parsing reports a [`ParseError`] carrying the line, column and
//! byte offset of the first well-formedness violation. Builder operations
//! report a [`BuildError`], which wraps parse and encoding failures alongside
//! the state and type errors raised by the node operations themselves.

use std::fmt;

use crate::encoding::EncodingError;

/// Source location within a parsed markup fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type returned when a markup fragment is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Errors raised by [`Document`](crate::Document) operations.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Raw markup handed to an import operation is not well-formed XML.
    #[error("malformed markup: {0}")]
    MalformedMarkup(#[from] ParseError),

    /// A node argument has the wrong kind for the operation.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What the operation accepts.
        expected: &'static str,
        /// What it was given.
        found: &'static str,
    },

    /// The operation is not valid for the node or document in its current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The document encoding label is not known to the transcoder.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Input bytes could not be decoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl BuildError {
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Result alias used throughout the builder API.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;
