//! Node type definitions.
//!
//! Each variant of [`NodeKind`] carries the payload for one kind of markup
//! construct. Navigation links live in `NodeData`, not here.

use super::Attribute;

/// The kind of a node and its associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic document node. There is exactly one per tree.
    Document,

    /// An element node, e.g., `<entry xml:lang="en">`.
    Element {
        /// The element's local name.
        name: String,
        /// Namespace prefix (e.g., `"atom"` in `atom:link`), if any.
        prefix: Option<String>,
        /// Namespace URI, if any.
        namespace: Option<String>,
        /// Attributes in insertion order.
        attributes: Vec<Attribute>,
    },

    /// Character data, stored decoded. Serializers escape it on output.
    Text {
        /// The text content.
        content: String,
    },

    /// A CDATA section. Content is written verbatim.
    CData {
        /// The CDATA content.
        content: String,
    },

    /// A comment, without the `<!--` and `-->` delimiters.
    Comment {
        /// The comment text.
        content: String,
    },

    /// A processing instruction, e.g., `<?xml-stylesheet href="a.xsl"?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A document type declaration, e.g., `<!DOCTYPE html>`.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
    },
}

impl NodeKind {
    /// Short lowercase name of the node kind, used in error messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Element { .. } => "element",
            Self::Text { .. } => "text",
            Self::CData { .. } => "cdata section",
            Self::Comment { .. } => "comment",
            Self::ProcessingInstruction { .. } => "processing instruction",
            Self::DocumentType { .. } => "document type",
        }
    }

    /// Builds an unprefixed, namespace-free element with no attributes.
    #[must_use]
    pub fn element(name: impl Into<String>) -> Self {
        Self::Element {
            name: name.into(),
            prefix: None,
            namespace: None,
            attributes: Vec::new(),
        }
    }

    /// Builds a text node.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }
}
