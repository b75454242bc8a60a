//! # xmlscribe
//!
//! A programmatic XML/HTML document builder with byte-predictable output,
//! paired with an entity-safe text sanitizer.
//!
//! Documents are assembled node by node (elements, attributes, namespaces,
//! CDATA, comments, processing instructions, imported raw markup) and then
//! rendered as XML or HTML, compact or pretty, with or without the XML
//! declaration.
//!
//! ## Quick Start
//!
//! ```
//! use xmlscribe::{Document, RenderOptions};
//!
//! let mut doc = Document::new("1.0", "utf-8").unwrap();
//! let root = doc.add_root("root", "").unwrap();
//! doc.add_element(root, "child", "1 < 2").unwrap();
//! assert_eq!(
//!     doc.to_string(),
//!     "<?xml version=\"1.0\" encoding=\"utf-8\"?><root><child>1 &lt; 2</child></root>"
//! );
//! ```
//!
//! ## Sanitizing text
//!
//! ```
//! use xmlscribe::safe_xml;
//!
//! assert_eq!(safe_xml("Fish & Chips &amp; &nbsp;"), "Fish &amp; Chips &amp; &#160;");
//! ```

pub mod document;
pub mod encoding;
pub mod entities;
pub mod error;
pub mod parser;
pub mod sanitize;
pub mod serial;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use document::{
    Document, DocumentId, DocumentOptions, HtmlDocument, Namespace, Node, NodeSource, OutputMode,
    RenderOptions,
};
pub use error::{BuildError, ParseError, Result};
pub use sanitize::safe_xml;
