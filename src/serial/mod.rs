//! XML and HTML serialization.
//!
//! Turns a [`Tree`](crate::tree::Tree) back into markup text. The XML
//! serializer handles escaping, the declaration and indentation; the HTML
//! serializer handles void and raw-text elements and block formatting.

pub mod html;
pub mod xml;

pub use html::{serialize_html, HtmlSerializeOptions};
pub use xml::{serialize, SerializeOptions};
