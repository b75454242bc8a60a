//! HTML documents.

use std::fmt;
use std::ops::{Deref, DerefMut};

use encoding_rs::UTF_8;
use tracing::debug;

use crate::error::Result;
use crate::tree::NodeKind;

use super::{Document, DocumentOptions, RenderOptions};

/// A [`Document`] preconfigured for HTML5 output.
///
/// It starts with `<!DOCTYPE html>`, has no XML version and renders in HTML
/// mode. Every builder operation is reached through `Deref` to
/// [`Document`].
///
/// ```
/// use xmlscribe::{HtmlDocument, RenderOptions};
///
/// let mut doc = HtmlDocument::default();
/// doc.add_root("p", "hi").unwrap();
/// let html = doc.render(&RenderOptions::default()).unwrap();
/// assert_eq!(html, "<!DOCTYPE html>\n<p>hi</p>\n");
/// ```
#[derive(Debug)]
pub struct HtmlDocument(Document);

impl HtmlDocument {
    /// Creates an empty HTML document using `encoding` for encoded output.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsupportedEncoding`](crate::BuildError::UnsupportedEncoding)
    /// if the encoding label is unknown.
    pub fn new(encoding: &str) -> Result<Self> {
        let options = DocumentOptions::default().no_version().encoding(encoding);
        Ok(Self::seeded(Document::with_options(options)?))
    }

    fn seeded(mut doc: Document) -> Self {
        let doctype = doc.tree.create_node(NodeKind::DocumentType {
            name: "html".to_string(),
            public_id: None,
            system_id: None,
        });
        let top = doc.tree.root();
        doc.tree.append_child(top, doctype);
        Self(doc)
    }

    /// Renders the document as HTML.
    ///
    /// # Errors
    ///
    /// As [`Document::render_html`].
    pub fn render(&self, options: &RenderOptions) -> Result<String> {
        self.0.render_html(options)
    }

    /// Unwraps the underlying document.
    #[must_use]
    pub fn into_inner(self) -> Document {
        self.0
    }
}

impl Default for HtmlDocument {
    /// A UTF-8 HTML document.
    fn default() -> Self {
        let options = DocumentOptions::default().no_version();
        Self::seeded(Document::from_parts(options, "utf-8".to_string(), UTF_8))
    }
}

impl Deref for HtmlDocument {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.0
    }
}

impl DerefMut for HtmlDocument {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.0
    }
}

/// Renders with the document's own formatting flag. When the pretty path
/// cannot re-parse the document, the compact rendering is written instead.
impl fmt::Display for HtmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let html = self.render(&RenderOptions::default()).unwrap_or_else(|err| {
            debug!(%err, "pretty HTML failed, writing compact output");
            self.0.html_compact()
        });
        f.write_str(&html)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::BuildError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paragraph() {
        let mut doc = HtmlDocument::new("utf-8").unwrap();
        doc.add_root("p", "hi").unwrap();
        assert_eq!(doc.to_string(), "<!DOCTYPE html>\n<p>hi</p>\n");
        assert_eq!(doc.version(), None);
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(
            HtmlDocument::new("nope"),
            Err(BuildError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_pretty_html() {
        let mut doc = HtmlDocument::default();
        let html = doc.add_root("html", "").unwrap();
        let body = doc.add_element(html, "body", "").unwrap();
        doc.add_element(body, "p", "one").unwrap();
        doc.add_element(body, "p", "two").unwrap();
        let out = doc.render(&RenderOptions::default().pretty(true)).unwrap();
        assert_eq!(
            out,
            "<!DOCTYPE html>\n<html>\n  <body>\n    <p>one</p>\n    <p>two</p>\n  </body>\n</html>\n"
        );
    }

    #[test]
    fn test_display_falls_back_to_compact() {
        let mut doc = HtmlDocument::default();
        doc.set_format_output(true);
        doc.add_root("x:p", "").unwrap();
        assert!(doc.render(&RenderOptions::default()).is_err());
        assert_eq!(doc.to_string(), doc.html_compact());
        assert!(doc.to_string().contains("<x:p>"));
    }

    #[test]
    fn test_xml_render_has_no_declaration() {
        let mut doc = HtmlDocument::default();
        doc.add_root("br", "").unwrap();
        assert_eq!(doc.render_xml(&RenderOptions::default()), "<!DOCTYPE html><br/>");
    }

    #[test]
    fn test_latin1_uses_named_entities() {
        let mut doc = HtmlDocument::new("iso-8859-1").unwrap();
        doc.add_root("p", "caf\u{e9}").unwrap();
        assert_eq!(doc.to_string(), "<!DOCTYPE html>\n<p>caf&eacute;</p>\n");
    }
}
