//! Tests for HTML documents and HTML rendering of XML documents.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use xmlscribe::{BuildError, Document, HtmlDocument, OutputMode, RenderOptions};

// ---------------------------------------------------------------------------
// HtmlDocument
// ---------------------------------------------------------------------------

#[test]
fn test_paragraph_without_declaration() {
    let mut doc = HtmlDocument::new("utf-8").unwrap();
    doc.add_root("p", "hi").unwrap();
    let out = doc.render(&RenderOptions::default()).unwrap();
    assert_eq!(out, "<!DOCTYPE html>\n<p>hi</p>\n");
    assert!(!out.contains("<?xml"));
}

#[test]
fn test_declaration_flag_is_ignored_for_html() {
    let mut doc = HtmlDocument::default();
    doc.add_root("p", "hi").unwrap();
    let out = doc
        .render(&RenderOptions::default().include_declaration(true))
        .unwrap();
    assert_eq!(out, "<!DOCTYPE html>\n<p>hi</p>\n");
}

#[test]
fn test_void_and_boolean_elements() {
    let mut doc = HtmlDocument::default();
    let form = doc.add_root("form", "").unwrap();
    doc.add_element_with_attributes(form, "input", "", [("type", "checkbox"), ("checked", "checked")])
        .unwrap();
    doc.add_element(form, "br", "").unwrap();
    assert_eq!(
        doc.to_string(),
        "<!DOCTYPE html>\n<form><input type=\"checkbox\" checked><br></form>\n"
    );
}

#[test]
fn test_script_content_is_raw() {
    let mut doc = HtmlDocument::default();
    let html = doc.add_root("html", "").unwrap();
    doc.add_element(html, "script", "if (a < b && c) {}").unwrap();
    assert_eq!(
        doc.inner_html(html).unwrap(),
        "<script>if (a < b && c) {}</script>"
    );
}

#[test]
fn test_link_with_space_in_href() {
    let mut doc = HtmlDocument::default();
    let p = doc.add_root("p", "").unwrap();
    let a = doc
        .add_element_with_attributes(p, "a", "docs", [("href", "/my docs/")])
        .unwrap();
    assert_eq!(
        doc.render_node_html(a).unwrap(),
        "<a href=\"/my%20docs/\">docs</a>"
    );
}

#[test]
fn test_pretty_blocks_keep_inline_content() {
    let mut doc = HtmlDocument::default();
    let html = doc.add_root("html", "").unwrap();
    let body = doc.add_element(html, "body", "").unwrap();
    let p = doc.add_element(body, "p", "Hello ").unwrap();
    doc.add_element(p, "em", "world").unwrap();

    let out = doc.render(&RenderOptions::default().pretty(true)).unwrap();
    assert!(out.starts_with("<!DOCTYPE html>\n<html>\n"), "got: {out}");
    assert!(out.contains("<p>Hello <em>world</em></p>"), "got: {out}");
    assert!(out.ends_with("</html>\n"), "got: {out}");

    let compact = doc.render(&RenderOptions::default()).unwrap();
    assert_eq!(
        compact,
        "<!DOCTYPE html>\n<html><body><p>Hello <em>world</em></p></body></html>\n"
    );
}

#[test]
fn test_format_output_default_applies_to_render() {
    let mut doc = HtmlDocument::default();
    let ul = doc.add_root("ul", "").unwrap();
    doc.add_element(ul, "li", "one").unwrap();
    let compact = doc.to_string();
    doc.set_format_output(true);
    assert_ne!(doc.to_string(), compact);
    assert_eq!(
        doc.render(&RenderOptions::default().pretty(false)).unwrap(),
        compact
    );
}

#[test]
fn test_latin1_html_uses_named_entities_and_encodes() {
    let mut doc = HtmlDocument::new("iso-8859-1").unwrap();
    doc.add_root("p", "caf\u{e9} \u{2603}").unwrap();
    assert_eq!(doc.to_string(), "<!DOCTYPE html>\n<p>caf&eacute; \u{2603}</p>\n");

    let bytes = doc
        .render_encoded(OutputMode::Html, &RenderOptions::default())
        .unwrap();
    assert_eq!(bytes, b"<!DOCTYPE html>\n<p>caf&eacute; &#9731;</p>\n".to_vec());
}

#[test]
fn test_empty_html_document() {
    let doc = HtmlDocument::default();
    let out = doc.render(&RenderOptions::default().pretty(true)).unwrap();
    assert_eq!(out, "<!DOCTYPE html>\n");
}

// ---------------------------------------------------------------------------
// HTML rendering of XML documents
// ---------------------------------------------------------------------------

#[test]
fn test_xml_document_as_html() {
    let mut doc = Document::default();
    let div = doc.add_root("div", "").unwrap();
    doc.add_element(div, "img", "").unwrap();
    doc.add_cdata(div, "p", "a<b").unwrap();
    assert_eq!(
        doc.render_html(&RenderOptions::default()).unwrap(),
        "<div><img><p>a&lt;b</p></div>\n"
    );
}

#[test]
fn test_inner_html_of_imported_markup() {
    let mut doc = Document::default();
    let root = doc.add_root("body", "").unwrap();
    let section = doc
        .add_raw_subtree(root, "<section><h1>T</h1><hr/></section>")
        .unwrap();
    assert_eq!(doc.inner_html(section).unwrap(), "<h1>T</h1><hr>");
    assert_eq!(doc.inner_xml(section).unwrap(), "<h1>T</h1><hr/>");
}

#[test]
fn test_pretty_html_with_unbound_prefix_fails() {
    let mut doc = HtmlDocument::default();
    let root = doc.add_root("div", "").unwrap();
    // A prefixed name with no binding in scope is accepted by the builder
    // but cannot survive the re-parse used for pretty output.
    doc.add_element(root, "x:widget", "").unwrap();
    assert!(doc.render(&RenderOptions::default()).is_ok());
    assert!(matches!(
        doc.render(&RenderOptions::default().pretty(true)),
        Err(BuildError::MalformedMarkup(_))
    ));
}

#[test]
fn test_display_never_panics_on_unparseable_pretty_output() {
    let mut doc = HtmlDocument::default();
    doc.set_format_output(true);
    doc.add_root("x:p", "").unwrap();
    let shown = doc.to_string();
    assert!(shown.starts_with("<!DOCTYPE html>\n"));
    assert!(shown.contains("<x:p>"));
}

// ---------------------------------------------------------------------------
// Pretty output of large documents
// ---------------------------------------------------------------------------

#[test]
fn test_pretty_html_beyond_default_depth() {
    let out = std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(|| {
            let mut doc = HtmlDocument::default();
            let mut parent = doc.add_root("div", "").unwrap();
            for _ in 0..300 {
                parent = doc.add_element(parent, "div", "").unwrap();
            }
            doc.render(&RenderOptions::default().pretty(true))
        })
        .unwrap()
        .join()
        .unwrap()
        .unwrap();
    assert_eq!(out.matches("<div>").count(), 301);
    assert_eq!(out.matches("</div>").count(), 301);
}

#[test]
fn test_pretty_html_beyond_default_attribute_count() {
    let mut doc = HtmlDocument::default();
    let attrs: Vec<(String, String)> = (0..300)
        .map(|i| (format!("data-a{i}"), i.to_string()))
        .collect();
    doc.add_root_with_attributes(
        "p",
        "many",
        attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )
    .unwrap();
    let out = doc.render(&RenderOptions::default().pretty(true)).unwrap();
    assert!(out.contains(" data-a0=\"0\""));
    assert!(out.contains(" data-a299=\"299\">many</p>"));
}
