//! HTML serializer.
//!
//! Serializes a [`Tree`] into an HTML string. Key differences from XML
//! serialization:
//!
//! - No XML declaration (`<?xml ...?>`)
//! - Void elements use `<br>` syntax (no `/>`)
//! - Non-void empty elements use `<p></p>` (no `<p/>`)
//! - Raw text elements (script, style) are not escaped
//! - CDATA sections are written as escaped text
//! - Optional formatting newlines around block-level elements
//! - Optional re-encoding of non-ASCII characters as named entities

use crate::entities::name_for_char;
use crate::tree::{NodeId, NodeKind, Tree};

use super::xml::write_doctype;

/// Options controlling HTML serialization output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlSerializeOptions {
    /// Insert formatting newlines around block-level elements.
    /// Defaults to `false`.
    pub format: bool,
    /// Write non-ASCII characters that have an HTML entity name as
    /// `&name;`. Used when the output encoding is not UTF-8.
    /// Defaults to `false`.
    pub named_entities: bool,
}

impl HtmlSerializeOptions {
    /// Enables or disables block-level formatting newlines.
    #[must_use]
    pub fn format(mut self, yes: bool) -> Self {
        self.format = yes;
        self
    }

    /// Enables or disables named-entity re-encoding of non-ASCII text.
    #[must_use]
    pub fn named_entities(mut self, yes: bool) -> Self {
        self.named_entities = yes;
        self
    }
}

/// Serializes a whole tree to an HTML string.
///
/// A DOCTYPE is always followed by a newline and the output always ends
/// with one.
///
/// # Examples
///
/// ```
/// use xmlscribe::parser::parse_str;
/// use xmlscribe::serial::html::{serialize_html, HtmlSerializeOptions};
///
/// let tree = parse_str("<p>Hello<br/></p>").unwrap();
/// let html = serialize_html(&tree, &HtmlSerializeOptions::default());
/// assert_eq!(html, "<p>Hello<br></p>\n");
/// ```
#[must_use]
pub fn serialize_html(tree: &Tree, options: &HtmlSerializeOptions) -> String {
    let mut output = String::new();

    for child in tree.children(tree.root()) {
        serialize_html_node(tree, child, &mut output, options);
        if matches!(tree.node(child).kind, NodeKind::DocumentType { .. }) {
            output.push('\n');
        }
    }

    if !output.ends_with('\n') {
        output.push('\n');
    }

    output
}

/// Serializes one node and its descendants as HTML.
#[must_use]
pub fn serialize_html_subtree(tree: &Tree, id: NodeId, options: &HtmlSerializeOptions) -> String {
    if id == tree.root() {
        return serialize_html(tree, options);
    }
    let mut output = String::new();
    serialize_html_node(tree, id, &mut output, options);
    output
}

/// Serializes the children of a node as HTML, without the node's own tags.
#[must_use]
pub fn serialize_html_children(
    tree: &Tree,
    id: NodeId,
    options: &HtmlSerializeOptions,
) -> String {
    let mut output = String::new();
    for child in tree.children(id) {
        serialize_html_node(tree, child, &mut output, options);
    }
    output
}

/// Returns true for elements that never have content or a closing tag.
fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Returns true for elements whose text content is written unescaped.
fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Returns true if the element is an HTML inline element.
///
/// Block-level elements get formatting newlines around them when
/// formatting is enabled.
fn is_inline_element(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "abbr"
            | "b"
            | "bdo"
            | "br"
            | "cite"
            | "code"
            | "dfn"
            | "em"
            | "i"
            | "img"
            | "input"
            | "kbd"
            | "label"
            | "q"
            | "s"
            | "samp"
            | "select"
            | "small"
            | "span"
            | "strong"
            | "sub"
            | "sup"
            | "textarea"
            | "u"
            | "var"
    )
}

/// Returns true if the node kind is text-like (`Text` or `CData`).
///
/// Formatting newlines are suppressed next to text so no whitespace is
/// invented inside mixed content.
fn is_text_like(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Text { .. } | NodeKind::CData { .. })
}

/// Newline after a block element's opening tag: the element is not inline,
/// its name does not start with 'p' (p, pre, param), its first child is
/// not text and it has more than one child.
fn maybe_newline_after_open(tree: &Tree, id: NodeId, tag: &str, out: &mut String) {
    if is_inline_element(tag) || tag.starts_with('p') {
        return;
    }
    let Some(first) = tree.first_child(id) else {
        return;
    };
    if is_text_like(&tree.node(first).kind) || tree.next_sibling(first).is_none() {
        return;
    }
    out.push('\n');
}

/// Newline before a block element's closing tag, mirroring
/// [`maybe_newline_after_open`] on the last child.
fn maybe_newline_before_close(tree: &Tree, id: NodeId, tag: &str, out: &mut String) {
    if is_inline_element(tag) || tag.starts_with('p') {
        return;
    }
    let (Some(first), Some(last)) = (tree.first_child(id), tree.last_child(id)) else {
        return;
    };
    if is_text_like(&tree.node(last).kind) || tree.next_sibling(first).is_none() {
        return;
    }
    out.push('\n');
}

/// Newline after a block element's closing tag when a non-text sibling
/// follows and the parent's name does not start with 'p'.
fn maybe_newline_after_close(tree: &Tree, id: NodeId, tag: &str, out: &mut String) {
    if is_inline_element(tag) {
        return;
    }
    let Some(next) = tree.next_sibling(id) else {
        return;
    };
    if is_text_like(&tree.node(next).kind) {
        return;
    }
    if let Some(parent) = tree.parent(id) {
        if tree.node_name(parent).unwrap_or("").starts_with('p') {
            return;
        }
    }
    out.push('\n');
}

fn serialize_html_node(tree: &Tree, id: NodeId, out: &mut String, options: &HtmlSerializeOptions) {
    let reencode = options.named_entities;
    match &tree.node(id).kind {
        NodeKind::Element {
            name,
            prefix,
            attributes,
            ..
        } => {
            out.push('<');
            if let Some(pfx) = prefix {
                out.push_str(pfx);
                out.push(':');
            }
            out.push_str(name);

            for attr in attributes {
                out.push(' ');
                if let Some(pfx) = &attr.prefix {
                    out.push_str(pfx);
                    out.push(':');
                }
                out.push_str(&attr.name);
                // Boolean attributes: output without value when value == name
                if attr.value == attr.name {
                    continue;
                }
                if attr.value.contains('"') && !attr.value.contains('\'') {
                    out.push_str("='");
                    write_html_escaped(out, &attr.value, reencode, EscapeMode::SingleQuoted);
                    out.push('\'');
                } else {
                    out.push_str("=\"");
                    let mode = if is_uri_attribute(&attr.name) {
                        EscapeMode::Uri
                    } else {
                        EscapeMode::DoubleQuoted
                    };
                    write_html_escaped(out, &attr.value, reencode, mode);
                    out.push('"');
                }
            }
            out.push('>');

            let lower = name.to_ascii_lowercase();

            if is_void_element(&lower) {
                if options.format {
                    maybe_newline_after_close(tree, id, &lower, out);
                }
                return;
            }

            if options.format {
                maybe_newline_after_open(tree, id, &lower, out);
            }

            let raw_text = is_raw_text_element(&lower);
            for child in tree.children(id) {
                match &tree.node(child).kind {
                    NodeKind::Text { content } | NodeKind::CData { content } if raw_text => {
                        out.push_str(content);
                    }
                    _ => serialize_html_node(tree, child, out, options),
                }
            }

            if options.format {
                maybe_newline_before_close(tree, id, &lower, out);
            }

            out.push_str("</");
            if let Some(pfx) = prefix {
                out.push_str(pfx);
                out.push(':');
            }
            out.push_str(name);
            out.push('>');

            if options.format {
                maybe_newline_after_close(tree, id, &lower, out);
            }
        }
        NodeKind::Text { content } | NodeKind::CData { content } => {
            write_html_escaped(out, content, reencode, EscapeMode::Text);
        }
        NodeKind::Comment { content } => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction { target, data } => {
            // HTML PIs use '>' as terminator, not '?>'
            out.push_str("<?");
            out.push_str(target);
            if let Some(d) = data {
                out.push(' ');
                out.push_str(d);
            }
            out.push('>');
        }
        NodeKind::DocumentType {
            name,
            public_id,
            system_id,
        } => {
            write_doctype(out, name, public_id.as_deref(), system_id.as_deref());
        }
        NodeKind::Document => {
            for child in tree.children(id) {
                serialize_html_node(tree, child, out, options);
            }
        }
    }
}

/// Returns true if the attribute holds a URI whose spaces are written as
/// `%20`.
fn is_uri_attribute(name: &str) -> bool {
    matches!(
        name,
        "href"
            | "src"
            | "action"
            | "background"
            | "cite"
            | "codebase"
            | "data"
            | "formaction"
            | "longdesc"
            | "poster"
            | "usemap"
    )
}

/// Where an escaped string is going.
#[derive(Clone, Copy, PartialEq, Eq)]
enum EscapeMode {
    Text,
    DoubleQuoted,
    SingleQuoted,
    Uri,
}

/// Escapes `&`, `<` and `>` everywhere, the delimiting quote inside
/// attribute values, and spaces inside URI attributes. With `reencode`,
/// non-ASCII characters that have an entity name become `&name;`.
fn write_html_escaped(out: &mut String, text: &str, reencode: bool, mode: EscapeMode) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if matches!(mode, EscapeMode::DoubleQuoted | EscapeMode::Uri) => {
                out.push_str("&quot;");
            }
            '\'' if mode == EscapeMode::SingleQuoted => out.push_str("&#39;"),
            ' ' if mode == EscapeMode::Uri => out.push_str("%20"),
            c if reencode && !c.is_ascii() => match name_for_char(c) {
                Some(name) => {
                    out.push('&');
                    out.push_str(name);
                    out.push(';');
                }
                None => out.push(c),
            },
            _ => out.push(ch),
        }
    }
}
