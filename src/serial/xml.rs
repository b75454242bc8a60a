//! XML serializer.
//!
//! Serializes a [`Tree`] (or a subtree of it) into a well-formed XML string.
//! Output is UTF-8; transcoding to the document encoding happens one layer
//! up, in [`Document::render_encoded`](crate::Document::render_encoded).

use std::fmt::Write;

use crate::tree::{NodeId, NodeKind, Tree};

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use xmlscribe::parser::parse_str;
/// use xmlscribe::serial::xml::{serialize, SerializeOptions};
///
/// let tree = parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize(&tree, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("  <child>"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
    /// Whether to emit the `<?xml ...?>` declaration. It is only written
    /// when the tree carries a version. Defaults to `true`.
    pub declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
            declaration: true,
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indented (pretty-printed) output.
    ///
    /// When enabled, child elements are placed on their own lines with
    /// indentation. Mixed-content elements (those containing both text and
    /// element children) are written as-is so no whitespace is invented
    /// inside them.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }

    /// Enables or disables the XML declaration.
    #[must_use]
    pub fn declaration(mut self, yes: bool) -> Self {
        self.declaration = yes;
        self
    }
}

/// Serializes a whole tree to an XML string.
///
/// Compact output is a single line: the declaration is immediately followed
/// by the root element and there is no trailing newline. Indented output
/// ends the declaration and every top-level node with a newline.
#[must_use]
pub fn serialize(tree: &Tree, options: &SerializeOptions) -> String {
    let mut output = String::new();

    if options.declaration {
        if let Some(version) = tree.version.as_deref() {
            write_declaration(&mut output, tree, version);
            if options.indent {
                output.push('\n');
            }
        }
    }

    for child in tree.children(tree.root()) {
        serialize_node(tree, child, &mut output, options, 0, false);
        if options.indent {
            output.push('\n');
        }
    }

    output
}

/// Serializes one node and its descendants. Nothing is written before or
/// after the node itself.
#[must_use]
pub fn serialize_subtree(tree: &Tree, id: NodeId, options: &SerializeOptions) -> String {
    let mut output = String::new();
    if id == tree.root() {
        return serialize(tree, options);
    }
    serialize_node(tree, id, &mut output, options, 0, false);
    output
}

/// Serializes the children of a node, without the node's own tags.
#[must_use]
pub fn serialize_children(tree: &Tree, id: NodeId, options: &SerializeOptions) -> String {
    let mut output = String::new();
    for child in tree.children(id) {
        serialize_node(tree, child, &mut output, options, 0, false);
    }
    output
}

fn write_declaration(out: &mut String, tree: &Tree, version: &str) {
    out.push_str("<?xml version=\"");
    out.push_str(version);
    out.push('"');
    if let Some(encoding) = tree.encoding.as_deref() {
        out.push_str(" encoding=\"");
        out.push_str(encoding);
        out.push('"');
    }
    if let Some(standalone) = tree.standalone {
        out.push_str(" standalone=\"");
        out.push_str(if standalone { "yes" } else { "no" });
        out.push('"');
    }
    out.push_str("?>");
}

/// Returns `true` if the element contains only other elements (and optional
/// whitespace text), meaning it's safe to add indentation.
fn is_element_only(tree: &Tree, id: NodeId) -> bool {
    let mut has_element_child = false;
    for child in tree.children(id) {
        match &tree.node(child).kind {
            NodeKind::Element { .. } => has_element_child = true,
            NodeKind::Text { content } => {
                if !content.trim().is_empty() {
                    return false;
                }
            }
            NodeKind::CData { .. } => return false,
            _ => {}
        }
    }
    has_element_child
}

fn push_indent(out: &mut String, options: &SerializeOptions, depth: usize) {
    for _ in 0..depth {
        out.push_str(&options.indent_str);
    }
}

fn push_qname(out: &mut String, prefix: Option<&str>, name: &str) {
    if let Some(pfx) = prefix {
        out.push_str(pfx);
        out.push(':');
    }
    out.push_str(name);
}

fn serialize_node(
    tree: &Tree,
    id: NodeId,
    out: &mut String,
    options: &SerializeOptions,
    depth: usize,
    parent_is_element_only: bool,
) {
    let indented = options.indent && parent_is_element_only;
    match &tree.node(id).kind {
        NodeKind::Element {
            name,
            prefix,
            attributes,
            ..
        } => {
            if indented {
                push_indent(out, options, depth);
            }
            out.push('<');
            push_qname(out, prefix.as_deref(), name);

            for attr in attributes {
                out.push(' ');
                push_qname(out, attr.prefix.as_deref(), &attr.name);
                out.push_str("=\"");
                write_escaped_attr(out, &attr.value);
                out.push('"');
            }

            if tree.first_child(id).is_none() {
                out.push_str("/>");
            } else {
                out.push('>');
                let element_only = options.indent && is_element_only(tree, id);
                if element_only {
                    out.push('\n');
                }
                for child in tree.children(id) {
                    if element_only {
                        if let NodeKind::Text { content } = &tree.node(child).kind {
                            if content.trim().is_empty() {
                                continue;
                            }
                        }
                    }
                    serialize_node(tree, child, out, options, depth + 1, element_only);
                }
                if element_only {
                    push_indent(out, options, depth);
                }
                out.push_str("</");
                push_qname(out, prefix.as_deref(), name);
                out.push('>');
            }
            if indented {
                out.push('\n');
            }
        }
        NodeKind::Text { content } => {
            write_escaped_text(out, content);
        }
        NodeKind::CData { content } => {
            write_cdata(out, content);
        }
        NodeKind::Comment { content } => {
            if indented {
                push_indent(out, options, depth);
            }
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
            if indented {
                out.push('\n');
            }
        }
        NodeKind::ProcessingInstruction { target, data } => {
            if indented {
                push_indent(out, options, depth);
            }
            out.push_str("<?");
            out.push_str(target);
            if let Some(d) = data {
                out.push(' ');
                out.push_str(d);
            }
            out.push_str("?>");
            if indented {
                out.push('\n');
            }
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
                serialize_node(tree, child, out, options, depth, false);
            }
        }
    }
}

/// Writes `<!DOCTYPE name ...>` with the external identifier, if any.
pub(crate) fn write_doctype(
    out: &mut String,
    name: &str,
    public_id: Option<&str>,
    system_id: Option<&str>,
) {
    out.push_str("<!DOCTYPE ");
    out.push_str(name);
    match (public_id, system_id) {
        (Some(pub_id), Some(sys_id)) => {
            out.push_str(" PUBLIC \"");
            out.push_str(pub_id);
            out.push_str("\" \"");
            out.push_str(sys_id);
            out.push('"');
        }
        (Some(pub_id), None) => {
            out.push_str(" PUBLIC \"");
            out.push_str(pub_id);
            out.push('"');
        }
        (None, Some(sys_id)) => {
            out.push_str(" SYSTEM \"");
            out.push_str(sys_id);
            out.push('"');
        }
        (None, None) => {}
    }
    out.push('>');
}

/// Writes a CDATA section. An embedded `]]>` is split across two adjacent
/// sections.
fn write_cdata(out: &mut String, content: &str) {
    out.push_str("<![CDATA[");
    out.push_str(&content.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]>");
}

/// Writes a hexadecimal character reference (`&#xHH;`) for a Unicode code point.
fn write_hex_char_ref(out: &mut String, ch: char) {
    let _ = write!(out, "&#x{:X};", ch as u32);
}

/// Escapes text content for XML output.
///
/// - `<`, `>`, `&` are escaped with named entity references
/// - `\r` is encoded as `&#13;` so it survives line-end normalization
/// - `\t` and `\n` are passed through
/// - Other control characters below 0x20 are hex-encoded
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '\t' | '\n' => out.push(ch),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

/// Escapes attribute values for XML output.
///
/// - `<`, `>`, `&`, `"` are escaped with named entity references
/// - `\t` → `&#9;`, `\n` → `&#10;`, `\r` → `&#13;`
fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}
