//! The document builder.
//!
//! A [`Document`] owns a [`Tree`] together with the settings that shape its
//! output: XML version, encoding, whitespace handling on import and the
//! default formatting mode. Nodes are addressed through [`Node`] handles,
//! which carry the id of the document that created them so a handle can
//! never be used against the wrong tree.
//!
//! ```
//! use xmlscribe::{Document, RenderOptions};
//!
//! let mut doc = Document::new("1.0", "utf-8").unwrap();
//! let root = doc.add_root("root", "").unwrap();
//! doc.add_element(root, "child", "1 < 2").unwrap();
//! assert_eq!(
//!     doc.render_xml(&RenderOptions::default()),
//!     "<?xml version=\"1.0\" encoding=\"utf-8\"?><root><child>1 &lt; 2</child></root>"
//! );
//! ```

mod html;

pub use html::HtmlDocument;

use std::fmt;
use std::iter;
use std::sync::atomic::{AtomicU64, Ordering};

use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, instrument, trace};

use crate::encoding;
use crate::entities::decode_entities;
use crate::error::{BuildError, Result};
use crate::parser::{parse_str_with_options, ParseOptions};
use crate::sanitize::safe_xml;
use crate::serial::html::{
    serialize_html, serialize_html_children, serialize_html_subtree, HtmlSerializeOptions,
};
use crate::serial::xml::{serialize, serialize_children, serialize_subtree, SerializeOptions};
use crate::tree::{Attribute, NodeId, NodeKind, Tree, XML_NAMESPACE};
use crate::util::qname::{is_valid_qname, join_qname, split_qname, xmlns_attribute_name};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Options for re-parsing the builder's own indented output in the pretty
/// HTML path. Every limit is lifted.
const REPARSE_OPTIONS: ParseOptions = ParseOptions {
    no_blanks: false,
    max_depth: u32::MAX,
    max_attributes: u32::MAX,
    max_name_length: usize::MAX,
};

/// Identifies one [`Document`] for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A handle to a node of a [`Document`].
///
/// Handles are plain copyable values. Every operation checks that the
/// handle belongs to the document it is used with and that the node is
/// still attached. A handle to a removed node stays invalid even after its
/// arena slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    id: NodeId,
    generation: u32,
    document: DocumentId,
}

impl Node {
    /// The arena id of the node inside [`Document::tree`].
    #[must_use]
    pub fn id(self) -> NodeId {
        self.id
    }

    /// The document that created this handle.
    #[must_use]
    pub fn document(self) -> DocumentId {
        self.document
    }
}

/// A namespace URI with an optional preferred prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    uri: String,
    prefix: Option<String>,
}

impl Namespace {
    /// A namespace used as the default namespace (no prefix).
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            prefix: None,
        }
    }

    /// A namespace with a preferred prefix.
    #[must_use]
    pub fn with_prefix(uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// The namespace URI.
    #[must_use]
    pub fn namespace_uri(&self) -> &str {
        &self.uri
    }

    /// The preferred prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

/// Where [`Document::add_external_node`] and [`Document::replace_with`]
/// copy from.
#[derive(Debug, Clone, Copy)]
pub enum NodeSource<'a> {
    /// A node of the document being modified.
    Local(Node),
    /// A node of another document.
    Document(&'a Document, Node),
    /// A node of a bare tree, e.g. one returned by
    /// [`parse_str`](crate::parser::parse_str).
    Tree(&'a Tree, NodeId),
}

/// The markup flavor of rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// XML, with declaration when the document has a version.
    #[default]
    Xml,
    /// HTML, never with a declaration.
    Html,
}

/// Per-call rendering options.
///
/// ```
/// use xmlscribe::RenderOptions;
///
/// let opts = RenderOptions::default().pretty(true).include_declaration(false);
/// assert_eq!(opts.pretty, Some(true));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Overrides the document's `format_output` for this call. `None`
    /// uses the document setting.
    pub pretty: Option<bool>,
    /// Emit the XML declaration (XML mode only). Defaults to `true`.
    pub include_declaration: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: None,
            include_declaration: true,
        }
    }
}

impl RenderOptions {
    /// Forces pretty or compact output for this call.
    #[must_use]
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = Some(yes);
        self
    }

    /// Enables or disables the XML declaration.
    #[must_use]
    pub fn include_declaration(mut self, yes: bool) -> Self {
        self.include_declaration = yes;
        self
    }
}

/// Construction options for a [`Document`].
///
/// ```
/// use xmlscribe::{Document, DocumentOptions};
///
/// let doc = Document::with_options(
///     DocumentOptions::default()
///         .encoding("ISO-8859-1")
///         .preserve_whitespace(true),
/// )
/// .unwrap();
/// assert_eq!(doc.encoding(), "iso-8859-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// XML version for the declaration. `None` suppresses the declaration.
    /// Defaults to `"1.0"`.
    pub version: Option<String>,
    /// Encoding label. Defaults to `"utf-8"`.
    pub encoding: String,
    /// Keep whitespace-only text when importing raw markup. Defaults to
    /// `false`.
    pub preserve_whitespace: bool,
    /// Default formatting mode. `None` renders compact output.
    pub format_output: Option<bool>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            version: Some("1.0".to_string()),
            encoding: "utf-8".to_string(),
            preserve_whitespace: false,
            format_output: None,
        }
    }
}

impl DocumentOptions {
    /// Sets the XML version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Removes the XML version, so no declaration is rendered.
    #[must_use]
    pub fn no_version(mut self) -> Self {
        self.version = None;
        self
    }

    /// Sets the encoding label.
    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Keeps or drops whitespace-only text in imported markup.
    #[must_use]
    pub fn preserve_whitespace(mut self, yes: bool) -> Self {
        self.preserve_whitespace = yes;
        self
    }

    /// Sets the default formatting mode.
    #[must_use]
    pub fn format_output(mut self, yes: bool) -> Self {
        self.format_output = Some(yes);
        self
    }
}

/// Namespace bindings an element relies on: `(prefix, uri)` pairs.
type Bindings = Vec<(Option<String>, Option<String>)>;

/// A markup document under construction.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    tree: Tree,
    encoding: String,
    encoder: &'static Encoding,
    version: Option<String>,
    preserve_whitespace: bool,
    format_output: Option<bool>,
    root: Option<NodeId>,
}

impl Document {
    /// Creates an empty document with the given version and encoding.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsupportedEncoding`] if the encoding label is
    /// unknown.
    pub fn new(version: &str, encoding: &str) -> Result<Self> {
        Self::with_options(
            DocumentOptions::default()
                .version(version)
                .encoding(encoding),
        )
    }

    /// Creates an empty document from options.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsupportedEncoding`] if the encoding label is
    /// unknown.
    pub fn with_options(options: DocumentOptions) -> Result<Self> {
        let encoder = encoding::resolve(&options.encoding)
            .map_err(|_| BuildError::UnsupportedEncoding(options.encoding.clone()))?;
        let label = options.encoding.trim().to_ascii_lowercase();
        debug!(
            version = ?options.version,
            encoding = %label,
            "creating document"
        );
        Ok(Self::from_parts(options, label, encoder))
    }

    fn from_parts(options: DocumentOptions, label: String, encoder: &'static Encoding) -> Self {
        let mut tree = Tree::new();
        tree.version.clone_from(&options.version);
        if options.version.is_some() {
            tree.encoding = Some(label.clone());
        }
        Self {
            id: DocumentId::next(),
            tree,
            encoding: label,
            encoder,
            version: options.version,
            preserve_whitespace: options.preserve_whitespace,
            format_output: options.format_output,
            root: None,
        }
    }

    // --- Accessors ---

    /// The id carried by every handle of this document.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The XML version, absent for HTML documents.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The lower-cased encoding label.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Whether imported markup keeps whitespace-only text.
    #[must_use]
    pub fn preserve_whitespace(&self) -> bool {
        self.preserve_whitespace
    }

    /// Changes whitespace handling for later imports.
    pub fn set_preserve_whitespace(&mut self, yes: bool) {
        self.preserve_whitespace = yes;
    }

    /// The stored formatting mode.
    #[must_use]
    pub fn format_output(&self) -> Option<bool> {
        self.format_output
    }

    /// Changes the stored formatting mode used when a render call does not
    /// choose one.
    pub fn set_format_output(&mut self, yes: bool) {
        self.format_output = Some(yes);
    }

    /// The document element, if one has been added.
    #[must_use]
    pub fn root(&self) -> Option<Node> {
        self.root.map(|id| self.handle(id))
    }

    /// The underlying tree.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    // --- Handle checks ---

    fn handle(&self, id: NodeId) -> Node {
        Node {
            id,
            generation: self.tree.generation(id),
            document: self.id,
        }
    }

    fn check(&self, node: Node) -> Result<NodeId> {
        if node.document != self.id {
            return Err(BuildError::invalid_state(
                "node belongs to a different document",
            ));
        }
        if !self.tree.contains(node.id)
            || self.tree.generation(node.id) != node.generation
            || !self.tree.is_attached(node.id)
        {
            return Err(BuildError::invalid_state("node is not attached to the document"));
        }
        Ok(node.id)
    }

    fn check_element(&self, node: Node) -> Result<NodeId> {
        let id = self.check(node)?;
        expect_element(&self.tree, id)?;
        Ok(id)
    }

    // --- Element construction ---

    /// Adds the document element.
    ///
    /// `text`, when non-empty, has its entity references decoded and is
    /// stored as the element's text.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] if the document already has a
    /// root element or `name` is not a valid name.
    pub fn add_root(&mut self, name: &str, text: &str) -> Result<Node> {
        self.add_root_with_attributes(name, text, iter::empty::<(&str, &str)>())
    }

    /// Adds the document element with attributes applied in order.
    ///
    /// # Errors
    ///
    /// As [`add_root`](Self::add_root), plus invalid attribute names.
    pub fn add_root_with_attributes<I, K, V>(
        &mut self,
        name: &str,
        text: &str,
        attributes: I,
    ) -> Result<Node>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ensure_no_root()?;
        let element = self.new_element(self.tree.root(), name)?;
        self.apply_attributes(element, attributes)?;
        self.attach_root(element);
        self.append_decoded_text(element, text);
        Ok(self.handle(element))
    }

    /// Adds a child element to `parent`.
    ///
    /// Entity references in `text` (the XML builtins, the HTML names from
    /// the entity table and numeric references) are decoded, so the text is
    /// escaped exactly once on output.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a foreign or detached handle
    /// or an invalid name, and [`BuildError::TypeMismatch`] if `parent` is
    /// not an element.
    pub fn add_element(&mut self, parent: Node, name: &str, text: &str) -> Result<Node> {
        self.add_element_with_attributes(parent, name, text, iter::empty::<(&str, &str)>())
    }

    /// Adds a child element with attributes applied in order.
    ///
    /// # Errors
    ///
    /// As [`add_element`](Self::add_element), plus invalid attribute names.
    pub fn add_element_with_attributes<I, K, V>(
        &mut self,
        parent: Node,
        name: &str,
        text: &str,
        attributes: I,
    ) -> Result<Node>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let parent = self.check_element(parent)?;
        let element = self.new_element(parent, name)?;
        self.apply_attributes(element, attributes)?;
        self.tree.append_child(parent, element);
        self.append_decoded_text(element, text);
        trace!(name, "added element");
        Ok(self.handle(element))
    }

    /// Adds a child element in `namespace`.
    ///
    /// The prefix comes from a qualified `name` or else from the
    /// namespace's preferred prefix. A namespace declaration is added to the
    /// new element unless the binding is already in scope. Non-empty `text`
    /// is sanitized with [`safe_xml`] and then decoded.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle, an invalid
    /// name, or an empty URI with a prefix; [`BuildError::TypeMismatch`] if
    /// `parent` is not an element.
    pub fn add_namespaced_element(
        &mut self,
        parent: Node,
        name: &str,
        text: &str,
        namespace: &Namespace,
    ) -> Result<Node> {
        let parent = self.check_element(parent)?;
        let element = self.new_namespaced_element(parent, name, namespace)?;
        self.tree.append_child(parent, element);
        self.append_sanitized_text(element, text);
        trace!(name, uri = namespace.namespace_uri(), "added namespaced element");
        Ok(self.handle(element))
    }

    /// Adds the document element in `namespace`.
    ///
    /// # Errors
    ///
    /// As [`add_namespaced_element`](Self::add_namespaced_element), plus
    /// [`BuildError::InvalidState`] if a root element exists.
    pub fn add_namespaced_root(
        &mut self,
        name: &str,
        text: &str,
        namespace: &Namespace,
    ) -> Result<Node> {
        self.ensure_no_root()?;
        let element = self.new_namespaced_element(self.tree.root(), name, namespace)?;
        self.attach_root(element);
        self.append_sanitized_text(element, text);
        Ok(self.handle(element))
    }

    /// Adds an element named `name` whose only child is a CDATA section
    /// holding `value` verbatim.
    ///
    /// # Errors
    ///
    /// As [`add_element`](Self::add_element).
    pub fn add_cdata(&mut self, parent: Node, name: &str, value: &str) -> Result<Node> {
        let parent = self.check_element(parent)?;
        let element = self.new_element(parent, name)?;
        self.tree.append_child(parent, element);
        let cdata = self.tree.create_node(NodeKind::CData {
            content: value.to_string(),
        });
        self.tree.append_child(element, cdata);
        Ok(self.handle(element))
    }

    // --- Comments and processing instructions ---

    /// Appends a processing instruction to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle, an invalid or
    /// reserved target, or data containing `?>`; [`BuildError::TypeMismatch`]
    /// if `parent` is not an element.
    pub fn add_processing_instruction(
        &mut self,
        parent: Node,
        target: &str,
        data: &str,
    ) -> Result<Node> {
        let parent = self.check_element(parent)?;
        let pi = self.new_processing_instruction(target, data)?;
        self.tree.append_child(parent, pi);
        Ok(self.handle(pi))
    }

    /// Appends a comment to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle or text that
    /// cannot appear in a comment (`--`, or a trailing `-`), and
    /// [`BuildError::TypeMismatch`] if `parent` is not an element.
    pub fn add_comment(&mut self, parent: Node, data: &str) -> Result<Node> {
        let parent = self.check_element(parent)?;
        let comment = new_comment(&mut self.tree, data)?;
        self.tree.append_child(parent, comment);
        Ok(self.handle(comment))
    }

    /// Adds a comment at document level, before the root element if there
    /// is one.
    ///
    /// # Errors
    ///
    /// As [`add_comment`](Self::add_comment), minus the handle checks.
    pub fn add_document_comment(&mut self, data: &str) -> Result<Node> {
        let comment = new_comment(&mut self.tree, data)?;
        self.insert_at_document_level(comment);
        Ok(self.handle(comment))
    }

    /// Adds a processing instruction at document level, before the root
    /// element if there is one.
    ///
    /// # Errors
    ///
    /// As [`add_processing_instruction`](Self::add_processing_instruction),
    /// minus the handle checks.
    pub fn add_document_processing_instruction(
        &mut self,
        target: &str,
        data: &str,
    ) -> Result<Node> {
        let pi = self.new_processing_instruction(target, data)?;
        self.insert_at_document_level(pi);
        Ok(self.handle(pi))
    }

    // --- Importing ---

    /// Parses `markup` as a standalone XML document and appends a copy of
    /// its root element to `parent`.
    ///
    /// Whitespace-only text is dropped unless the document preserves
    /// whitespace. Namespace declarations the copy depends on are added
    /// where the destination does not already provide them.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MalformedMarkup`] if `markup` is not
    /// well-formed, plus the handle errors of
    /// [`add_element`](Self::add_element).
    ///
    /// ```
    /// use xmlscribe::{BuildError, Document};
    ///
    /// let mut doc = Document::new("1.0", "utf-8").unwrap();
    /// let root = doc.add_root("root", "").unwrap();
    /// doc.add_raw_subtree(root, "<item n=\"1\">x</item>").unwrap();
    /// assert!(matches!(
    ///     doc.add_raw_subtree(root, "<a><b></a>"),
    ///     Err(BuildError::MalformedMarkup(_))
    /// ));
    /// ```
    #[instrument(level = "debug", skip_all, fields(bytes = markup.len()))]
    pub fn add_raw_subtree(&mut self, parent: Node, markup: &str) -> Result<Node> {
        let parent = self.check_element(parent)?;
        let source = self.parse_fragment(markup)?;
        let source_root = fragment_root(&source)?;
        let (copy, bindings) = self.copy_element(NodeSource::Tree(&source, source_root))?;
        self.tree.append_child(parent, copy);
        self.reconcile_namespaces(copy, bindings);
        debug!("imported raw markup");
        Ok(self.handle(copy))
    }

    /// Like [`add_raw_subtree`](Self::add_raw_subtree) for bytes in the
    /// document encoding.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Encoding`] if the bytes cannot be decoded, plus
    /// the errors of `add_raw_subtree`.
    pub fn add_raw_subtree_bytes(&mut self, parent: Node, markup: &[u8]) -> Result<Node> {
        let text = encoding::transcode(markup, &self.encoding)?;
        self.add_raw_subtree(parent, &text)
    }

    /// Parses `markup` and installs a copy of its root element as the
    /// document element.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] if a root element exists and
    /// [`BuildError::MalformedMarkup`] if `markup` is not well-formed.
    #[instrument(level = "debug", skip_all, fields(bytes = markup.len()))]
    pub fn add_raw_root(&mut self, markup: &str) -> Result<Node> {
        self.ensure_no_root()?;
        let source = self.parse_fragment(markup)?;
        let source_root = fragment_root(&source)?;
        let (copy, bindings) = self.copy_element(NodeSource::Tree(&source, source_root))?;
        self.attach_root(copy);
        self.reconcile_namespaces(copy, bindings);
        Ok(self.handle(copy))
    }

    /// Appends a deep copy of `source` to `parent`. The source is never
    /// aliased, so later changes to either side are independent.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::TypeMismatch`] if the source is not an element
    /// and [`BuildError::InvalidState`] for bad handles on either side.
    pub fn add_external_node(&mut self, parent: Node, source: NodeSource<'_>) -> Result<Node> {
        let parent = self.check_element(parent)?;
        let (copy, bindings) = self.copy_element(source)?;
        self.tree.append_child(parent, copy);
        self.reconcile_namespaces(copy, bindings);
        trace!("imported external node");
        Ok(self.handle(copy))
    }

    // --- Structural changes ---

    /// Replaces `target` with a deep copy of `source` and returns the copy.
    /// The old subtree is freed. Replacing the document element makes the
    /// copy the new root, and so does replacing a document-level comment
    /// or PI while the document has no root element.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] if `target` is foreign or
    /// detached, or if it is a document-level node other than the root
    /// element while a root exists. Returns [`BuildError::TypeMismatch`]
    /// if `source` is not an element.
    pub fn replace_with(&mut self, target: Node, source: NodeSource<'_>) -> Result<Node> {
        let target = self.check(target)?;
        let becomes_root = self.tree.parent(target) == Some(self.tree.root());
        if becomes_root && self.root != Some(target) {
            self.ensure_no_root()?;
        }
        let (copy, bindings) = self.copy_element(source)?;
        if !self.tree.replace(target, copy) {
            return Err(BuildError::invalid_state("target has no parent"));
        }
        self.tree.remove(target);
        if becomes_root {
            self.root = Some(copy);
        }
        self.reconcile_namespaces(copy, bindings);
        debug!(root = self.root == Some(copy), "replaced node");
        Ok(self.handle(copy))
    }

    /// Detaches `node` and frees its subtree. Removing the document element
    /// leaves the document without a root.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a foreign or detached handle.
    pub fn remove(&mut self, node: Node) -> Result<()> {
        let id = self.check(node)?;
        self.tree.remove(id);
        if self.root == Some(id) {
            self.root = None;
        }
        debug!("removed node");
        Ok(())
    }

    /// Removes every descendant element of `node` whose qualified name is
    /// `name` and returns how many subtrees were removed. Matches nested
    /// inside an already removed match are not counted separately.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a foreign or detached handle.
    pub fn remove_descendants_named(&mut self, node: Node, name: &str) -> Result<usize> {
        let id = self.check(node)?;
        let matches: Vec<NodeId> = self
            .tree
            .descendants(id)
            .filter(|&d| self.tree.has_qualified_name(d, name))
            .collect();
        let mut removed = 0;
        for found in matches {
            if self.tree.is_attached(found) {
                self.tree.remove(found);
                removed += 1;
            }
        }
        debug!(name, removed, "removed descendants");
        Ok(removed)
    }

    /// Sets one attribute. An existing attribute with the same qualified
    /// name keeps its position and takes the new value.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::TypeMismatch`] if `node` is not an element and
    /// [`BuildError::InvalidState`] for a bad handle or attribute name.
    pub fn set_attribute(&mut self, node: Node, name: &str, value: &str) -> Result<()> {
        let id = self.check_element(node)?;
        check_name(name, "attribute")?;
        self.tree.set_attribute(id, name, value);
        Ok(())
    }

    /// Sets attributes in iteration order; the last write to a name wins.
    ///
    /// # Errors
    ///
    /// As [`set_attribute`](Self::set_attribute). Attributes before the
    /// first invalid name are kept.
    pub fn set_attributes<I, K, V>(&mut self, node: Node, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let id = self.check_element(node)?;
        self.apply_attributes(id, attributes)
    }

    // --- Reading ---

    /// The qualified name of an element, or the target of a processing
    /// instruction.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::TypeMismatch`] for other node kinds and
    /// [`BuildError::InvalidState`] for a bad handle.
    pub fn name(&self, node: Node) -> Result<String> {
        let id = self.check(node)?;
        match &self.tree.node(id).kind {
            NodeKind::Element { name, prefix, .. } => {
                Ok(join_qname(prefix.as_deref(), name).into_owned())
            }
            NodeKind::ProcessingInstruction { target, .. } => Ok(target.clone()),
            other => Err(BuildError::TypeMismatch {
                expected: "element",
                found: other.describe(),
            }),
        }
    }

    /// The kind and payload of a node.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn kind(&self, node: Node) -> Result<&NodeKind> {
        let id = self.check(node)?;
        Ok(&self.tree.node(id).kind)
    }

    /// An attribute value by qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn attribute(&self, node: Node, name: &str) -> Result<Option<&str>> {
        let id = self.check(node)?;
        Ok(self.tree.attribute(id, name))
    }

    /// The children of a node in document order.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn children(&self, node: Node) -> Result<Vec<Node>> {
        let id = self.check(node)?;
        Ok(self.tree.children(id).map(|c| self.handle(c)).collect())
    }

    /// The parent element. Top-level nodes have none.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn parent(&self, node: Node) -> Result<Option<Node>> {
        let id = self.check(node)?;
        Ok(self
            .tree
            .parent(id)
            .filter(|&p| p != self.tree.root())
            .map(|p| self.handle(p)))
    }

    /// The concatenated text and CDATA content of a node.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn text_content(&self, node: Node) -> Result<String> {
        let id = self.check(node)?;
        Ok(self.tree.text_content(id))
    }

    // --- Rendering ---

    /// Renders one node as XML, without a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn render_node(&self, node: Node) -> Result<String> {
        let id = self.check(node)?;
        Ok(serialize_subtree(&self.tree, id, &self.xml_options(&RenderOptions::default())))
    }

    /// Renders one node as HTML.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn render_node_html(&self, node: Node) -> Result<String> {
        let id = self.check(node)?;
        Ok(serialize_html_subtree(&self.tree, id, &self.html_options(false)))
    }

    /// Renders the children of a node as XML.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn inner_xml(&self, node: Node) -> Result<String> {
        let id = self.check(node)?;
        Ok(serialize_children(&self.tree, id, &self.xml_options(&RenderOptions::default())))
    }

    /// Renders the children of a node as HTML.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidState`] for a bad handle.
    pub fn inner_html(&self, node: Node) -> Result<String> {
        let id = self.check(node)?;
        Ok(serialize_html_children(&self.tree, id, &self.html_options(false)))
    }

    /// Renders the whole document as XML.
    ///
    /// The declaration is written when requested and the document has a
    /// version. Compact output has no newlines of its own; pretty output
    /// indents element-only content by two spaces.
    #[must_use]
    pub fn render_xml(&self, options: &RenderOptions) -> String {
        let out = serialize(&self.tree, &self.xml_options(options));
        trace!(mode = "xml", pretty = self.pretty(options), len = out.len(), "rendered");
        out
    }

    /// Renders the whole document as HTML. No declaration is ever written.
    ///
    /// Pretty output is produced by serializing the tree as indented XML,
    /// re-parsing that with whitespace preserved and writing the result
    /// with block-level formatting newlines.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MalformedMarkup`] if the indented XML cannot be
    /// re-parsed, which happens when an element uses an undeclared prefix.
    /// A document without a root element skips the re-parse.
    pub fn render_html(&self, options: &RenderOptions) -> Result<String> {
        let pretty = self.pretty(options);
        let out = if pretty && self.root.is_some() {
            let xml_options = SerializeOptions::default().indent(true).declaration(false);
            let indented = serialize(&self.tree, &xml_options);
            let reparsed = parse_str_with_options(&indented, &REPARSE_OPTIONS)?;
            serialize_html(&reparsed, &self.html_options(true))
        } else {
            self.html_compact()
        };
        trace!(mode = "html", pretty, len = out.len(), "rendered");
        Ok(out)
    }

    /// Compact HTML rendering. Never fails.
    pub(crate) fn html_compact(&self) -> String {
        serialize_html(&self.tree, &self.html_options(false))
    }

    /// Renders the document and encodes it in the document encoding.
    /// Characters the encoding cannot represent become numeric character
    /// references.
    ///
    /// # Errors
    ///
    /// As [`render_html`](Self::render_html) in HTML mode. XML mode does
    /// not fail.
    pub fn render_encoded(&self, mode: OutputMode, options: &RenderOptions) -> Result<Vec<u8>> {
        let text = match mode {
            OutputMode::Xml => self.render_xml(options),
            OutputMode::Html => self.render_html(options)?,
        };
        Ok(encoding::encode(&text, self.encoder))
    }

    fn pretty(&self, options: &RenderOptions) -> bool {
        options.pretty.or(self.format_output).unwrap_or(false)
    }

    fn xml_options(&self, options: &RenderOptions) -> SerializeOptions {
        SerializeOptions::default()
            .indent(self.pretty(options))
            .declaration(options.include_declaration)
    }

    fn html_options(&self, format: bool) -> HtmlSerializeOptions {
        HtmlSerializeOptions::default()
            .format(format)
            .named_entities(self.encoder.output_encoding() != UTF_8)
    }

    // --- Internals ---

    fn ensure_no_root(&self) -> Result<()> {
        if self.root.is_some() {
            return Err(BuildError::invalid_state(
                "document already has a root element",
            ));
        }
        Ok(())
    }

    fn attach_root(&mut self, element: NodeId) {
        let doc = self.tree.root();
        self.tree.append_child(doc, element);
        self.root = Some(element);
        debug!("root element set");
    }

    fn insert_at_document_level(&mut self, id: NodeId) {
        match self.root {
            Some(root) => {
                self.tree.insert_before(root, id);
            }
            None => {
                let doc = self.tree.root();
                self.tree.append_child(doc, id);
            }
        }
    }

    /// Creates a detached element. A prefix in `name` is resolved against
    /// the scope of `scope`.
    fn new_element(&mut self, scope: NodeId, name: &str) -> Result<NodeId> {
        check_name(name, "element")?;
        let (prefix, local) = split_qname(name);
        let namespace = self
            .tree
            .lookup_namespace_uri(scope, prefix)
            .map(str::to_string);
        Ok(self.tree.create_node(NodeKind::Element {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            namespace,
            attributes: Vec::new(),
        }))
    }

    fn new_namespaced_element(
        &mut self,
        scope: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<NodeId> {
        check_name(name, "element")?;
        let (qname_prefix, local) = split_qname(name);
        let prefix = qname_prefix.or(namespace.prefix());
        let uri = namespace.namespace_uri();
        if let Some(p) = prefix {
            if uri.is_empty() {
                return Err(BuildError::invalid_state(format!(
                    "namespace prefix '{p}' cannot be bound to an empty URI"
                )));
            }
            let misbound_xml = p == "xml" && uri != XML_NAMESPACE;
            if misbound_xml || p == "xmlns" || !is_valid_qname(p) || p.contains(':') {
                return Err(BuildError::invalid_state(format!(
                    "invalid namespace prefix '{p}'"
                )));
            }
        }

        let bound = (!uri.is_empty()).then_some(uri);
        let mut attributes = Vec::new();
        if self.tree.lookup_namespace_uri(scope, prefix) != bound {
            attributes.push(Attribute::new(&xmlns_attribute_name(prefix), uri));
        }
        Ok(self.tree.create_node(NodeKind::Element {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            namespace: (!uri.is_empty()).then(|| uri.to_string()),
            attributes,
        }))
    }

    fn new_processing_instruction(&mut self, target: &str, data: &str) -> Result<NodeId> {
        if !is_valid_qname(target) || target.contains(':') || target.eq_ignore_ascii_case("xml") {
            return Err(BuildError::invalid_state(format!(
                "invalid processing instruction target '{target}'"
            )));
        }
        if data.contains("?>") {
            return Err(BuildError::invalid_state(
                "processing instruction data must not contain '?>'",
            ));
        }
        Ok(self.tree.create_node(NodeKind::ProcessingInstruction {
            target: target.to_string(),
            data: (!data.is_empty()).then(|| data.to_string()),
        }))
    }

    fn apply_attributes<I, K, V>(&mut self, element: NodeId, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in attributes {
            check_name(name.as_ref(), "attribute")?;
            self.tree.set_attribute(element, name.as_ref(), value.as_ref());
        }
        Ok(())
    }

    fn append_decoded_text(&mut self, element: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        let content = decode_entities(text).into_owned();
        let node = self.tree.create_node(NodeKind::text(content));
        self.tree.append_child(element, node);
    }

    fn append_sanitized_text(&mut self, element: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        self.append_decoded_text(element, &safe_xml(text));
    }

    fn parse_fragment(&self, markup: &str) -> Result<Tree> {
        let options = ParseOptions::default().no_blanks(!self.preserve_whitespace);
        Ok(parse_str_with_options(markup, &options)?)
    }

    /// Deep-copies an element from `source` into this tree, detached, and
    /// returns it with the namespace bindings its subtree relies on.
    fn copy_element(&mut self, source: NodeSource<'_>) -> Result<(NodeId, Vec<Bindings>)> {
        match source {
            NodeSource::Local(node) => {
                let id = self.check(node)?;
                expect_element(&self.tree, id)?;
                let bindings = namespace_bindings(&self.tree, id);
                Ok((self.tree.duplicate_subtree(id), bindings))
            }
            NodeSource::Document(other, node) => {
                let id = other.check(node)?;
                expect_element(&other.tree, id)?;
                let bindings = namespace_bindings(&other.tree, id);
                Ok((self.tree.import_subtree(&other.tree, id), bindings))
            }
            NodeSource::Tree(tree, id) => {
                if !tree.contains(id) {
                    return Err(BuildError::invalid_state("node id is not part of the tree"));
                }
                expect_element(tree, id)?;
                let bindings = namespace_bindings(tree, id);
                Ok((self.tree.import_subtree(tree, id), bindings))
            }
        }
    }

    /// Declares, on each element of an attached copy, the bindings it
    /// relied on in its source that the destination scope does not give.
    fn reconcile_namespaces(&mut self, copy: NodeId, bindings: Vec<Bindings>) {
        let nodes: Vec<NodeId> = iter::once(copy)
            .chain(self.tree.descendants(copy))
            .collect();
        for (node, needed) in nodes.into_iter().zip(bindings) {
            for (prefix, uri) in needed {
                if self.tree.lookup_namespace_uri(node, prefix.as_deref()) == uri.as_deref() {
                    continue;
                }
                if prefix.is_some() && uri.is_none() {
                    continue;
                }
                let attr = xmlns_attribute_name(prefix.as_deref());
                self.tree
                    .set_attribute(node, &attr, uri.as_deref().unwrap_or(""));
            }
        }
    }
}

impl Default for Document {
    /// An XML 1.0, UTF-8 document.
    fn default() -> Self {
        Self::from_parts(DocumentOptions::default(), "utf-8".to_string(), UTF_8)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_xml(&RenderOptions::default()))
    }
}

fn check_name(name: &str, what: &str) -> Result<()> {
    if is_valid_qname(name) {
        Ok(())
    } else {
        Err(BuildError::invalid_state(format!("invalid {what} name '{name}'")))
    }
}

fn expect_element(tree: &Tree, id: NodeId) -> Result<()> {
    let kind = &tree.node(id).kind;
    if matches!(kind, NodeKind::Element { .. }) {
        Ok(())
    } else {
        Err(BuildError::TypeMismatch {
            expected: "element",
            found: kind.describe(),
        })
    }
}

fn fragment_root(tree: &Tree) -> Result<NodeId> {
    tree.root_element()
        .ok_or_else(|| BuildError::invalid_state("markup has no root element"))
}

fn new_comment(tree: &mut Tree, data: &str) -> Result<NodeId> {
    if data.contains("--") || data.ends_with('-') {
        return Err(BuildError::invalid_state(
            "comment text must not contain '--' or end with '-'",
        ));
    }
    Ok(tree.create_node(NodeKind::Comment {
        content: data.to_string(),
    }))
}

/// Collects, for the element at `id` and every descendant in document
/// order, the namespace bindings its own name and prefixed attributes use.
fn namespace_bindings(tree: &Tree, id: NodeId) -> Vec<Bindings> {
    iter::once(id)
        .chain(tree.descendants(id))
        .map(|node| {
            let NodeKind::Element {
                prefix,
                namespace,
                attributes,
                ..
            } = &tree.node(node).kind
            else {
                return Vec::new();
            };
            let mut needed = vec![(prefix.clone(), namespace.clone())];
            for attr in attributes {
                if let Some(p) = attr.prefix.as_deref() {
                    if p != "xml" && p != "xmlns" {
                        let uri = tree.lookup_namespace_uri(node, Some(p)).map(str::to_string);
                        needed.push((Some(p.to_string()), uri));
                    }
                }
            }
            needed
        })
        .collect()
}
