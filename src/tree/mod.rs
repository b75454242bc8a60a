//! Arena-based markup tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the [`Tree`] and
//! are referenced by [`NodeId`], a newtype over `NonZeroU32`. Navigation
//! links (parent, first\_child, last\_child, next\_sibling, prev\_sibling)
//! are arena indices, so there are no reference cycles and no per-node
//! allocation. [`Tree::remove`] returns a subtree's slots to a free list
//! for reuse and bumps each slot's generation, so callers holding a
//! `(NodeId, generation)` pair can tell a reused slot from the original.
//!
//! The tree is the storage layer underneath [`Document`](crate::Document):
//! the builder validates handles and arguments, then calls into the plain
//! mutation primitives defined here.

mod node;

pub use node::NodeKind;

use std::num::NonZeroU32;

use crate::util::qname::split_qname;

/// The namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A typed index into a tree's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` thanks to the niche in
/// `NonZeroU32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index. Index 0 is the unused
    /// placeholder slot, so real indices start at 1.
    #[allow(clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add((index as u32).saturating_sub(1)))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node, if any. The document node has no parent.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
    /// Bumped each time the slot is freed.
    generation: u32,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            generation: 0,
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The local part of the name, e.g., `"lang"` for `xml:lang`.
    pub name: String,
    /// Namespace prefix, if any.
    pub prefix: Option<String>,
    /// The attribute value, stored decoded.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute from a possibly-prefixed name.
    #[must_use]
    pub fn new(qname: &str, value: impl Into<String>) -> Self {
        let (prefix, name) = split_qname(qname);
        Self {
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
            value: value.into(),
        }
    }

    /// Returns `true` if this attribute's qualified name equals `qname`.
    #[must_use]
    pub fn matches(&self, qname: &str) -> bool {
        let (prefix, name) = split_qname(qname);
        self.prefix.as_deref() == prefix && self.name == name
    }

    /// Returns the prefix bound by this attribute if it is a namespace
    /// declaration: `Some(None)` for `xmlns`, `Some(Some(p))` for `xmlns:p`.
    #[must_use]
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        match self.prefix.as_deref() {
            Some("xmlns") => Some(Some(self.name.as_str())),
            None if self.name == "xmlns" => Some(None),
            _ => None,
        }
    }
}

/// Snapshot of a subtree: the root's kind followed by every descendant in
/// document order, each paired with the index of its parent in the list
/// (0 is the root).
type Snapshot = (NodeKind, Vec<(NodeKind, usize)>);

/// A markup tree.
///
/// The tree owns every node in an arena and provides navigation through
/// `&Tree` and mutation through `&mut Tree`.
///
/// # Examples
///
/// ```
/// use xmlscribe::tree::{NodeKind, Tree};
///
/// let mut tree = Tree::new();
/// let feed = tree.create_node(NodeKind::element("feed"));
/// tree.append_child(tree.root(), feed);
/// assert_eq!(tree.root_element(), Some(feed));
/// ```
#[derive(Debug, Clone)]
pub struct Tree {
    /// The node arena. Index 0 is an unused placeholder.
    nodes: Vec<NodeData>,
    /// Freed slots, reused by `create_node`.
    free: Vec<NodeId>,
    /// The document node id (not the root element).
    root: NodeId,
    /// Version from the XML declaration of parsed input.
    pub version: Option<String>,
    /// Encoding from the XML declaration of parsed input.
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration of parsed input.
    pub standalone: Option<bool>,
}

impl Tree {
    /// Creates a tree holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(NodeData::new(NodeKind::Document));
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            free: Vec::new(),
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the first element child of the document node.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| self.is_element(id))
    }

    /// Returns `true` if `id` indexes a slot of this arena.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.as_index() < self.nodes.len()
    }

    /// Returns how many times the slot behind `id` has been freed.
    #[must_use]
    pub fn generation(&self, id: NodeId) -> u32 {
        self.node(id).generation
    }

    /// Returns the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { .. })
    }

    /// Returns `true` if the node is reachable from the document node.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors(id).last() == Some(self.root)
    }

    /// Returns the local name of an element or the target of a PI.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. }
            | NodeKind::DocumentType { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns `prefix:name` for a prefixed element, or the plain name.
    #[must_use]
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        match &self.node(id).kind {
            NodeKind::Element {
                name,
                prefix: Some(prefix),
                ..
            } => Some(format!("{prefix}:{name}")),
            _ => self.node_name(id).map(str::to_string),
        }
    }

    /// Returns `true` if the element's qualified name equals `qname`.
    #[must_use]
    pub fn has_qualified_name(&self, id: NodeId, qname: &str) -> bool {
        match &self.node(id).kind {
            NodeKind::Element { name, prefix, .. } => {
                let (want_prefix, want_name) = split_qname(qname);
                prefix.as_deref() == want_prefix && name == want_name
            }
            _ => false,
        }
    }

    /// Returns the namespace URI of an element node, if any.
    #[must_use]
    pub fn node_namespace(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { namespace, .. } => namespace.as_deref(),
            _ => None,
        }
    }

    /// Returns the content of a text, comment or CDATA node, or the data of
    /// a processing instruction.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::Comment { content }
            | NodeKind::CData { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// Returns the concatenated text and CDATA content of a node and all
    /// its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => {
                buf.push_str(content);
            }
            NodeKind::Comment { .. }
            | NodeKind::ProcessingInstruction { .. }
            | NodeKind::DocumentType { .. } => {}
            NodeKind::Document | NodeKind::Element { .. } => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    /// Returns the attributes of an element node, or an empty slice.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by qualified name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, qname: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.matches(qname))
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute on an element. An existing attribute with the same
    /// qualified name keeps its position and takes the new value; otherwise
    /// the attribute is appended.
    ///
    /// Returns `false` (and does nothing) if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, qname: &str, value: &str) -> bool {
        let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind else {
            return false;
        };
        match attributes.iter_mut().find(|a| a.matches(qname)) {
            Some(existing) => existing.value = value.to_string(),
            None => attributes.push(Attribute::new(qname, value)),
        }
        true
    }

    /// Resolves a namespace prefix (or the default namespace for `None`) by
    /// walking the `xmlns` declarations on `id` and its ancestors.
    #[must_use]
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        for ancestor in self.ancestors(id) {
            let declared = self
                .attributes(ancestor)
                .iter()
                .find(|a| a.declared_prefix() == Some(prefix));
            if let Some(attr) = declared {
                return (!attr.value.is_empty()).then_some(attr.value.as_str());
            }
        }
        None
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first,
    /// document order). The node itself is not included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.first_child(id),
        }
    }

    // --- Mutation ---

    /// Allocates a new, detached node in the arena, reusing a freed slot
    /// when there is one.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.node_mut(id).kind = kind;
            return id;
        }
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Appends a child node to the end of a parent's child list.
    ///
    /// `child` must be detached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }

    /// Inserts `new_child` before `reference` in the parent's child list.
    ///
    /// Returns `false` (and does nothing) if `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) -> bool {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );

        let Some(parent) = self.node(reference).parent else {
            return false;
        };
        self.node_mut(new_child).parent = Some(parent);

        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }

        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
        true
    }

    /// Puts `replacement` in the place of `old`, which is detached.
    ///
    /// Returns `false` (and does nothing) if `old` has no parent.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> bool {
        if !self.insert_before(old, replacement) {
            return false;
        }
        self.detach(old);
        true
    }

    /// Detaches a node from its parent. The node stays allocated in the
    /// arena but is no longer reachable from the document node.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let data = self.node_mut(id);
        data.parent = None;
        data.prev_sibling = None;
        data.next_sibling = None;
    }

    /// Detaches `id` and frees the slots of its whole subtree. Freed slots
    /// are reused by later allocations under a new generation. The
    /// document node cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let doomed: Vec<NodeId> = std::iter::once(id).chain(self.descendants(id)).collect();
        for slot in doomed {
            let generation = self.node(slot).generation.wrapping_add(1);
            let data = self.node_mut(slot);
            *data = NodeData::new(NodeKind::Document);
            data.generation = generation;
            self.free.push(slot);
        }
    }

    /// Deep-copies the subtree at `id` of `source` into this tree. The copy
    /// is detached; the caller decides where it goes.
    pub fn import_subtree(&mut self, source: &Tree, id: NodeId) -> NodeId {
        let snapshot = source.snapshot(id);
        self.build(snapshot)
    }

    /// Deep-copies a subtree of this tree. The copy is detached.
    pub fn duplicate_subtree(&mut self, id: NodeId) -> NodeId {
        let snapshot = self.snapshot(id);
        self.build(snapshot)
    }

    fn snapshot(&self, id: NodeId) -> Snapshot {
        let root_kind = self.node(id).kind.clone();
        let mut entries = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = self.children(id).map(|child| (child, 0)).collect();
        stack.reverse();
        while let Some((node, parent)) = stack.pop() {
            entries.push((self.node(node).kind.clone(), parent));
            let index = entries.len();
            let children: Vec<NodeId> = self.children(node).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, index)));
        }
        (root_kind, entries)
    }

    fn build(&mut self, (root_kind, entries): Snapshot) -> NodeId {
        let root = self.create_node(root_kind);
        let mut ids = Vec::with_capacity(entries.len() + 1);
        ids.push(root);
        for (kind, parent) in entries {
            let id = self.create_node(kind);
            self.append_child(ids[parent], id);
            ids.push(id);
        }
        root
    }

    /// Returns the number of allocated nodes, including detached ones that
    /// were never removed.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    tree: &'a Tree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.tree.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        if let Some(sibling) = self.tree.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        let mut ancestor = self.tree.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.tree.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.tree.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(tree: &mut Tree, content: &str) -> NodeId {
        tree.create_node(NodeKind::text(content))
    }

    /// Builds `<a><b>one</b><c><d>two</d></c></a>` under the document node.
    fn sample() -> (Tree, [NodeId; 4]) {
        let mut tree = Tree::new();
        let a = tree.create_node(NodeKind::element("a"));
        let b = tree.create_node(NodeKind::element("b"));
        let c = tree.create_node(NodeKind::element("c"));
        let d = tree.create_node(NodeKind::element("d"));
        let one = text(&mut tree, "one");
        let two = text(&mut tree, "two");
        tree.append_child(tree.root(), a);
        tree.append_child(a, b);
        tree.append_child(b, one);
        tree.append_child(a, c);
        tree.append_child(c, d);
        tree.append_child(d, two);
        (tree, [a, b, c, d])
    }

    #[test]
    fn test_new_tree_has_root() {
        let tree = Tree::new();
        assert!(matches!(tree.node(tree.root()).kind, NodeKind::Document));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root_element(), None);
    }

    #[test]
    fn test_node_ids_are_sequential() {
        let mut tree = Tree::new();
        let a = tree.create_node(NodeKind::element("a"));
        let b = tree.create_node(NodeKind::element("b"));
        assert_eq!(a.as_index(), 2);
        assert_eq!(b.as_index(), 3);
        assert!(tree.contains(b));
    }

    #[test]
    fn test_create_and_append_element() {
        let mut tree = Tree::new();
        let root = tree.root();
        let elem = tree.create_node(NodeKind::element("div"));
        tree.append_child(root, elem);

        assert_eq!(tree.first_child(root), Some(elem));
        assert_eq!(tree.last_child(root), Some(elem));
        assert_eq!(tree.parent(elem), Some(root));
        assert_eq!(tree.node_name(elem), Some("div"));
        assert_eq!(tree.root_element(), Some(elem));
    }

    #[test]
    fn test_append_multiple_children() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = text(&mut tree, "A");
        let b = text(&mut tree, "B");
        let c = text(&mut tree, "C");
        tree.append_child(root, a);
        tree.append_child(root, b);
        tree.append_child(root, c);

        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.prev_sibling(c), Some(b));
        assert_eq!(tree.prev_sibling(a), None);
        assert_eq!(tree.next_sibling(c), None);
    }

    #[test]
    fn test_insert_before() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = text(&mut tree, "A");
        let c = text(&mut tree, "C");
        tree.append_child(root, a);
        tree.append_child(root, c);

        let b = text(&mut tree, "B");
        assert!(tree.insert_before(c, b));
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b, c]);

        let first = text(&mut tree, "0");
        assert!(tree.insert_before(a, first));
        assert_eq!(tree.first_child(root), Some(first));
    }

    #[test]
    fn test_insert_before_detached_reference() {
        let mut tree = Tree::new();
        let loose = text(&mut tree, "loose");
        let other = text(&mut tree, "other");
        assert!(!tree.insert_before(loose, other));
        assert_eq!(tree.parent(other), None);
    }

    #[test]
    fn test_detach() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = text(&mut tree, "A");
        let b = text(&mut tree, "B");
        let c = text(&mut tree, "C");
        tree.append_child(root, a);
        tree.append_child(root, b);
        tree.append_child(root, c);

        tree.detach(b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.prev_sibling(c), Some(a));

        tree.detach(a);
        tree.detach(c);
        assert_eq!(tree.first_child(root), None);
        assert_eq!(tree.last_child(root), None);
    }

    #[test]
    fn test_detach_without_parent_is_noop() {
        let mut tree = Tree::new();
        let loose = text(&mut tree, "x");
        tree.detach(loose);
        assert_eq!(tree.parent(loose), None);
    }

    #[test]
    fn test_replace() {
        let (mut tree, [a, b, c, _]) = sample();
        let e = tree.create_node(NodeKind::element("e"));
        assert!(tree.replace(b, e));
        assert_eq!(tree.children(a).collect::<Vec<_>>(), vec![e, c]);
        assert!(!tree.is_attached(b));
        assert!(tree.is_attached(e));
    }

    #[test]
    fn test_ancestors_iterator() {
        let (tree, [a, _, c, d]) = sample();
        let chain: Vec<NodeId> = tree.ancestors(d).collect();
        assert_eq!(chain, vec![d, c, a, tree.root()]);
    }

    #[test]
    fn test_descendants_iterator() {
        let (tree, [a, b, c, d]) = sample();
        let names: Vec<_> = tree
            .descendants(a)
            .filter_map(|id| tree.node_name(id))
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);
        assert_eq!(tree.descendants(a).count(), 5);
        assert_eq!(tree.descendants(c).next(), Some(d));
        assert!(tree.descendants(b).all(|id| tree.parent(id) == Some(b)));
    }

    #[test]
    fn test_text_content() {
        let (mut tree, [a, _, c, _]) = sample();
        let comment = tree.create_node(NodeKind::Comment {
            content: "skip".to_string(),
        });
        tree.append_child(c, comment);
        assert_eq!(tree.text_content(a), "onetwo");
    }

    #[test]
    fn test_set_attribute_last_write_wins() {
        let (mut tree, [a, ..]) = sample();
        assert!(tree.set_attribute(a, "id", "1"));
        assert!(tree.set_attribute(a, "xml:lang", "en"));
        assert!(tree.set_attribute(a, "id", "2"));

        let attrs = tree.attributes(a);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "2");
        assert_eq!(attrs[1].prefix.as_deref(), Some("xml"));
        assert_eq!(tree.attribute(a, "xml:lang"), Some("en"));
        assert_eq!(tree.attribute(a, "lang"), None);
    }

    #[test]
    fn test_set_attribute_on_text_fails() {
        let mut tree = Tree::new();
        let t = text(&mut tree, "x");
        assert!(!tree.set_attribute(t, "id", "1"));
    }

    #[test]
    fn test_lookup_namespace_uri() {
        let (mut tree, [a, _, c, d]) = sample();
        tree.set_attribute(a, "xmlns", "urn:default");
        tree.set_attribute(a, "xmlns:m", "urn:media");
        tree.set_attribute(c, "xmlns", "");

        assert_eq!(tree.lookup_namespace_uri(a, None), Some("urn:default"));
        assert_eq!(tree.lookup_namespace_uri(d, Some("m")), Some("urn:media"));
        assert_eq!(tree.lookup_namespace_uri(d, None), None);
        assert_eq!(tree.lookup_namespace_uri(d, Some("x")), None);
        assert_eq!(tree.lookup_namespace_uri(d, Some("xml")), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_qualified_name() {
        let mut tree = Tree::new();
        let link = tree.create_node(NodeKind::Element {
            name: "link".to_string(),
            prefix: Some("atom".to_string()),
            namespace: Some("http://www.w3.org/2005/Atom".to_string()),
            attributes: Vec::new(),
        });
        assert_eq!(tree.qualified_name(link).unwrap(), "atom:link");
        assert!(tree.has_qualified_name(link, "atom:link"));
        assert!(!tree.has_qualified_name(link, "link"));
        assert_eq!(tree.node_namespace(link), Some("http://www.w3.org/2005/Atom"));
    }

    #[test]
    fn test_import_subtree_deep_copies() {
        let (source, [_, _, c, _]) = sample();
        let mut target = Tree::new();
        let copy = target.import_subtree(&source, c);
        target.append_child(target.root(), copy);

        assert_eq!(target.node_name(copy), Some("c"));
        assert_eq!(target.text_content(copy), "two");
        assert_eq!(target.descendants(copy).count(), 2);
        assert_eq!(source.text_content(c), "two");
    }

    #[test]
    fn test_duplicate_subtree_preserves_order() {
        let (mut tree, [a, ..]) = sample();
        let copy = tree.duplicate_subtree(a);
        assert_eq!(tree.parent(copy), None);
        let names: Vec<_> = tree
            .descendants(copy)
            .filter_map(|id| tree.node_name(id))
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);
        assert_eq!(tree.text_content(copy), "onetwo");
    }

    #[test]
    fn test_node_count_includes_detached() {
        let (mut tree, [_, b, ..]) = sample();
        assert_eq!(tree.node_count(), 7);
        tree.detach(b);
        assert_eq!(tree.node_count(), 7);
    }

    #[test]
    fn test_remove_frees_subtree() {
        let (mut tree, [a, b, c, d]) = sample();
        tree.remove(c);
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.children(a).collect::<Vec<_>>(), vec![b]);
        assert!(!tree.is_attached(c));
        assert!(!tree.is_attached(d));
        assert_eq!(tree.generation(c), 1);
        assert_eq!(tree.generation(b), 0);
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let (mut tree, [a, _, c, _]) = sample();
        let arena = tree.nodes.len();
        tree.remove(c);
        for _ in 0..3 {
            let fresh = tree.create_node(NodeKind::element("e"));
            tree.append_child(a, fresh);
        }
        assert_eq!(tree.nodes.len(), arena);
        assert_eq!(tree.node_count(), 7);

        let reused = tree.last_child(a).unwrap();
        assert_eq!(tree.generation(reused), 1);
        assert_eq!(tree.node_name(reused), Some("e"));
        assert_eq!(tree.first_child(reused), None);
    }

    #[test]
    fn test_remove_document_node_is_noop() {
        let (mut tree, _) = sample();
        tree.remove(tree.root());
        assert_eq!(tree.node_count(), 7);
        assert!(tree.root_element().is_some());
    }
}
