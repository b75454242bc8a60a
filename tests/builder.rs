//! End-to-end tests for building and rendering XML documents.
//!
//! These drive the public [`Document`] API the way a feed generator would:
//! build a tree, import foreign markup, edit it, and check the exact bytes
//! that come out.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use xmlscribe::parser::parse_str;
use xmlscribe::tree::NodeKind;
use xmlscribe::{
    BuildError, Document, DocumentOptions, Namespace, NodeSource, OutputMode, RenderOptions,
};

fn compact(doc: &Document) -> String {
    doc.render_xml(&RenderOptions::default())
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn test_root_with_escaped_child() {
    let mut doc = Document::new("1.0", "utf-8").unwrap();
    let root = doc.add_root("root", "").unwrap();
    doc.add_element(root, "child", "1 < 2").unwrap();
    assert_eq!(
        compact(&doc),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><root><child>1 &lt; 2</child></root>"
    );
}

#[test]
fn test_empty_document_renders_declaration_only() {
    let doc = Document::default();
    assert_eq!(compact(&doc), "<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    assert!(doc.root().is_none());
}

#[test]
fn test_document_without_version_has_no_declaration() {
    let options = DocumentOptions::default().no_version();
    let mut doc = Document::with_options(options).unwrap();
    doc.add_root("r", "").unwrap();
    assert_eq!(compact(&doc), "<r/>");
    assert_eq!(doc.version(), None);
}

#[test]
fn test_children_keep_insertion_order() {
    let mut doc = Document::default();
    let root = doc.add_root("list", "").unwrap();
    let a = doc.add_element(root, "a", "").unwrap();
    let b = doc.add_element(root, "b", "").unwrap();
    let c = doc.add_element(root, "c", "").unwrap();
    assert_eq!(doc.children(root).unwrap(), vec![a, b, c]);
    let names: Vec<String> = doc
        .children(root)
        .unwrap()
        .into_iter()
        .map(|n| doc.name(n).unwrap())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn test_attributes_in_order_and_escaped() {
    let mut doc = Document::default();
    let root = doc
        .add_root_with_attributes("link", "", [("href", "/a?x=1&y=2"), ("title", "say \"hi\"")])
        .unwrap();
    doc.set_attribute(root, "rel", "alternate").unwrap();
    doc.set_attribute(root, "href", "/b").unwrap();
    assert_eq!(
        doc.render_node(root).unwrap(),
        "<link href=\"/b\" title=\"say &quot;hi&quot;\" rel=\"alternate\"/>"
    );
    assert_eq!(doc.attribute(root, "rel").unwrap(), Some("alternate"));
    assert_eq!(doc.attribute(root, "missing").unwrap(), None);
}

#[test]
fn test_set_attributes_last_write_wins() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    doc.set_attributes(root, [("a", "1"), ("b", "2"), ("a", "3")])
        .unwrap();
    assert_eq!(doc.render_node(root).unwrap(), "<r a=\"3\" b=\"2\"/>");
}

#[test]
fn test_text_with_bare_ampersand_and_html_entity() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    let p = doc.add_element(root, "p", "Fish & Chips &nbsp;&copy;").unwrap();
    assert_eq!(doc.text_content(p).unwrap(), "Fish & Chips \u{a0}\u{a9}");
    assert_eq!(
        doc.render_node(p).unwrap(),
        "<p>Fish &amp; Chips \u{a0}\u{a9}</p>"
    );
}

#[test]
fn test_cdata_is_verbatim() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    doc.add_cdata(root, "body", "<p>a & b</p>").unwrap();
    assert_eq!(
        doc.inner_xml(root).unwrap(),
        "<body><![CDATA[<p>a & b</p>]]></body>"
    );
}

#[test]
fn test_document_level_comment_precedes_root() {
    let mut doc = Document::default();
    doc.add_root("r", "").unwrap();
    doc.add_document_comment(" generated ").unwrap();
    doc.add_document_processing_instruction("xml-stylesheet", "href=\"s.xsl\"")
        .unwrap();
    assert_eq!(
        compact(&doc),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <!-- generated --><?xml-stylesheet href=\"s.xsl\"?><r/>"
    );
}

#[test]
fn test_comment_rejects_double_hyphen() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    assert!(matches!(
        doc.add_comment(root, "a -- b"),
        Err(BuildError::InvalidState(_))
    ));
    assert!(matches!(
        doc.add_comment(root, "trailing-"),
        Err(BuildError::InvalidState(_))
    ));
    doc.add_comment(root, "fine").unwrap();
    assert_eq!(doc.inner_xml(root).unwrap(), "<!--fine-->");
}

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

#[test]
fn test_atom_feed_namespaces() {
    let atom = Namespace::new("http://www.w3.org/2005/Atom");
    let media = Namespace::with_prefix("http://search.yahoo.com/mrss/", "media");

    let mut doc = Document::default();
    let feed = doc.add_namespaced_root("feed", "", &atom).unwrap();
    let entry = doc.add_namespaced_element(feed, "entry", "", &atom).unwrap();
    doc.add_namespaced_element(entry, "thumbnail", "", &media)
        .unwrap();
    doc.add_namespaced_element(entry, "media:title", "x", &media)
        .unwrap();

    assert_eq!(
        doc.render_node(feed).unwrap(),
        "<feed xmlns=\"http://www.w3.org/2005/Atom\"><entry>\
         <media:thumbnail xmlns:media=\"http://search.yahoo.com/mrss/\"/>\
         <media:title xmlns:media=\"http://search.yahoo.com/mrss/\">x</media:title>\
         </entry></feed>"
    );
}

#[test]
fn test_prefix_declared_on_root_is_reused() {
    let g = Namespace::with_prefix("http://base.google.com/ns/1.0", "g");
    let mut doc = Document::default();
    let root = doc
        .add_root_with_attributes("rss", "", [("xmlns:g", "http://base.google.com/ns/1.0")])
        .unwrap();
    doc.add_namespaced_element(root, "g:id", "42", &g).unwrap();
    assert_eq!(
        doc.render_node(root).unwrap(),
        "<rss xmlns:g=\"http://base.google.com/ns/1.0\"><g:id>42</g:id></rss>"
    );
}

#[test]
fn test_invalid_namespace_prefix() {
    let mut doc = Document::default();
    let bad = Namespace::with_prefix("urn:x", "xmlns");
    assert!(matches!(
        doc.add_namespaced_root("r", "", &bad),
        Err(BuildError::InvalidState(_))
    ));
    let empty = Namespace::with_prefix("", "p");
    assert!(matches!(
        doc.add_namespaced_root("r", "", &empty),
        Err(BuildError::InvalidState(_))
    ));
}

// ---------------------------------------------------------------------------
// Importing
// ---------------------------------------------------------------------------

#[test]
fn test_raw_subtree_malformed_is_rejected() {
    let mut doc = Document::default();
    let root = doc.add_root("root", "").unwrap();
    let err = doc.add_raw_subtree(root, "<a><b></a>").unwrap_err();
    assert!(matches!(err, BuildError::MalformedMarkup(_)));
    assert!(err.to_string().contains("mismatched end tag"));
    assert!(doc.children(root).unwrap().is_empty());
}

#[test]
fn test_raw_subtree_rejects_html_entities() {
    let mut doc = Document::default();
    let root = doc.add_root("root", "").unwrap();
    assert!(matches!(
        doc.add_raw_subtree(root, "<p>&nbsp;</p>"),
        Err(BuildError::MalformedMarkup(_))
    ));
}

#[test]
fn test_raw_subtree_then_edit() {
    let mut doc = Document::default();
    let root = doc.add_root("channel", "").unwrap();
    let item = doc
        .add_raw_subtree(
            root,
            "<item>\n  <title>A &amp; B</title>\n  <script/>\n  <p><script/></p>\n</item>",
        )
        .unwrap();
    assert_eq!(doc.remove_descendants_named(item, "script").unwrap(), 2);
    doc.add_element(item, "guid", "1").unwrap();
    assert_eq!(
        doc.render_node(root).unwrap(),
        "<channel><item><title>A &amp; B</title><p/><guid>1</guid></item></channel>"
    );
}

#[test]
fn test_raw_root_and_bytes() {
    let mut doc = Document::new("1.0", "iso-8859-1").unwrap();
    let root = doc.add_raw_root("<r/>").unwrap();
    doc.add_raw_subtree_bytes(root, b"<n>caf\xE9</n>").unwrap();
    assert_eq!(doc.render_node(root).unwrap(), "<r><n>caf\u{e9}</n></r>");
    assert!(doc.add_raw_root("<again/>").is_err());
}

#[test]
fn test_external_node_is_independent_copy() {
    let mut source = Document::default();
    let src_root = source.add_root("src", "").unwrap();
    let entry = source.add_element(src_root, "entry", "text").unwrap();

    let mut dest = Document::default();
    let dest_root = dest.add_root("dest", "").unwrap();
    let copy = dest
        .add_external_node(dest_root, NodeSource::Document(&source, entry))
        .unwrap();

    source.set_attribute(entry, "changed", "yes").unwrap();
    dest.add_element(copy, "extra", "").unwrap();

    assert_eq!(source.render_node(entry).unwrap(), "<entry changed=\"yes\">text</entry>");
    assert_eq!(dest.render_node(copy).unwrap(), "<entry>text<extra/></entry>");
}

#[test]
fn test_external_node_from_parsed_tree_carries_namespaces() {
    let tree =
        parse_str("<feed xmlns=\"urn:atom\" xmlns:g=\"urn:g\"><entry g:id=\"1\"><title/></entry></feed>")
            .unwrap();
    let feed = tree.root_element().unwrap();
    let entry = tree.first_child(feed).unwrap();

    let mut doc = Document::default();
    let root = doc.add_root("wrapper", "").unwrap();
    let copy = doc
        .add_external_node(root, NodeSource::Tree(&tree, entry))
        .unwrap();
    assert_eq!(
        doc.render_node(copy).unwrap(),
        "<entry g:id=\"1\" xmlns=\"urn:atom\" xmlns:g=\"urn:g\"><title/></entry>"
    );
}

#[test]
fn test_handles_from_another_document_are_rejected() {
    let mut a = Document::default();
    let mut b = Document::default();
    let a_root = a.add_root("a", "").unwrap();
    b.add_root("b", "").unwrap();
    assert!(matches!(
        b.add_element(a_root, "x", ""),
        Err(BuildError::InvalidState(_))
    ));
    assert!(matches!(b.render_node(a_root), Err(BuildError::InvalidState(_))));
}

// ---------------------------------------------------------------------------
// Structural edits
// ---------------------------------------------------------------------------

#[test]
fn test_replace_and_remove() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    let old = doc.add_element(root, "old", "").unwrap();
    let keep = doc.add_element(root, "keep", "").unwrap();

    let tree = parse_str("<new a=\"1\"/>").unwrap();
    let new_root = tree.root_element().unwrap();
    let new = doc
        .replace_with(old, NodeSource::Tree(&tree, new_root))
        .unwrap();
    assert_eq!(doc.children(root).unwrap(), vec![new, keep]);

    doc.remove(keep).unwrap();
    assert_eq!(doc.inner_xml(root).unwrap(), "<new a=\"1\"/>");
    assert!(matches!(doc.remove(keep), Err(BuildError::InvalidState(_))));
    assert!(matches!(doc.name(old), Err(BuildError::InvalidState(_))));
}

#[test]
fn test_replace_with_non_element_is_type_mismatch() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    let child = doc.add_element(root, "c", "text").unwrap();
    let text = doc.children(child).unwrap()[0];
    assert!(matches!(doc.kind(text).unwrap(), NodeKind::Text { .. }));
    assert!(matches!(
        doc.replace_with(child, NodeSource::Local(text)),
        Err(BuildError::TypeMismatch { .. })
    ));
}

#[test]
fn test_remove_root_allows_new_root() {
    let mut doc = Document::default();
    let first = doc.add_root("first", "").unwrap();
    doc.remove(first).unwrap();
    assert!(doc.root().is_none());
    doc.add_root("second", "").unwrap();
    assert_eq!(
        compact(&doc),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><second/>"
    );
}

#[test]
fn test_replacing_document_comment_cannot_add_second_root() {
    let mut doc = Document::default();
    let root = doc.add_root("root", "").unwrap();
    let note = doc.add_document_comment("note").unwrap();
    assert!(matches!(
        doc.replace_with(note, NodeSource::Local(root)),
        Err(BuildError::InvalidState(_))
    ));
    assert_eq!(doc.root(), Some(root));
    assert_eq!(
        compact(&doc),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><!--note--><root/>"
    );
}

#[test]
fn test_replacing_document_comment_without_root_sets_root() {
    let mut doc = Document::default();
    let note = doc.add_document_comment("note").unwrap();
    let tree = parse_str("<feed/>").unwrap();
    let feed = doc
        .replace_with(note, NodeSource::Tree(&tree, tree.root_element().unwrap()))
        .unwrap();
    assert_eq!(doc.root(), Some(feed));
    assert!(matches!(doc.add_root("other", ""), Err(BuildError::InvalidState(_))));
    assert_eq!(
        compact(&doc),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><feed/>"
    );
}

#[test]
fn test_removed_nodes_are_recycled() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    let baseline = doc.tree().node_count();
    for _ in 0..1000 {
        let child = doc.add_element(root, "c", "text").unwrap();
        doc.remove(child).unwrap();
    }
    assert_eq!(doc.tree().node_count(), baseline);

    let tree = parse_str("<new><deep>x</deep></new>").unwrap();
    for _ in 0..100 {
        let child = doc.add_element(root, "old", "").unwrap();
        doc.replace_with(child, NodeSource::Tree(&tree, tree.root_element().unwrap()))
            .unwrap();
        doc.remove_descendants_named(root, "new").unwrap();
    }
    assert_eq!(doc.tree().node_count(), baseline);
}

#[test]
fn test_stale_handle_rejected_after_slot_reuse() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    let gone = doc.add_element(root, "gone", "").unwrap();
    doc.remove(gone).unwrap();
    let fresh = doc.add_element(root, "fresh", "").unwrap();
    assert_eq!(fresh.id(), gone.id());
    assert_ne!(fresh, gone);
    assert!(matches!(doc.name(gone), Err(BuildError::InvalidState(_))));
    assert!(matches!(doc.remove(gone), Err(BuildError::InvalidState(_))));
    assert_eq!(doc.name(fresh).unwrap(), "fresh");
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn test_pretty_feed() {
    let mut doc = Document::default();
    let rss = doc.add_root_with_attributes("rss", "", [("version", "2.0")]).unwrap();
    let channel = doc.add_element(rss, "channel", "").unwrap();
    doc.add_element(channel, "title", "News").unwrap();
    let item = doc.add_element(channel, "item", "").unwrap();
    doc.add_element(item, "title", "First").unwrap();

    let out = doc.render_xml(&RenderOptions::default().pretty(true));
    assert_eq!(
        out,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <rss version=\"2.0\">\n\
         \x20 <channel>\n\
         \x20   <title>News</title>\n\
         \x20   <item>\n\
         \x20     <title>First</title>\n\
         \x20   </item>\n\
         \x20 </channel>\n\
         </rss>\n"
    );
}

#[test]
fn test_render_encoded_utf8_matches_render_xml() {
    let mut doc = Document::default();
    let root = doc.add_root("r", "").unwrap();
    doc.add_element(root, "s", "\u{2603}").unwrap();
    let bytes = doc
        .render_encoded(OutputMode::Xml, &RenderOptions::default())
        .unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), compact(&doc));
}

#[test]
fn test_display_matches_default_render() {
    let mut doc = Document::default();
    doc.add_root("r", "x").unwrap();
    assert_eq!(doc.to_string(), compact(&doc));
}
