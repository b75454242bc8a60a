//! Recursive descent parser state machine.
//!
//! Builds a [`Tree`] from a standalone document: optional XML declaration,
//! prolog comments and PIs, an optional DOCTYPE, exactly one root element,
//! then trailing comments and PIs. Whitespace outside the root element is
//! not stored.

use memchr::memchr2;

use crate::error::ParseError;
use crate::tree::{Attribute, NodeId, NodeKind, Tree};
use crate::util::qname::split_qname;

use super::input::{is_xml_char, Cursor, Scopes};
use super::ParseOptions;

/// The fragment parser.
pub(crate) struct XmlParser<'a> {
    /// Position state and lexical primitives.
    input: Cursor<'a>,
    /// The tree being built.
    tree: Tree,
    /// Parser options.
    options: ParseOptions,
    /// Namespace scope stack.
    ns: Scopes,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        Self {
            input: Cursor::new(input, options.max_depth, options.max_name_length),
            tree: Tree::new(),
            options: options.clone(),
            ns: Scopes::new(),
        }
    }

    /// Parses the entire input.
    pub fn parse(mut self) -> Result<Tree, ParseError> {
        if self.looking_at_xml_decl() {
            self.parse_xml_declaration()?;
        } else if self.input.skip_space() && self.looking_at_xml_decl() {
            return Err(self
                .input
                .error("XML declaration must be at the start of the document"));
        }

        let root = self.tree.root();
        self.parse_misc(root)?;

        if self.input.at("<!DOCTYPE") {
            self.parse_doctype(root)?;
            self.parse_misc(root)?;
        }

        if !self.input.at_start_tag() {
            return Err(self.input.error("missing root element"));
        }
        self.parse_element(root)?;

        self.parse_misc(root)?;
        if !self.input.at_end() {
            return Err(self.input.error("content after document element"));
        }

        Ok(self.tree)
    }

    fn looking_at_xml_decl(&self) -> bool {
        let rest = self.input.rest().as_bytes();
        rest.starts_with(b"<?xml") && rest.get(5).is_some_and(|b| b.is_ascii_whitespace())
    }

    // --- XML Declaration ---
    // See XML 1.0 §2.8: [23] XMLDecl

    fn parse_xml_declaration(&mut self) -> Result<(), ParseError> {
        let decl = self.input.xml_decl()?;
        self.tree.version = Some(decl.version);
        self.tree.encoding = decl.encoding;
        self.tree.standalone = decl.standalone;
        Ok(())
    }

    // --- Misc (comments, PIs, whitespace) ---

    fn parse_misc(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            self.input.skip_space();
            if self.input.at("<!--") {
                self.parse_comment(parent)?;
            } else if self.input.at("<?") {
                self.parse_processing_instruction(parent)?;
            } else {
                return Ok(());
            }
        }
    }

    // --- DOCTYPE Declaration ---
    // See XML 1.0 §2.8: [28] doctypedecl

    fn parse_doctype(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect("<!DOCTYPE")?;
        self.input.require_space()?;
        let name = self.input.name()?;
        self.input.skip_space();

        let public_id = if self.input.at("PUBLIC") {
            self.input.bump(6);
            self.input.require_space()?;
            let id = self.input.literal()?;
            self.input.require_space()?;
            Some(id)
        } else {
            None
        };
        let system_id = if public_id.is_some() {
            Some(self.input.literal()?)
        } else if self.input.at("SYSTEM") {
            self.input.bump(6);
            self.input.require_space()?;
            Some(self.input.literal()?)
        } else {
            None
        };
        self.input.skip_space();

        if self.input.peek() == Some(b'[') {
            self.skip_internal_subset()?;
            self.input.skip_space();
        }
        self.input.expect(">")?;

        let doctype = self.tree.create_node(NodeKind::DocumentType {
            name,
            public_id,
            system_id,
        });
        self.tree.append_child(parent, doctype);
        Ok(())
    }

    /// Skips `[ ... ]`, stepping over quoted strings and comments so that
    /// brackets inside them do not end the subset early.
    fn skip_internal_subset(&mut self) -> Result<(), ParseError> {
        self.input.expect("[")?;
        let mut open: u32 = 1;
        while open > 0 {
            if self.input.at("<!--") {
                self.input.comment()?;
                continue;
            }
            match self.input.peek() {
                None => {
                    return Err(self
                        .input
                        .error("unexpected end of input in internal subset"))
                }
                Some(b'"' | b'\'') => {
                    self.input.literal()?;
                }
                Some(b) => {
                    if b == b'[' {
                        open += 1;
                    } else if b == b']' {
                        open -= 1;
                    }
                    self.input.take_char()?;
                }
            }
        }
        Ok(())
    }

    // --- Elements ---
    // See XML 1.0 §3.1: [40] STag, [42] ETag, [44] EmptyElemTag

    fn parse_element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.input.enter()?;
        self.input.expect("<")?;
        let name = self.input.name()?;
        let mut attributes: Vec<Attribute> = Vec::new();

        loop {
            let had_ws = self.input.skip_space();
            if self.input.peek() == Some(b'>') || self.input.at("/>") {
                break;
            }
            if !had_ws {
                return Err(self.input.error("whitespace required between attributes"));
            }
            let attr = self.parse_attribute()?;
            // XML 1.0 §3.1 WFC: Unique Att Spec
            if attributes
                .iter()
                .any(|a| a.name == attr.name && a.prefix == attr.prefix)
            {
                let full_name = match &attr.prefix {
                    Some(pfx) => format!("{pfx}:{}", attr.name),
                    None => attr.name.clone(),
                };
                return Err(self
                    .input
                    .error(format!("duplicate attribute: '{full_name}'")));
            }
            attributes.push(attr);
            if attributes.len() > self.options.max_attributes as usize {
                return Err(self.input.error(format!(
                    "too many attributes (maximum {})",
                    self.options.max_attributes
                )));
            }
        }

        // --- Namespace processing ---
        self.ns.open();
        for attr in &attributes {
            if let Some(declared) = attr.declared_prefix() {
                if declared == Some("xmlns") {
                    return Err(self
                        .input
                        .error("the 'xmlns' prefix must not be declared"));
                }
                if declared.is_some() && attr.value.is_empty() {
                    return Err(self.input.error(format!(
                        "namespace prefix '{}' cannot be undeclared",
                        attr.name
                    )));
                }
                self.ns
                    .bind(declared.map(str::to_string), attr.value.clone());
            }
        }

        let (prefix, local_name) = split_qname(&name);
        if prefix == Some("xmlns") {
            return Err(self
                .input
                .error("elements must not have the prefix 'xmlns'"));
        }
        if prefix.is_some_and(str::is_empty) || local_name.is_empty() || local_name.contains(':')
        {
            return Err(self.input.error(format!("invalid qualified name '{name}'")));
        }
        let namespace = self.ns.resolve(prefix).map(str::to_string);
        if let Some(pfx) = prefix {
            if namespace.is_none() {
                return Err(self
                    .input
                    .error(format!("unbound namespace prefix '{pfx}'")));
            }
        }
        for attr in &attributes {
            if let Some(pfx) = attr.prefix.as_deref() {
                if pfx != "xmlns" && !self.ns.is_bound(pfx) {
                    return Err(self
                        .input
                        .error(format!("unbound namespace prefix '{pfx}' on attribute")));
                }
            }
        }

        let element = self.tree.create_node(NodeKind::Element {
            name: local_name.to_string(),
            prefix: prefix.map(str::to_string),
            namespace,
            attributes,
        });
        self.tree.append_child(parent, element);

        if self.input.at("/>") {
            self.input.bump(2);
        } else {
            self.input.expect(">")?;
            self.parse_content(element)?;

            self.input.expect("</")?;
            let end_name = self.input.name()?;
            if end_name != name {
                return Err(self.input.error(format!(
                    "mismatched end tag: expected </{name}>, found </{end_name}>"
                )));
            }
            self.input.skip_space();
            self.input.expect(">")?;
        }

        self.ns.close();
        self.input.leave();
        Ok(element)
    }

    // --- Content ---
    // See XML 1.0 §3.1: [43] content

    fn parse_content(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            if self.input.at_end() {
                return Err(self
                    .input
                    .error("unexpected end of input in element content"));
            }
            if self.input.at("</") {
                return Ok(());
            }

            if self.input.at("<![CDATA[") {
                self.parse_cdata(parent)?;
            } else if self.input.at("<!--") {
                self.parse_comment(parent)?;
            } else if self.input.at("<?") {
                self.parse_processing_instruction(parent)?;
            } else if self.input.peek() == Some(b'<') {
                self.parse_element(parent)?;
            } else {
                self.parse_char_data(parent)?;
            }
        }
    }

    // --- Character Data ---
    // See XML 1.0 §2.4: [14] CharData

    fn parse_char_data(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut text = String::new();

        loop {
            let rest = self.input.rest();
            let run = memchr2(b'<', b'&', rest.as_bytes()).unwrap_or(rest.len());
            if run == 0 {
                if self.input.peek() != Some(b'&') {
                    break;
                }
                text.push(self.input.reference()?);
                continue;
            }
            let chunk = &rest[..run];
            if let Some(offset) = chunk.find("]]>") {
                self.input.bump(offset);
                return Err(self.input.error("']]>' not allowed in character data"));
            }
            if chunk.chars().all(|c| c != '\r' && is_xml_char(c)) {
                text.push_str(chunk);
                self.input.bump(run);
            } else {
                // Character by character, to fold line ends and locate
                // the first illegal character.
                let stop = self.input.location().byte_offset + run;
                while self.input.location().byte_offset < stop {
                    text.push(self.input.take_char()?);
                }
            }
        }

        if text.is_empty() || (self.options.no_blanks && text.chars().all(char::is_whitespace)) {
            return Ok(());
        }
        let text_id = self.tree.create_node(NodeKind::Text { content: text });
        self.tree.append_child(parent, text_id);
        Ok(())
    }

    // --- Attributes ---
    // See XML 1.0 §3.1: [41] Attribute

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let name = self.input.name()?;
        self.input.skip_space();
        self.input.expect("=")?;
        self.input.skip_space();
        let value = self.input.attribute_value()?;
        Ok(Attribute::new(&name, value))
    }

    // --- Comments, CDATA, PIs ---

    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = self.input.comment()?;
        let comment = self.tree.create_node(NodeKind::Comment { content });
        self.tree.append_child(parent, comment);
        Ok(())
    }

    fn parse_cdata(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = self.input.cdata()?;
        let cdata = self.tree.create_node(NodeKind::CData { content });
        self.tree.append_child(parent, cdata);
        Ok(())
    }

    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let (target, data) = self.input.processing_instruction()?;
        let pi = self
            .tree
            .create_node(NodeKind::ProcessingInstruction { target, data });
        self.tree.append_child(parent, pi);
        Ok(())
    }
}
