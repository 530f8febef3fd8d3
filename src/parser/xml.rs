//! Core XML 1.0 parser state machine.
//!
//! Implements a hand-rolled recursive descent parser for XML 1.0 (Fifth
//! Edition) with Namespaces in XML 1.0. See <https://www.w3.org/TR/xml/>.
//!
//! References to general entities declared in the internal DTD subset are
//! kept in the tree as [`NodeKind::EntityRef`] nodes carrying their
//! expanded replacement text; [`Document::normalize_document`] folds them
//! back into text.

use crate::error::ParseError;
use crate::tree::{Attribute, Document, NodeId, NodeKind};

use super::input::{
    parse_cdata_content, parse_comment_content, parse_pi_content, parse_xml_decl, split_name,
    EntityDecl, NamespaceResolver, ParserInput, Reference, XMLNS_NAMESPACE, XML_NAMESPACE,
};
use super::ParseOptions;

/// The core XML parser.
pub(crate) struct XmlParser<'a> {
    input: ParserInput<'a>,
    doc: Document,
    ns: NamespaceResolver,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        Self {
            input: ParserInput::new(input, options),
            doc: Document::new(),
            ns: NamespaceResolver::new(),
        }
    }

    /// Main parse entry point. Parses the entire document.
    pub fn parse(mut self) -> Result<Document, ParseError> {
        // The XML declaration must be at the very start (XML 1.0 §2.8).
        if self.looking_at_xml_decl() {
            let decl = parse_xml_decl(&mut self.input)?;
            self.doc.version = Some(decl.version);
            self.doc.encoding = decl.encoding;
            self.doc.standalone = decl.standalone;
        } else if self.input.skip_whitespace() && self.looking_at_xml_decl() {
            return Err(self
                .input
                .fatal("XML declaration must be at the start of the document"));
        }

        let root = self.doc.root();
        self.parse_misc(root)?;

        if self.input.looking_at(b"<!DOCTYPE") {
            self.parse_doctype(root)?;
            self.parse_misc(root)?;
        }

        // Exactly one root element (XML 1.0 §2.1).
        if self.input.peek() == Some(b'<')
            && self
                .input
                .peek_at(1)
                .is_some_and(|b| b != b'!' && b != b'?')
        {
            self.parse_element(root)?;
        } else {
            return Err(self.input.fatal("missing root element"));
        }

        self.parse_misc(root)?;
        if !self.input.at_end() {
            return Err(self.input.fatal("content after document element"));
        }

        Ok(self.doc)
    }

    fn looking_at_xml_decl(&self) -> bool {
        self.input.looking_at(b"<?xml ")
            || self.input.looking_at(b"<?xml\t")
            || self.input.looking_at(b"<?xml\r")
            || self.input.looking_at(b"<?xml\n")
    }

    // --- Misc (comments, PIs, whitespace) ---

    /// Prolog and epilog whitespace is insignificant and not kept.
    fn parse_misc(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            self.input.skip_whitespace();
            if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                if self.looking_at_xml_decl() {
                    return Err(self
                        .input
                        .fatal("XML declaration must be at the start of the document"));
                }
                self.parse_processing_instruction(parent)?;
            } else {
                return Ok(());
            }
        }
    }

    // --- DOCTYPE Declaration ---
    // See XML 1.0 §2.8: [28] doctypedecl

    fn parse_doctype(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str(b"<!DOCTYPE")?;
        self.input.skip_whitespace_required()?;
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();

        let mut system_id = None;
        let mut public_id = None;
        if self.input.looking_at(b"SYSTEM") {
            self.input.expect_str(b"SYSTEM")?;
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace();
        } else if self.input.looking_at(b"PUBLIC") {
            self.input.expect_str(b"PUBLIC")?;
            self.input.skip_whitespace_required()?;
            public_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace();
        }

        let mut internal_subset = None;
        if self.input.peek() == Some(b'[') {
            self.input.advance(1);
            let start = self.input.pos();
            self.skip_internal_subset()?;
            let subset = self.input.slice_str(start, self.input.pos())?;
            self.input.advance(1); // ']'

            for (entity, decl) in collect_entity_decls(subset).map_err(|msg| {
                self.input
                    .fatal(format!("error in DTD internal subset: {msg}"))
            })? {
                // The first declaration of an entity is binding (XML 1.0 §4.2).
                self.input.entities.entry(entity).or_insert(decl);
            }
            internal_subset = Some(subset.to_string());
            self.input.skip_whitespace();
        }

        self.input.expect_byte(b'>')?;

        let doctype_id = self.doc.create_node(NodeKind::DocumentType {
            name,
            system_id,
            public_id,
            internal_subset,
        });
        self.doc.append_child(parent, doctype_id);
        Ok(())
    }

    /// Advances to the `]` closing the internal subset, skipping over
    /// comments and quoted literals.
    fn skip_internal_subset(&mut self) -> Result<(), ParseError> {
        loop {
            match self.input.peek() {
                None => {
                    return Err(self
                        .input
                        .fatal("unexpected end of input in internal subset"))
                }
                Some(b']') => return Ok(()),
                Some(quote @ (b'"' | b'\'')) => {
                    self.input.advance(1);
                    while !self.input.at_end() && self.input.peek() != Some(quote) {
                        self.input.advance(1);
                    }
                    self.input.advance(1);
                }
                Some(b'<') if self.input.looking_at(b"<!--") => {
                    parse_comment_content(&mut self.input)?;
                }
                Some(_) => self.input.advance(1),
            }
        }
    }

    // --- Elements ---
    // See XML 1.0 §3.1: [40] STag, [42] ETag, [44] EmptyElemTag

    fn parse_element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.input.increment_depth()?;
        self.input.expect_byte(b'<')?;
        let qname = self.input.parse_name()?;

        let mut attributes = Vec::new();
        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if !had_ws {
                return Err(self.input.fatal("whitespace required between attributes"));
            }
            let attr = self.parse_attribute()?;
            if attributes
                .iter()
                .any(|a: &Attribute| a.name == attr.name && a.prefix == attr.prefix)
            {
                return Err(self.input.fatal(format!(
                    "duplicate attribute: '{}'",
                    qualified(attr.prefix.as_deref(), &attr.name)
                )));
            }
            attributes.push(attr);
        }

        // --- Namespace processing (Namespaces in XML 1.0 §3) ---
        self.ns.push_scope();
        for attr in &attributes {
            self.bind_namespace(attr)?;
        }

        let (prefix, local_name) = split_name(&qname);
        if prefix == Some("xmlns") {
            return Err(self
                .input
                .fatal("elements must not have the prefix 'xmlns'"));
        }
        if prefix.is_some() && local_name.contains(':') {
            return Err(self.input.fatal("QName contains multiple colons"));
        }
        let namespace = self.ns.resolve(prefix).map(String::from);
        if let Some(pfx) = prefix {
            if namespace.is_none() {
                return Err(self
                    .input
                    .fatal(format!("unbound namespace prefix '{pfx}'")));
            }
        }

        // Unprefixed attributes do not take the default namespace.
        for attr in &mut attributes {
            if let Some(pfx) = attr.prefix.as_deref().filter(|&p| p != "xmlns") {
                let resolved = self.ns.resolve(Some(pfx)).map(String::from);
                if resolved.is_none() {
                    return Err(self
                        .input
                        .fatal(format!("unbound namespace prefix '{pfx}' on attribute")));
                }
                attr.namespace = resolved;
            }
        }
        for (i, attr) in attributes.iter().enumerate() {
            if attr.namespace.is_some()
                && attributes[..i]
                    .iter()
                    .any(|a| a.namespace == attr.namespace && a.name == attr.name)
            {
                return Err(self.input.fatal(format!(
                    "namespace-aware duplicate attribute: '{{{}}}{}'",
                    attr.namespace.as_deref().unwrap_or_default(),
                    attr.name
                )));
            }
        }

        let elem_id = self.doc.create_node(NodeKind::Element {
            name: local_name.to_string(),
            prefix: prefix.map(String::from),
            namespace,
            attributes,
        });
        self.doc.append_child(parent, elem_id);

        if self.input.looking_at(b"/>") {
            self.input.advance(2);
        } else {
            self.input.expect_byte(b'>')?;
            self.parse_content(elem_id)?;

            self.input.expect_str(b"</")?;
            let end_name = self.input.parse_name()?;
            if end_name != qname {
                return Err(self.input.fatal(format!(
                    "mismatched end tag: expected </{qname}>, found </{end_name}>"
                )));
            }
            self.input.skip_whitespace();
            self.input.expect_byte(b'>')?;
        }

        self.ns.pop_scope();
        self.input.decrement_depth();
        Ok(elem_id)
    }

    /// Validates a namespace declaration attribute and binds it in the
    /// current scope. Other attributes are ignored.
    fn bind_namespace(&mut self, attr: &Attribute) -> Result<(), ParseError> {
        if attr.prefix.as_deref() == Some("xmlns") {
            let declared = attr.name.as_str();
            let uri = attr.value.as_str();
            if declared.is_empty() || declared.contains(':') {
                return Err(self
                    .input
                    .fatal(format!("invalid namespace prefix 'xmlns:{declared}'")));
            }
            if uri.is_empty() {
                return Err(self.input.fatal(format!(
                    "namespace prefix '{declared}' cannot be undeclared in XML 1.0"
                )));
            }
            if declared == "xmlns" {
                return Err(self
                    .input
                    .fatal("the 'xmlns' prefix must not be declared"));
            }
            if (declared == "xml") != (uri == XML_NAMESPACE) {
                return Err(self
                    .input
                    .fatal("only the 'xml' prefix may be bound to the XML namespace"));
            }
            if uri == XMLNS_NAMESPACE {
                return Err(self
                    .input
                    .fatal("the xmlns namespace must not be bound to any prefix"));
            }
            self.ns.bind(Some(declared.to_string()), uri.to_string());
        } else if attr.prefix.is_none() && attr.name == "xmlns" {
            if attr.value == XML_NAMESPACE || attr.value == XMLNS_NAMESPACE {
                return Err(self.input.fatal(format!(
                    "'{}' must not be declared as the default namespace",
                    attr.value
                )));
            }
            self.ns.bind(None, attr.value.clone());
        } else if attr.prefix.is_some() && attr.name.contains(':') {
            return Err(self.input.fatal("QName contains multiple colons"));
        }
        Ok(())
    }

    // --- Content ---
    // See XML 1.0 §3.1: [43] content

    fn parse_content(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            if self.input.at_end() {
                return Err(self
                    .input
                    .fatal("unexpected end of input in element content"));
            }
            if self.input.looking_at(b"</") {
                return Ok(());
            }
            if self.input.looking_at(b"<![CDATA[") {
                self.parse_cdata(parent)?;
            } else if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
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

        while let Some(b) = self.input.peek() {
            match b {
                b'<' => break,
                b']' if self.input.looking_at(b"]]>") => {
                    return Err(self.input.fatal("']]>' not allowed in character data"));
                }
                b'&' => match self.input.parse_reference()? {
                    Reference::Char(ch) => text.push(ch),
                    Reference::Entity { name, value } => {
                        if value.contains('<') {
                            return Err(self.input.fatal(format!(
                                "entity '{name}' expands to markup, which is not supported"
                            )));
                        }
                        self.flush_text(parent, &mut text);
                        let ref_id = self.doc.create_node(NodeKind::EntityRef {
                            name,
                            value: Some(value),
                        });
                        self.doc.append_child(parent, ref_id);
                    }
                },
                _ => text.push(self.input.next_char()?),
            }
        }

        self.flush_text(parent, &mut text);
        Ok(())
    }

    fn flush_text(&mut self, parent: NodeId, text: &mut String) {
        if !text.is_empty() {
            let content = std::mem::take(text);
            let text_id = self.doc.create_node(NodeKind::Text { content });
            self.doc.append_child(parent, text_id);
        }
    }

    // --- Attributes ---
    // See XML 1.0 §3.1: [41] Attribute

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();
        self.input.expect_byte(b'=')?;
        self.input.skip_whitespace();
        let value = self.input.parse_attribute_value()?;

        let (prefix, local_name) = split_name(&name);
        Ok(Attribute {
            name: local_name.to_string(),
            value,
            prefix: prefix.map(String::from),
            namespace: None,
        })
    }

    // --- Comments, CDATA sections, processing instructions ---

    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = parse_comment_content(&mut self.input)?;
        let comment_id = self.doc.create_node(NodeKind::Comment { content });
        self.doc.append_child(parent, comment_id);
        Ok(())
    }

    fn parse_cdata(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = parse_cdata_content(&mut self.input)?;
        let cdata_id = self.doc.create_node(NodeKind::CData { content });
        self.doc.append_child(parent, cdata_id);
        Ok(())
    }

    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let (target, data) = parse_pi_content(&mut self.input)?;
        let pi_id = self
            .doc
            .create_node(NodeKind::ProcessingInstruction { target, data });
        self.doc.append_child(parent, pi_id);
        Ok(())
    }
}

fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(pfx) => format!("{pfx}:{name}"),
        None => name.to_string(),
    }
}

/// Extracts the general entity declarations from an internal subset.
///
/// Parameter entities and all other markup declarations are skipped.
fn collect_entity_decls(subset: &str) -> Result<Vec<(String, EntityDecl)>, String> {
    let mut decls = Vec::new();
    let mut rest = subset;

    while let Some(lt) = rest.find('<') {
        rest = &rest[lt..];
        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after.find("-->").ok_or("unterminated comment")?;
            rest = &after[end + 3..];
        } else if let Some(after) = rest.strip_prefix("<!ENTITY") {
            let (decl, tail) = parse_entity_decl(after)?;
            decls.extend(decl);
            rest = tail;
        } else {
            rest = skip_declaration(&rest[1..])?;
        }
    }
    Ok(decls)
}

/// Parses the body of an `<!ENTITY` declaration up to and including its `>`.
fn parse_entity_decl(body: &str) -> Result<(Option<(String, EntityDecl)>, &str), String> {
    let trimmed = body.trim_start();
    if trimmed.len() == body.len() {
        return Err("whitespace required after '<!ENTITY'".to_string());
    }
    if trimmed.starts_with('%') {
        return Ok((None, skip_declaration(trimmed)?));
    }

    let name_end = trimmed
        .find(|c: char| c.is_ascii_whitespace())
        .ok_or("malformed entity declaration")?;
    let name = &trimmed[..name_end];
    let definition = trimmed[name_end..].trim_start();

    let decl = match definition.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let literal = &definition[1..];
            let end = literal
                .find(quote)
                .ok_or_else(|| format!("unterminated value for entity '{name}'"))?;
            EntityDecl::Internal(literal[..end].to_string())
        }
        _ if definition.starts_with("SYSTEM") || definition.starts_with("PUBLIC") => {
            EntityDecl::External
        }
        _ => return Err(format!("malformed declaration of entity '{name}'")),
    };
    Ok((Some((name.to_string(), decl)), skip_declaration(definition)?))
}

/// Skips to just past the `>` closing the current declaration, ignoring any
/// `>` inside quoted literals.
fn skip_declaration(text: &str) -> Result<&str, String> {
    let mut quote = None;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if q == c => quote = None,
            (None, '>') => return Ok(&text[i + 1..]),
            _ => {}
        }
    }
    Err("unterminated markup declaration".to_string())
}
