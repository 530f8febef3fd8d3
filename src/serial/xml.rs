//! XML serializer.
//!
//! Serializes a `Document` tree, or a single sub-tree of it, into a
//! well-formed XML string. Characters the document's declared encoding
//! cannot carry are written as hexadecimal character references; a
//! document without a declared encoding keeps its output pure ASCII.

use std::fmt::Write;

use crate::encoding::is_representable;
use crate::tree::{Document, NodeId, NodeKind};

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use domcompare::Document;
/// use domcompare::serial::{serialize_with_options, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("  <child>"));
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indented (pretty-printed) output.
    ///
    /// When enabled, the children of an element that holds only elements
    /// (and blank text) are placed on their own lines. Mixed-content
    /// elements are written as they are.
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
}

/// Serializes a document to an XML string.
///
/// The XML declaration is always written, defaulting the version to `1.0`.
///
/// # Examples
///
/// ```
/// use domcompare::Document;
/// use domcompare::serial::serialize;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// assert_eq!(serialize(&doc), "<?xml version=\"1.0\"?>\n<root><child>Hello</child></root>\n");
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

/// Serializes a document to an XML string with the given options.
///
/// Every top-level node is followed by a newline, so a document without
/// children serializes to its declaration line alone.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut output = String::new();

    let version = doc.version.as_deref().unwrap_or("1.0");
    let _ = write!(output, "<?xml version=\"{version}\"");
    if let Some(encoding) = &doc.encoding {
        let _ = write!(output, " encoding=\"{encoding}\"");
    }
    if let Some(standalone) = doc.standalone {
        let _ = write!(
            output,
            " standalone=\"{}\"",
            if standalone { "yes" } else { "no" }
        );
    }
    output.push_str("?>\n");

    let mut serializer = Serializer::new(doc, options, output);
    for child in doc.children(doc.root()) {
        if matches!(doc.node(child).kind, NodeKind::Text { .. }) {
            continue;
        }
        serializer.node(child, 0, false);
        serializer.out.push('\n');
    }
    serializer.out
}

/// Serializes one node and its descendants, without an XML declaration.
///
/// Passing the document node serializes its children back to back.
///
/// # Examples
///
/// ```
/// use domcompare::Document;
/// use domcompare::serial::serialize_node;
///
/// let doc = Document::parse_str("<r><a x=\"1\">t</a></r>").unwrap();
/// let a = doc.first_child(doc.root_element().unwrap()).unwrap();
/// assert_eq!(serialize_node(&doc, a), "<a x=\"1\">t</a>");
/// ```
#[must_use]
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let options = SerializeOptions::default();
    let mut serializer = Serializer::new(doc, &options, String::new());
    if matches!(doc.node(id).kind, NodeKind::Document) {
        for child in doc.children(id) {
            serializer.node(child, 0, false);
        }
    } else {
        serializer.node(id, 0, false);
    }
    serializer.out
}

struct Serializer<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    /// Declared output encoding; `None` keeps the output ASCII.
    encoding: Option<&'a str>,
    out: String,
}

impl<'a> Serializer<'a> {
    fn new(doc: &'a Document, options: &'a SerializeOptions, out: String) -> Self {
        Self {
            doc,
            options,
            encoding: doc.encoding.as_deref(),
            out,
        }
    }

    fn needs_char_ref(&self, ch: char) -> bool {
        match self.encoding {
            None => !ch.is_ascii(),
            Some(label) => !is_representable(label, ch),
        }
    }

    fn write_indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent_str);
        }
    }

    fn node(&mut self, id: NodeId, depth: usize, parent_is_element_only: bool) {
        let doc = self.doc;
        let pretty = self.options.indent && parent_is_element_only;
        match &doc.node(id).kind {
            NodeKind::Element {
                name,
                prefix,
                attributes,
                ..
            } => {
                if pretty {
                    self.write_indent(depth);
                }
                self.out.push('<');
                write_qname(&mut self.out, prefix.as_deref(), name);
                for attr in attributes {
                    self.out.push(' ');
                    write_qname(&mut self.out, attr.prefix.as_deref(), &attr.name);
                    self.out.push_str("=\"");
                    self.escaped_attr(&attr.value);
                    self.out.push('"');
                }

                if doc.first_child(id).is_none() {
                    self.out.push_str("/>");
                } else {
                    self.out.push('>');
                    let element_only = self.options.indent && doc.has_element_only_content(id);
                    if element_only {
                        self.out.push('\n');
                    }
                    for child in doc.children(id) {
                        if element_only && doc.node(child).kind.is_blank_text() {
                            continue;
                        }
                        self.node(child, depth + 1, element_only);
                    }
                    if element_only {
                        self.write_indent(depth);
                    }
                    self.out.push_str("</");
                    write_qname(&mut self.out, prefix.as_deref(), name);
                    self.out.push('>');
                }
                if pretty {
                    self.out.push('\n');
                }
            }
            NodeKind::Text { content } => self.escaped_text(content),
            NodeKind::CData { content } => {
                self.out.push_str("<![CDATA[");
                self.out.push_str(content);
                self.out.push_str("]]>");
            }
            NodeKind::Comment { content } => {
                if pretty {
                    self.write_indent(depth);
                }
                self.out.push_str("<!--");
                self.out.push_str(content);
                self.out.push_str("-->");
                if pretty {
                    self.out.push('\n');
                }
            }
            NodeKind::ProcessingInstruction { target, data } => {
                if pretty {
                    self.write_indent(depth);
                }
                self.out.push_str("<?");
                self.out.push_str(target);
                if let Some(d) = data {
                    self.out.push(' ');
                    self.out.push_str(d);
                }
                self.out.push_str("?>");
                if pretty {
                    self.out.push('\n');
                }
            }
            NodeKind::EntityRef { name, .. } => {
                let _ = write!(self.out, "&{name};");
            }
            NodeKind::DocumentType {
                name,
                system_id,
                public_id,
                internal_subset,
            } => {
                let _ = write!(self.out, "<!DOCTYPE {name}");
                match (public_id, system_id) {
                    (Some(pub_id), Some(sys_id)) => {
                        let _ = write!(self.out, " PUBLIC \"{pub_id}\" \"{sys_id}\"");
                    }
                    (None, Some(sys_id)) => {
                        let _ = write!(self.out, " SYSTEM \"{sys_id}\"");
                    }
                    _ => {}
                }
                if let Some(subset) = internal_subset {
                    let _ = write!(self.out, " [{subset}]");
                }
                self.out.push('>');
            }
            NodeKind::Document => {}
        }
    }

    /// Escapes text content: `<`, `>` and `&` by name, `\r` and other
    /// control characters as character references.
    fn escaped_text(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                '\r' => self.out.push_str("&#13;"),
                '\t' | '\n' => self.out.push(ch),
                c if (c as u32) < 0x20 || self.needs_char_ref(c) => self.hex_char_ref(c),
                _ => self.out.push(ch),
            }
        }
    }

    /// Escapes an attribute value; whitespace other than the space is
    /// written as a character reference so it survives re-parsing.
    fn escaped_attr(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                '"' => self.out.push_str("&quot;"),
                '\t' => self.out.push_str("&#9;"),
                '\n' => self.out.push_str("&#10;"),
                '\r' => self.out.push_str("&#13;"),
                c if (c as u32) < 0x20 || self.needs_char_ref(c) => self.hex_char_ref(c),
                _ => self.out.push(ch),
            }
        }
    }

    fn hex_char_ref(&mut self, ch: char) {
        let _ = write!(self.out, "&#x{:X};", ch as u32);
    }
}

fn write_qname(out: &mut String, prefix: Option<&str>, name: &str) {
    if let Some(pfx) = prefix {
        out.push_str(pfx);
        out.push(':');
    }
    out.push_str(name);
}
