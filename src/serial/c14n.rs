//! Canonical XML (C14N) serialization.
//!
//! Implements Canonical XML 1.0 per the W3C specification:
//! <https://www.w3.org/TR/xml-c14n/>
//!
//! Canonical XML produces one deterministic text for logically equivalent
//! XML, which is what makes textual comparison of two trees meaningful.
//!
//! # Key C14N rules
//!
//! - No XML declaration in output
//! - Attributes sorted by namespace URI then local name
//! - Namespace declarations sorted by prefix, redundant ones dropped
//! - Empty elements always use start-end tag pairs (`<a></a>`, not `<a/>`)
//! - CDATA sections replaced with escaped text content
//! - Entity references expanded
//! - DOCTYPE declarations removed
//!
//! On top of the standard, [`C14nOptions::strip_blanks`] drops whitespace-only
//! text inside element-only content, i.e. indentation. Whitespace in mixed
//! content is character data and always kept.
//!
//! # Examples
//!
//! ```
//! use domcompare::Document;
//! use domcompare::serial::c14n::{canonicalize, C14nOptions};
//!
//! let doc = Document::parse_str("<root><child/></root>").unwrap();
//! let c14n = canonicalize(&doc, &C14nOptions::default());
//! assert_eq!(c14n, "<root><child></child></root>");
//! ```

use std::collections::BTreeMap;

use crate::tree::{Attribute, Document, NodeId, NodeKind};

/// Options for canonical XML serialization.
///
/// # Examples
///
/// ```
/// use domcompare::serial::c14n::C14nOptions;
///
/// // Default: comments and whitespace kept
/// let opts = C14nOptions::default();
/// assert!(opts.with_comments);
/// assert!(!opts.strip_blanks);
///
/// let opts = opts.with_comments(false).strip_blanks(true);
/// assert!(!opts.with_comments);
/// ```
#[derive(Debug, Clone)]
pub struct C14nOptions {
    /// If true, include comments in output (C14N with comments).
    pub with_comments: bool,
    /// If true, drop whitespace-only text nodes whose parent has
    /// element-only content.
    pub strip_blanks: bool,
}

impl Default for C14nOptions {
    fn default() -> Self {
        Self {
            with_comments: true,
            strip_blanks: false,
        }
    }
}

impl C14nOptions {
    /// Includes or drops comments.
    #[must_use]
    pub fn with_comments(mut self, yes: bool) -> Self {
        self.with_comments = yes;
        self
    }

    /// Drops or keeps ignorable whitespace-only text.
    #[must_use]
    pub fn strip_blanks(mut self, yes: bool) -> Self {
        self.strip_blanks = yes;
        self
    }
}

/// Serializes a document to Canonical XML (C14N 1.0).
///
/// A document without a root element canonicalizes to the empty string
/// (unless it carries comments or processing instructions).
///
/// # Examples
///
/// ```
/// use domcompare::Document;
/// use domcompare::serial::c14n::{canonicalize, C14nOptions};
///
/// let doc = Document::parse_str("<root attr2=\"b\" attr1=\"a\"/>").unwrap();
/// let c14n = canonicalize(&doc, &C14nOptions::default());
/// assert_eq!(c14n, "<root attr1=\"a\" attr2=\"b\"></root>");
/// ```
#[must_use]
pub fn canonicalize(doc: &Document, options: &C14nOptions) -> String {
    let mut ctx = C14nContext::new(doc, options);
    ctx.process_document();
    ctx.output
}

/// Serializes a subtree (a node and its descendants) to Canonical XML.
///
/// The apex element also renders the namespace declarations and `xml:*`
/// attributes it inherits from its ancestors, so the output is
/// self-contained.
///
/// # Examples
///
/// ```
/// use domcompare::Document;
/// use domcompare::serial::c14n::{canonicalize_subtree, C14nOptions};
///
/// let doc = Document::parse_str("<r xmlns:p=\"urn:p\"><p:child>text</p:child></r>").unwrap();
/// let child = doc.first_child(doc.root_element().unwrap()).unwrap();
/// let c14n = canonicalize_subtree(&doc, child, &C14nOptions::default());
/// assert_eq!(c14n, "<p:child xmlns:p=\"urn:p\">text</p:child>");
/// ```
#[must_use]
pub fn canonicalize_subtree(doc: &Document, node: NodeId, options: &C14nOptions) -> String {
    let mut ctx = C14nContext::new(doc, options);
    ctx.inherited = Some(inherited_ns_decls(doc, node));
    ctx.inherited_attrs = inherited_xml_attrs(doc, node);
    ctx.process_node(node);
    ctx.output
}

/// A namespace binding: prefix (empty string for default namespace) to URI.
type NsBinding = BTreeMap<String, String>;

struct C14nContext<'a> {
    doc: &'a Document,
    options: &'a C14nOptions,
    output: String,
    /// Namespace bindings rendered so far, one frame per open element.
    rendered_ns_stack: Vec<NsBinding>,
    /// Ancestor declarations still to be rendered on the subtree apex.
    inherited: Option<NsBinding>,
    /// Ancestor `xml:*` attributes still to be rendered on the subtree apex.
    inherited_attrs: Vec<Attribute>,
}

impl<'a> C14nContext<'a> {
    fn new(doc: &'a Document, options: &'a C14nOptions) -> Self {
        Self {
            doc,
            options,
            output: String::new(),
            rendered_ns_stack: vec![NsBinding::new()],
            inherited: None,
            inherited_attrs: Vec::new(),
        }
    }

    /// Processes the document node: comments and PIs outside the root
    /// element are separated from it by a line feed.
    fn process_document(&mut self) {
        let doc = self.doc;
        let children: Vec<NodeId> = doc.children(doc.root()).collect();
        let root_elem_index = children
            .iter()
            .position(|&id| doc.node(id).kind.is_element());

        for (i, &child) in children.iter().enumerate() {
            let before_root = root_elem_index.is_some_and(|r| i < r);
            let after_root = root_elem_index.is_some_and(|r| i > r);
            match &doc.node(child).kind {
                NodeKind::Comment { .. } if !self.options.with_comments => {}
                NodeKind::Comment { content } => {
                    if after_root {
                        self.output.push('\n');
                    }
                    write_c14n_comment(&mut self.output, content);
                    if before_root {
                        self.output.push('\n');
                    }
                }
                NodeKind::ProcessingInstruction { target, data } => {
                    if after_root {
                        self.output.push('\n');
                    }
                    write_c14n_pi(&mut self.output, target, data.as_deref());
                    if before_root {
                        self.output.push('\n');
                    }
                }
                NodeKind::Element { .. } => self.process_element(child),
                // DOCTYPE and stray text at the document level are not output.
                _ => {}
            }
        }
    }

    fn process_node(&mut self, id: NodeId) {
        let doc = self.doc;
        match &doc.node(id).kind {
            NodeKind::Element { .. } => self.process_element(id),
            NodeKind::Text { content } | NodeKind::CData { content } => {
                write_c14n_text(&mut self.output, content);
            }
            NodeKind::Comment { content } => {
                if self.options.with_comments {
                    write_c14n_comment(&mut self.output, content);
                }
            }
            NodeKind::ProcessingInstruction { target, data } => {
                write_c14n_pi(&mut self.output, target, data.as_deref());
            }
            NodeKind::EntityRef { name, value } => {
                let expanded = value
                    .as_deref()
                    .unwrap_or_else(|| expand_predefined_entity(name));
                write_c14n_text(&mut self.output, expanded);
            }
            NodeKind::DocumentType { .. } => {}
            NodeKind::Document => self.process_document(),
        }
    }

    /// Returns `true` for whitespace-only text in element-only content when
    /// `strip_blanks` is on.
    fn is_ignorable_blank(&self, id: NodeId) -> bool {
        self.options.strip_blanks
            && self.doc.node(id).kind.is_blank_text()
            && self
                .doc
                .parent(id)
                .is_some_and(|parent| self.doc.has_element_only_content(parent))
    }

    fn process_element(&mut self, id: NodeId) {
        let doc = self.doc;
        let NodeKind::Element {
            name,
            prefix,
            attributes,
            ..
        } = &doc.node(id).kind
        else {
            return;
        };

        let ns_to_output = self.compute_ns_declarations(attributes);

        self.output.push('<');
        write_qname(&mut self.output, prefix.as_deref(), name);
        self.write_ns_declarations(&ns_to_output);
        let inherited_attrs = std::mem::take(&mut self.inherited_attrs);
        self.write_sorted_attributes(attributes, &inherited_attrs);
        self.output.push('>');

        for child in doc.children(id) {
            if !self.is_ignorable_blank(child) {
                self.process_node(child);
            }
        }

        self.output.push_str("</");
        write_qname(&mut self.output, prefix.as_deref(), name);
        self.output.push('>');

        self.rendered_ns_stack.pop();
    }

    /// Computes which namespace declarations need to be output for an
    /// element, pushes a new rendered namespace scope, and returns the
    /// sorted `(prefix, URI)` pairs to emit.
    fn compute_ns_declarations(&mut self, attributes: &[Attribute]) -> Vec<(String, String)> {
        let mut ns_decls = collect_ns_decls(attributes);

        if let Some(inherited) = self.inherited.take() {
            for (pfx, uri) in inherited {
                if !ns_decls.iter().any(|(p, _)| *p == pfx) {
                    ns_decls.push((pfx, uri));
                }
            }
        }

        let parent_rendered = self.rendered_ns_stack.last().cloned().unwrap_or_default();
        let mut current_rendered = parent_rendered.clone();
        let mut ns_to_output: Vec<(String, String)> = Vec::new();

        for (ns_prefix, ns_uri) in ns_decls {
            // `xmlns=""` only matters if a default namespace is in effect.
            let redundant = if ns_prefix.is_empty() && ns_uri.is_empty() {
                parent_rendered.get("").map_or(true, String::is_empty)
            } else {
                parent_rendered.get(&ns_prefix) == Some(&ns_uri)
            };
            if !redundant {
                current_rendered.insert(ns_prefix.clone(), ns_uri.clone());
                ns_to_output.push((ns_prefix, ns_uri));
            }
        }

        ns_to_output.sort_by(|a, b| a.0.cmp(&b.0));
        self.rendered_ns_stack.push(current_rendered);
        ns_to_output
    }

    fn write_ns_declarations(&mut self, ns_to_output: &[(String, String)]) {
        for (ns_prefix, ns_uri) in ns_to_output {
            if ns_prefix.is_empty() {
                self.output.push_str(" xmlns=\"");
            } else {
                self.output.push_str(" xmlns:");
                self.output.push_str(ns_prefix);
                self.output.push_str("=\"");
            }
            write_c14n_attr_value(&mut self.output, ns_uri);
            self.output.push('"');
        }
    }

    /// Writes the element's attributes plus any `inherited` ones it does not
    /// override, in canonical order.
    fn write_sorted_attributes(&mut self, attributes: &[Attribute], inherited: &[Attribute]) {
        let mut regular_attrs: Vec<&Attribute> = attributes
            .iter()
            .filter(|a| !a.is_namespace_decl())
            .collect();
        for attr in inherited {
            if !attributes
                .iter()
                .any(|a| a.prefix == attr.prefix && a.name == attr.name)
            {
                regular_attrs.push(attr);
            }
        }

        regular_attrs.sort_by(|a, b| {
            let a_ns = a.namespace.as_deref().unwrap_or("");
            let b_ns = b.namespace.as_deref().unwrap_or("");
            a_ns.cmp(b_ns).then_with(|| a.name.cmp(&b.name))
        });

        for attr in regular_attrs {
            self.output.push(' ');
            write_qname(&mut self.output, attr.prefix.as_deref(), &attr.name);
            self.output.push_str("=\"");
            write_c14n_attr_value(&mut self.output, &attr.value);
            self.output.push('"');
        }
    }
}

/// Collects the namespace declarations in scope at `node` that were made on
/// its ancestors, innermost declaration winning.
fn inherited_ns_decls(doc: &Document, node: NodeId) -> NsBinding {
    let mut bindings = NsBinding::new();
    let ancestors: Vec<NodeId> = doc.ancestors(node).skip(1).collect();
    for ancestor in ancestors.into_iter().rev() {
        for (pfx, uri) in collect_ns_decls(doc.attributes(ancestor)) {
            bindings.insert(pfx, uri);
        }
    }
    // An undeclared default namespace is simply absent.
    if bindings.get("").is_some_and(String::is_empty) {
        bindings.remove("");
    }
    bindings
}

/// Collects `xml:*` attributes (`xml:lang`, `xml:space`, ...) set on the
/// ancestors of `node`, innermost value winning.
fn inherited_xml_attrs(doc: &Document, node: NodeId) -> Vec<Attribute> {
    let mut attrs: Vec<Attribute> = Vec::new();
    for ancestor in doc.ancestors(node).skip(1) {
        for attr in doc.attributes(ancestor) {
            if attr.prefix.as_deref() == Some("xml") && !attrs.iter().any(|a| a.name == attr.name) {
                attrs.push(attr.clone());
            }
        }
    }
    attrs
}

/// Collects every namespace declaration on the element. The rendering stack
/// handles deduplication.
fn collect_ns_decls(attributes: &[Attribute]) -> Vec<(String, String)> {
    attributes
        .iter()
        .filter_map(|attr| {
            if attr.prefix.as_deref() == Some("xmlns") {
                Some((attr.name.clone(), attr.value.clone()))
            } else if attr.prefix.is_none() && attr.name == "xmlns" {
                Some((String::new(), attr.value.clone()))
            } else {
                None
            }
        })
        .collect()
}

fn write_qname(out: &mut String, prefix: Option<&str>, name: &str) {
    if let Some(pfx) = prefix {
        out.push_str(pfx);
        out.push(':');
    }
    out.push_str(name);
}

fn write_c14n_pi(out: &mut String, target: &str, data: Option<&str>) {
    out.push_str("<?");
    out.push_str(target);
    if let Some(d) = data {
        out.push(' ');
        out.push_str(d);
    }
    out.push_str("?>");
}

fn write_c14n_comment(out: &mut String, content: &str) {
    out.push_str("<!--");
    out.push_str(content);
    out.push_str("-->");
}

/// Escapes text content per C14N rules: `&`, `<`, `>` and `\r`.
fn write_c14n_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

/// Escapes an attribute value per C14N rules: `&`, `<`, `"`, `\t`, `\n`
/// and `\r`.
fn write_c14n_attr_value(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

fn expand_predefined_entity(name: &str) -> &str {
    match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "apos" => "'",
        "quot" => "\"",
        _ => "",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn c14n(xml: &str) -> String {
        let doc = Document::parse_str(xml).unwrap();
        canonicalize(&doc, &C14nOptions::default())
    }

    fn c14n_with(xml: &str, options: &C14nOptions) -> String {
        let doc = Document::parse_str(xml).unwrap();
        canonicalize(&doc, options)
    }

    #[test]
    fn test_empty_element_uses_start_end_tags() {
        assert_eq!(c14n("<root/>"), "<root></root>");
        assert_eq!(c14n("<root><child/></root>"), "<root><child></child></root>");
    }

    #[test]
    fn test_attribute_sorting() {
        assert_eq!(
            c14n("<root z=\"1\" a=\"2\" m=\"3\"/>"),
            "<root a=\"2\" m=\"3\" z=\"1\"></root>"
        );
    }

    #[test]
    fn test_namespace_declaration_ordering() {
        assert_eq!(
            c14n("<root xmlns:z=\"http://z.example\" xmlns:a=\"http://a.example\"/>"),
            "<root xmlns:a=\"http://a.example\" xmlns:z=\"http://z.example\"></root>"
        );
    }

    #[test]
    fn test_mixed_namespace_and_regular_attrs() {
        assert_eq!(
            c14n("<root xmlns:b=\"http://b\" xmlns:a=\"http://a\" b:y=\"1\" a:x=\"2\" c=\"3\"/>"),
            "<root xmlns:a=\"http://a\" xmlns:b=\"http://b\" c=\"3\" a:x=\"2\" b:y=\"1\"></root>"
        );
    }

    #[test]
    fn test_text_and_attribute_escaping() {
        let mut doc = Document::new();
        let root = doc.root();
        let elem = doc.create_node(NodeKind::Element {
            name: "root".to_string(),
            prefix: None,
            namespace: None,
            attributes: vec![Attribute {
                name: "val".to_string(),
                value: "a&b<c\"d\te\nf\rg".to_string(),
                prefix: None,
                namespace: None,
            }],
        });
        let text = doc.create_node(NodeKind::Text {
            content: "a & b < c > d\re".to_string(),
        });
        doc.append_child(root, elem);
        doc.append_child(elem, text);
        assert_eq!(
            canonicalize(&doc, &C14nOptions::default()),
            "<root val=\"a&amp;b&lt;c&quot;d&#x9;e&#xA;f&#xD;g\">a &amp; b &lt; c &gt; d&#xD;e</root>"
        );
    }

    #[test]
    fn test_declaration_and_doctype_removed() {
        assert_eq!(
            c14n("<?xml version=\"1.0\" encoding=\"UTF-8\"?><!DOCTYPE root><root/>"),
            "<root></root>"
        );
    }

    #[test]
    fn test_cdata_replaced_with_escaped_text() {
        assert_eq!(
            c14n("<root><![CDATA[x < 1 && y > 2]]></root>"),
            "<root>x &lt; 1 &amp;&amp; y &gt; 2</root>"
        );
    }

    #[test]
    fn test_entity_reference_expanded() {
        assert_eq!(
            c14n("<!DOCTYPE r [<!ENTITY e \"a&amp;b\">]><r>[&e;]</r>"),
            "<r>[a&amp;b]</r>"
        );
    }

    #[test]
    fn test_comments_toggle() {
        assert_eq!(c14n("<root><!-- hello --></root>"), "<root><!-- hello --></root>");
        let opts = C14nOptions::default().with_comments(false);
        assert_eq!(c14n_with("<!--a--><root><!-- hello --></root><!--b-->", &opts), "<root></root>");
    }

    #[test]
    fn test_document_comments_and_pis_spacing() {
        assert_eq!(
            c14n("<!-- pro --><?before?><root/><?after?>"),
            "<!-- pro -->\n<?before?>\n<root></root>\n<?after?>"
        );
    }

    #[test]
    fn test_whitespace_only_text_preserved_by_default() {
        assert_eq!(c14n("<root> </root>"), "<root> </root>");
        assert_eq!(c14n("<root>\n  <a/>\n</root>"), "<root>\n  <a></a>\n</root>");
    }

    #[test]
    fn test_strip_blanks_drops_indentation() {
        let opts = C14nOptions::default().strip_blanks(true);
        assert_eq!(
            c14n_with("<root>\n  <a> x </a>\n  <b>  </b>\n</root>", &opts),
            "<root><a> x </a><b>  </b></root>"
        );
    }

    #[test]
    fn test_redundant_namespace_not_redeclared() {
        assert_eq!(
            c14n("<root xmlns=\"http://example.com\"><child xmlns=\"http://example.com\"/></root>"),
            "<root xmlns=\"http://example.com\"><child></child></root>"
        );
        assert_eq!(
            c14n("<a xmlns:p=\"urn:p\"><b xmlns:p=\"urn:p\"><p:c/></b></a>"),
            "<a xmlns:p=\"urn:p\"><b><p:c></p:c></b></a>"
        );
    }

    #[test]
    fn test_default_namespace_undeclaration() {
        assert_eq!(c14n("<a><b xmlns=\"\"/></a>"), "<a><b></b></a>");
        assert_eq!(
            c14n("<a xmlns=\"urn:a\"><b xmlns=\"\"/></a>"),
            "<a xmlns=\"urn:a\"><b xmlns=\"\"></b></a>"
        );
    }

    #[test]
    fn test_subtree_renders_inherited_namespaces() {
        let doc = Document::parse_str(
            "<root xmlns=\"urn:d\" xmlns:a=\"urn:a\"><mid xmlns:a=\"urn:a2\"><leaf a:x=\"1\"/></mid></root>",
        )
        .unwrap();
        let leaf = doc
            .descendants(doc.root())
            .find(|&id| doc.node_name(id) == Some("leaf"))
            .unwrap();
        assert_eq!(
            canonicalize_subtree(&doc, leaf, &C14nOptions::default()),
            "<leaf xmlns=\"urn:d\" xmlns:a=\"urn:a2\" a:x=\"1\"></leaf>"
        );
    }

    #[test]
    fn test_subtree_without_namespaces() {
        let doc = Document::parse_str("<root><child attr=\"value\">text</child></root>").unwrap();
        let child = doc.first_child(doc.root_element().unwrap()).unwrap();
        assert_eq!(
            canonicalize_subtree(&doc, child, &C14nOptions::default()),
            "<child attr=\"value\">text</child>"
        );
    }

    #[test]
    fn test_strip_blanks_keeps_mixed_content() {
        let opts = C14nOptions::default().strip_blanks(true);
        assert_eq!(
            c14n_with("<p>Hello <b>world</b> <i>again</i></p>", &opts),
            "<p>Hello <b>world</b> <i>again</i></p>"
        );
        assert_eq!(
            c14n_with("<r>\n  <p>a<b>x</b>  <i>y</i></p>\n</r>", &opts),
            "<r><p>a<b>x</b>  <i>y</i></p></r>"
        );
        // A CDATA sibling makes the content mixed.
        assert_eq!(
            c14n_with("<r> <a/><![CDATA[]]></r>", &opts),
            "<r> <a></a></r>"
        );
    }

    #[test]
    fn test_subtree_renders_inherited_xml_attributes() {
        let doc = Document::parse_str("<r xml:lang=\"en\"><a>x</a></r>").unwrap();
        let a = doc.first_child(doc.root_element().unwrap()).unwrap();
        assert_eq!(
            canonicalize_subtree(&doc, a, &C14nOptions::default()),
            "<a xml:lang=\"en\">x</a>"
        );
    }

    #[test]
    fn test_inherited_xml_attributes_innermost_wins() {
        let doc = Document::parse_str(
            "<r xml:lang=\"en\" xml:space=\"preserve\"><m xml:lang=\"fr\"><a z=\"1\"/><b xml:lang=\"de\"/></m></r>",
        )
        .unwrap();
        let m = doc.first_child(doc.root_element().unwrap()).unwrap();
        let a = doc.first_child(m).unwrap();
        let b = doc.last_child(m).unwrap();
        let opts = C14nOptions::default();
        assert_eq!(
            canonicalize_subtree(&doc, a, &opts),
            "<a z=\"1\" xml:lang=\"fr\" xml:space=\"preserve\"></a>"
        );
        assert_eq!(
            canonicalize_subtree(&doc, b, &opts),
            "<b xml:lang=\"de\" xml:space=\"preserve\"></b>"
        );
        // Only the apex repeats them.
        assert_eq!(
            canonicalize_subtree(&doc, m, &opts),
            "<m xml:lang=\"fr\" xml:space=\"preserve\"><a z=\"1\"></a><b xml:lang=\"de\"></b></m>"
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(canonicalize(&Document::new(), &C14nOptions::default()), "");
    }
}
