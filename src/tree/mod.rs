//! Arena-based XML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the `Document`,
//! and are referenced by `NodeId`, a newtype over `NonZeroU32`. Navigation
//! links (parent, first\_child, last\_child, next\_sibling, prev\_sibling) are
//! arena indices, so the tree has no reference cycles and no per-node heap
//! allocation; dropping the `Document` frees everything.
//!
//! A [`NodeRef`] pairs a borrowed `Document` with one of its node ids and is
//! the handle the comparison layer works with.

mod handle;
mod node;

pub use handle::NodeRef;
pub use node::NodeKind;

use crate::error::ParseError;
use std::num::NonZeroU32;

/// A typed index into the document's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0 or does not fit in a `u32`.
    #[allow(clippy::expect_used)]
    fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index).expect("node arena exceeds u32::MAX entries");
        Self(NonZeroU32::new(raw).expect("NodeId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
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
        }
    }
}

/// An XML attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute's local name (e.g., `"lang"` for `xml:lang`).
    pub name: String,
    /// The attribute value, references expanded and whitespace normalized.
    pub value: String,
    /// Namespace prefix, if any (e.g., `"xml"` for `xml:lang`).
    pub prefix: Option<String>,
    /// Namespace URI after resolution, if any.
    pub namespace: Option<String>,
}

impl Attribute {
    /// Returns `true` if this attribute is a namespace declaration
    /// (`xmlns` or `xmlns:*`).
    #[must_use]
    pub fn is_namespace_decl(&self) -> bool {
        self.prefix.as_deref() == Some("xmlns") || (self.prefix.is_none() && self.name == "xmlns")
    }
}

/// An XML document.
///
/// The `Document` owns all nodes in an arena. Navigation goes through
/// `&Document`, mutation through `&mut Document`.
///
/// # Examples
///
/// ```
/// use domcompare::Document;
///
/// let doc = Document::parse_str("<root/>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), Some("root"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    root: NodeId,
    /// XML version from the XML declaration (e.g., "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration (e.g., "UTF-8").
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
}

impl Document {
    /// Creates a new empty document containing only the document node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(NodeData::new(NodeKind::Document));
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Creates an empty document shell with the given declaration values.
    ///
    /// # Examples
    ///
    /// ```
    /// use domcompare::Document;
    ///
    /// let doc = Document::with_declaration("1.0", Some("ISO-8859-1"));
    /// assert_eq!(doc.encoding.as_deref(), Some("ISO-8859-1"));
    /// assert!(doc.root_element().is_none());
    /// ```
    #[must_use]
    pub fn with_declaration(version: &str, encoding: Option<&str>) -> Self {
        let mut doc = Self::new();
        doc.version = Some(version.to_string());
        doc.encoding = encoding.map(str::to_string);
        doc
    }

    /// Parses an XML string into a `Document`.
    ///
    /// A leading byte order mark is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        crate::parser::parse_str(input)
    }

    /// Parses XML from raw bytes, detecting the encoding from the byte order
    /// mark and the XML declaration.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or the resulting
    /// text is not well-formed XML.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        crate::parser::parse_bytes(input)
    }

    /// Replaces this document's content with the parsed `input`.
    ///
    /// Like a DOM `loadXML`, the declaration fields are taken from the new
    /// text: a string without an XML declaration leaves `version` at the
    /// parser's default and clears `encoding` and `standalone`. On error the
    /// document is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if `input` is not well-formed XML.
    pub fn load_xml(&mut self, input: &str) -> Result<(), ParseError> {
        *self = Self::parse_str(input)?;
        Ok(())
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the root element of the document, if there is one.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| self.node(id).kind.is_element())
    }

    /// Returns a handle to the whole document.
    #[must_use]
    pub fn as_node(&self) -> NodeRef<'_> {
        NodeRef::new(self, self.root)
    }

    /// Returns a handle to a node of this document.
    #[must_use]
    pub fn node_ref(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef::new(self, id)
    }

    /// Returns the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the local name of an element or the target of a PI.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => Some(name),
            _ => None,
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

    /// Returns the text of a text, comment, CDATA or PI node.
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

    /// Returns the concatenated text content of a node and its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => buf.push_str(content),
            NodeKind::EntityRef { value, .. } => {
                if let Some(val) = value {
                    buf.push_str(val);
                }
            }
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    /// Returns the attributes of an element node (empty for other kinds).
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns `true` if the node has at least one element child and its
    /// character data is whitespace only. Whitespace in such content is
    /// formatting rather than data; a CDATA section or entity reference
    /// makes the content mixed.
    #[must_use]
    pub fn has_element_only_content(&self, id: NodeId) -> bool {
        let mut has_element_child = false;
        for child in self.children(id) {
            match &self.node(child).kind {
                NodeKind::Element { .. } => has_element_child = true,
                kind @ NodeKind::Text { .. } if !kind.is_blank_text() => return false,
                NodeKind::CData { .. } | NodeKind::EntityRef { .. } => return false,
                _ => {}
            }
        }
        has_element_child
    }

    /// Returns the value of an unprefixed attribute by name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.prefix.is_none() && a.name == name)
            .map(|a| a.value.as_str())
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
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// Returns an iterator over a node and its ancestors, innermost first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns a depth-first iterator over the descendants of a node
    /// (the node itself excluded).
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    // --- Mutation ---

    /// Allocates a new detached node in the arena and returns its `NodeId`.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Appends a child node to the end of a parent's child list.
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

    /// Inserts `new_child` before `reference` in the reference's parent.
    ///
    /// Does nothing if `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );
        let Some(parent) = self.node(reference).parent else {
            return;
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

        let node = self.node_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Returns the number of nodes in the arena, detached ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Normalizes the whole document in place.
    ///
    /// - entity reference nodes with a known replacement text are replaced
    ///   by a text node holding that text;
    /// - adjacent text nodes are merged into one;
    /// - empty text nodes are removed.
    ///
    /// CDATA sections are left alone.
    ///
    /// # Examples
    ///
    /// ```
    /// use domcompare::Document;
    ///
    /// let mut doc = Document::parse_str(
    ///     "<!DOCTYPE r [<!ENTITY who \"world\">]><r>hello &who;!</r>",
    /// ).unwrap();
    /// doc.normalize_document();
    /// let r = doc.root_element().unwrap();
    /// assert_eq!(doc.children(r).count(), 1);
    /// assert_eq!(doc.text_content(r), "hello world!");
    /// ```
    pub fn normalize_document(&mut self) {
        let ids: Vec<NodeId> = self.descendants(self.root).collect();
        for id in ids {
            if let NodeKind::EntityRef {
                value: Some(value), ..
            } = &self.node(id).kind
            {
                let content = value.clone();
                let text = self.create_node(NodeKind::Text { content });
                self.insert_before(id, text);
                self.detach(id);
            }
        }

        let parents: Vec<NodeId> = std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|&id| self.first_child(id).is_some())
            .collect();
        for parent in parents {
            self.merge_text_children(parent);
        }
    }

    fn merge_text_children(&mut self, parent: NodeId) {
        let mut cursor = self.first_child(parent);
        while let Some(id) = cursor {
            let next = self.next_sibling(id);
            let NodeKind::Text { content } = &self.node(id).kind else {
                cursor = next;
                continue;
            };
            if content.is_empty() {
                self.detach(id);
                cursor = next;
                continue;
            }
            if let Some(sibling) = next {
                if let NodeKind::Text { content: tail } = &self.node(sibling).kind {
                    let tail = tail.clone();
                    if let NodeKind::Text { content } = &mut self.node_mut(id).kind {
                        content.push_str(&tail);
                    }
                    self.detach(sibling);
                    // Stay on `id`: the new next sibling may be text too.
                    continue;
                }
            }
            cursor = next;
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
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

    fn element(name: &str) -> NodeKind {
        NodeKind::Element {
            name: name.to_string(),
            prefix: None,
            namespace: None,
            attributes: Vec::new(),
        }
    }

    fn text(content: &str) -> NodeKind {
        NodeKind::Text {
            content: content.to_string(),
        }
    }

    #[test]
    fn test_new_document_has_root() {
        let doc = Document::new();
        assert!(matches!(doc.node(doc.root()).kind, NodeKind::Document));
        assert_eq!(doc.node_count(), 1);
        assert!(doc.root_element().is_none());
    }

    #[test]
    fn test_append_and_navigate() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_node(element("a"));
        let b = doc.create_node(element("b"));
        let c = doc.create_node(element("c"));
        doc.append_child(root, a);
        doc.append_child(a, b);
        doc.append_child(a, c);

        assert_eq!(doc.root_element(), Some(a));
        assert_eq!(doc.children(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(doc.next_sibling(b), Some(c));
        assert_eq!(doc.prev_sibling(c), Some(b));
        assert_eq!(doc.parent(c), Some(a));
        assert_eq!(doc.last_child(a), Some(c));
    }

    #[test]
    fn test_insert_before_first_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_node(element("a"));
        let b = doc.create_node(element("b"));
        doc.append_child(root, b);
        doc.insert_before(b, a);
        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(doc.first_child(root), Some(a));
    }

    #[test]
    fn test_insert_before_detached_reference_is_noop() {
        let mut doc = Document::new();
        let a = doc.create_node(element("a"));
        let b = doc.create_node(element("b"));
        doc.insert_before(a, b);
        assert!(doc.parent(b).is_none());
    }

    #[test]
    fn test_detach_middle_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let ids: Vec<NodeId> = ["a", "b", "c"]
            .iter()
            .map(|n| {
                let id = doc.create_node(element(n));
                doc.append_child(root, id);
                id
            })
            .collect();
        doc.detach(ids[1]);
        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![ids[0], ids[2]]);
        assert_eq!(doc.prev_sibling(ids[2]), Some(ids[0]));
        assert!(doc.parent(ids[1]).is_none());
    }

    #[test]
    fn test_descendants_and_ancestors() {
        let doc = Document::parse_str("<a><b><c/></b><d/></a>").unwrap();
        let a = doc.root_element().unwrap();
        let names: Vec<&str> = doc
            .descendants(a)
            .filter_map(|id| doc.node_name(id))
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);

        let c = doc.descendants(a).nth(1).unwrap();
        let up: Vec<NodeId> = doc.ancestors(c).collect();
        assert_eq!(up.len(), 4);
        assert_eq!(up[3], doc.root());
    }

    #[test]
    fn test_text_content_and_attributes() {
        let doc = Document::parse_str(r#"<a x="1"><b>hel</b>lo<![CDATA[!]]></a>"#).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.text_content(a), "hello!");
        assert_eq!(doc.attribute(a, "x"), Some("1"));
        assert_eq!(doc.attribute(a, "y"), None);
        assert_eq!(doc.attributes(doc.root()).len(), 0);
    }

    #[test]
    fn test_element_only_content() {
        let doc = Document::parse_str(
            "<r>\n  <a>x</a>\n  <b/>\n<p>Hi <i>there</i> </p><c><![CDATA[ ]]><d/></c></r>",
        )
        .unwrap();
        let r = doc.root_element().unwrap();
        let kids: Vec<NodeId> = doc
            .children(r)
            .filter(|&id| doc.node(id).kind.is_element())
            .collect();
        assert!(doc.has_element_only_content(r));
        // Text only.
        assert!(!doc.has_element_only_content(kids[0]));
        // No children at all.
        assert!(!doc.has_element_only_content(kids[1]));
        // Mixed content.
        assert!(!doc.has_element_only_content(kids[2]));
        // A CDATA section counts as data even when blank.
        assert!(!doc.has_element_only_content(kids[3]));
    }

    #[test]
    fn test_load_xml_replaces_declaration() {
        let mut doc = Document::with_declaration("1.1", Some("ISO-8859-1"));
        doc.load_xml("<r/>").unwrap();
        assert_eq!(doc.version, None);
        assert_eq!(doc.encoding, None);
        assert!(doc.root_element().is_some());
    }

    #[test]
    fn test_load_xml_error_keeps_document() {
        let mut doc = Document::with_declaration("1.0", Some("UTF-8"));
        assert!(doc.load_xml("<r>").is_err());
        assert_eq!(doc.encoding.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_normalize_merges_adjacent_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_node(element("r"));
        doc.append_child(root, r);
        for part in ["ab", "", "cd", "ef"] {
            let t = doc.create_node(text(part));
            doc.append_child(r, t);
        }
        let e = doc.create_node(element("e"));
        doc.append_child(r, e);
        let t = doc.create_node(text("gh"));
        doc.append_child(r, t);

        doc.normalize_document();

        let kids: Vec<NodeId> = doc.children(r).collect();
        assert_eq!(kids.len(), 3);
        assert_eq!(doc.node_text(kids[0]), Some("abcdef"));
        assert_eq!(doc.node_text(kids[2]), Some("gh"));
    }

    #[test]
    fn test_normalize_expands_entity_refs() {
        let mut doc =
            Document::parse_str("<!DOCTYPE r [<!ENTITY e \"EE\">]><r>a&e;b<x>&e;</x></r>")
                .unwrap();
        doc.normalize_document();
        let r = doc.root_element().unwrap();
        let first = doc.first_child(r).unwrap();
        assert_eq!(doc.node_text(first), Some("aEEb"));
        assert!(doc
            .descendants(doc.root())
            .all(|id| !matches!(doc.node(id).kind, NodeKind::EntityRef { .. })));
    }

    #[test]
    fn test_normalize_keeps_cdata_separate() {
        let mut doc = Document::parse_str("<r>a<![CDATA[b]]>c</r>").unwrap();
        doc.normalize_document();
        let r = doc.root_element().unwrap();
        assert_eq!(doc.children(r).count(), 3);
    }
}
