//! Borrowed node handles.

use std::fmt;

use super::{Document, NodeId, NodeKind};
use crate::serial::c14n::{self, C14nOptions};
use crate::serial::xml;

/// A node of a [`Document`], borrowed together with its owning document.
///
/// A `NodeRef` whose id is the document node stands for the whole document;
/// any other id stands for a sub-tree. Two handles are equal when they point
/// at the same node of the same document instance.
///
/// # Examples
///
/// ```
/// use domcompare::Document;
///
/// let doc = Document::parse_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?><r><a/></r>").unwrap();
/// let whole = doc.as_node();
/// assert!(whole.is_document());
/// assert_eq!(whole.encoding(), Some("UTF-8"));
///
/// let r = doc.node_ref(doc.root_element().unwrap());
/// assert!(!r.is_document());
/// assert_eq!(r.encoding(), None);
/// ```
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(super) fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    /// The document this node belongs to.
    #[must_use]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// The node's id within its document.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns `true` if this handle stands for the whole document.
    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(self.doc.node(self.id).kind, NodeKind::Document)
    }

    /// The declared character encoding. Only whole documents carry one.
    #[must_use]
    pub fn encoding(&self) -> Option<&'a str> {
        if self.is_document() {
            self.doc.encoding.as_deref()
        } else {
            None
        }
    }

    /// The declared XML version. Only whole documents carry one.
    #[must_use]
    pub fn xml_version(&self) -> Option<&'a str> {
        if self.is_document() {
            self.doc.version.as_deref()
        } else {
            None
        }
    }

    /// Serializes the node to Canonical XML.
    ///
    /// A document is canonicalized as a whole; any other node as a subtree.
    #[must_use]
    pub fn c14n(&self, options: &C14nOptions) -> String {
        if self.is_document() {
            c14n::canonicalize(self.doc, options)
        } else {
            c14n::canonicalize_subtree(self.doc, self.id, options)
        }
    }

    /// Serializes the node as plain XML, the way it was parsed.
    ///
    /// Documents include their XML declaration; sub-trees do not.
    #[must_use]
    pub fn to_xml(&self) -> String {
        if self.is_document() {
            xml::serialize(self.doc)
        } else {
            xml::serialize_node(self.doc, self.id)
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("document", &self.is_document())
            .field("name", &self.doc.node_name(self.id))
            .finish()
    }
}
