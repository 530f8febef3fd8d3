//! Node type definitions.
//!
//! The `NodeKind` enum represents all node types in an XML document tree.
//! Each variant carries the node-type-specific payload (element name and
//! attributes, text content, and so on).

use super::Attribute;

/// The kind of an XML node and its associated data.
///
/// Navigation links (parent, children, siblings) are stored in `NodeData`,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node. There is exactly one per `Document`.
    Document,

    /// An element node, e.g., `<div class="x">`.
    Element {
        /// The element's local name.
        name: String,
        /// Namespace prefix (e.g., `"svg"` in `svg:rect`), if any.
        prefix: Option<String>,
        /// Namespace URI after resolution, if any.
        namespace: Option<String>,
        /// Attributes on this element, namespace declarations included,
        /// in document order.
        attributes: Vec<Attribute>,
    },

    /// A text node containing character data.
    Text {
        /// The text content (character references already resolved).
        content: String,
    },

    /// A CDATA section, e.g., `<![CDATA[...]]>`.
    CData {
        /// The CDATA content (no escaping applied).
        content: String,
    },

    /// A comment node, e.g., `<!-- ... -->`.
    Comment {
        /// The comment text (without the `<!--` and `-->` delimiters).
        content: String,
    },

    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction {
        /// The PI target (e.g., `"xml-stylesheet"`).
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A reference to an entity declared in the internal DTD subset,
    /// kept unexpanded in the tree (e.g., `&company;`).
    EntityRef {
        /// The entity name (without `&` and `;`).
        name: String,
        /// The entity's replacement text, if it was declared.
        value: Option<String>,
    },

    /// A document type declaration node, e.g., `<!DOCTYPE note [...]>`.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The SYSTEM identifier (URI), if any.
        system_id: Option<String>,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The raw internal subset text between `[` and `]`, if any.
        internal_subset: Option<String>,
    },
}

impl NodeKind {
    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Returns `true` for text nodes consisting solely of XML whitespace.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        match self {
            Self::Text { content } => content
                .bytes()
                .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n')),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank_text() {
        let blank = NodeKind::Text {
            content: " \n\t".to_string(),
        };
        let word = NodeKind::Text {
            content: " x ".to_string(),
        };
        assert!(blank.is_blank_text());
        assert!(!word.is_blank_text());
        assert!(!NodeKind::Comment {
            content: " ".to_string()
        }
        .is_blank_text());
    }

    #[test]
    fn test_is_element() {
        let elem = NodeKind::Element {
            name: "a".to_string(),
            prefix: None,
            namespace: None,
            attributes: Vec::new(),
        };
        assert!(elem.is_element());
        assert!(!NodeKind::Document.is_element());
    }
}
