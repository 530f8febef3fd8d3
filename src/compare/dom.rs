//! DOM node comparison by canonical serialization.

use super::{Comparator, CompareError, CompareOptions, ComparisonFailure, DomKind, Processed, Value};
use crate::error::ParseError;
use crate::serial::c14n::C14nOptions;
use crate::serial::xml::{serialize_with_options, SerializeOptions};
use crate::tree::{Document, NodeRef};

/// Returns the normalized, whitespace-stable and indented textual form of a
/// node.
///
/// The node is written as Canonical XML without comments, dropping blank text
/// between elements, then parsed back into a fresh document that carries the
/// node's declared version and encoding. That document is normalized and
/// pretty printed with its XML declaration.
///
/// Unless `ignore_case` is `true` the whole text is lowercased. ASCII
/// letters are folded; other characters are kept as they are.
///
/// The canonical form never declares an encoding, so the original one is
/// put back after the re-parse. Nothing checks that it agrees with the
/// re-parsed content.
///
/// # Errors
///
/// Returns `ParseError` if the canonical form of the node is not a
/// well-formed document, as happens for a lone text node.
///
/// # Examples
///
/// ```
/// use domcompare::compare::canonicalize;
/// use domcompare::Document;
///
/// let doc = Document::parse_str("<Root b=\"2\" a=\"1\"><A>Hi</A><!-- x --></Root>").unwrap();
/// assert_eq!(
///     canonicalize(doc.as_node(), false).unwrap(),
///     "<?xml version=\"1.0\"?>\n<root a=\"1\" b=\"2\">\n  <a>hi</a>\n</root>\n"
/// );
/// ```
pub fn canonicalize(node: NodeRef<'_>, ignore_case: bool) -> Result<String, ParseError> {
    let encoding = node.encoding();
    let version = node.xml_version().unwrap_or("1.0");
    let mut document = Document::with_declaration(version, encoding);

    let c14n = node.c14n(&C14nOptions::default().with_comments(false).strip_blanks(true));
    log::trace!("canonical form of {node:?}: {} bytes", c14n.len());

    if !c14n.is_empty() {
        document.load_xml(&c14n)?;
        if let Some(encoding) = encoding {
            document.encoding = Some(encoding.to_string());
        }
    }

    document.normalize_document();
    let text = serialize_with_options(&document, &SerializeOptions::default().indent(true));

    Ok(if ignore_case {
        text
    } else {
        text.to_ascii_lowercase()
    })
}

/// Compares DOM nodes for equality.
///
/// Two nodes are equal when their [`canonicalize`]d forms are identical.
///
/// # Examples
///
/// ```
/// use domcompare::compare::{Comparator, CompareOptions, DomNodeComparator, Processed, Value};
/// use domcompare::Document;
///
/// let expected = Document::parse_str("<root><a>X</a></root>").unwrap();
/// let actual = Document::parse_str("<root><a>Y</a></root>").unwrap();
///
/// let err = DomNodeComparator
///     .assert_equals(
///         Value::from(expected.as_node()),
///         Value::from(actual.as_node()),
///         &CompareOptions::default(),
///         &mut Processed::default(),
///     )
///     .unwrap_err();
/// assert_eq!(err.to_string(), "Failed asserting that two DOM documents are equal.\n");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomNodeComparator;

impl Comparator for DomNodeComparator {
    fn accepts(&self, expected: &Value<'_>, actual: &Value<'_>) -> bool {
        expected.is_node() && actual.is_node()
    }

    fn assert_equals<'a>(
        &self,
        expected: Value<'a>,
        actual: Value<'a>,
        options: &CompareOptions,
        _processed: &mut Processed,
    ) -> Result<(), CompareError<'a>> {
        let (Some(expected_node), Some(actual_node)) = (expected.as_node(), actual.as_node())
        else {
            return Err(CompareError::Unsupported);
        };

        let expected_as_string = canonicalize(expected_node, options.ignore_case)?;
        let actual_as_string = canonicalize(actual_node, options.ignore_case)?;

        if expected_as_string == actual_as_string {
            return Ok(());
        }

        let kind = if expected_node.is_document() {
            DomKind::Documents
        } else {
            DomKind::Nodes
        };
        log::debug!("DOM {kind} differ");
        Err(ComparisonFailure::dom(
            expected,
            actual,
            expected_as_string,
            actual_as_string,
            kind,
        )
        .into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(xml: &str) -> Document {
        Document::parse_str(xml).unwrap()
    }

    fn compare<'a>(
        expected: NodeRef<'a>,
        actual: NodeRef<'a>,
        ignore_case: bool,
    ) -> Result<(), CompareError<'a>> {
        DomNodeComparator.assert_equals(
            expected.into(),
            actual.into(),
            &CompareOptions::default().ignore_case(ignore_case),
            &mut Processed::default(),
        )
    }

    #[test]
    fn test_canonicalize_document() {
        let d = doc("<root><a x=\"1\"/><b>text</b></root>");
        assert_eq!(
            canonicalize(d.as_node(), true).unwrap(),
            "<?xml version=\"1.0\"?>\n<root>\n  <a x=\"1\"/>\n  <b>text</b>\n</root>\n"
        );
    }

    #[test]
    fn test_canonicalize_keeps_encoding_and_version() {
        let d = doc("<?xml version=\"1.0\" encoding=\"UTF-8\"?><r/>");
        assert_eq!(
            canonicalize(d.as_node(), true).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r/>\n"
        );
    }

    #[test]
    fn test_canonicalize_resets_version_after_reparse() {
        let d = doc("<?xml version=\"1.1\"?><r/>");
        assert_eq!(
            canonicalize(d.as_node(), true).unwrap(),
            "<?xml version=\"1.0\"?>\n<r/>\n"
        );
    }

    #[test]
    fn test_canonicalize_lowercases_by_default() {
        let d = doc("<?xml version=\"1.0\" encoding=\"UTF-8\"?><R A=\"V\">Text</R>");
        assert_eq!(
            canonicalize(d.as_node(), false).unwrap(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<r a=\"v\">text</r>\n"
        );
    }

    #[test]
    fn test_canonicalize_subtree() {
        let d = doc("<root><child k=\"v\"><x/></child></root>");
        let child = d.first_child(d.root_element().unwrap()).unwrap();
        assert_eq!(
            canonicalize(d.node_ref(child), true).unwrap(),
            "<?xml version=\"1.0\"?>\n<child k=\"v\">\n  <x/>\n</child>\n"
        );
    }

    #[test]
    fn test_canonicalize_empty_document() {
        let d = Document::with_declaration("1.0", Some("ISO-8859-1"));
        assert_eq!(
            canonicalize(d.as_node(), true).unwrap(),
            "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n"
        );
    }

    #[test]
    fn test_canonicalize_text_node_fails() {
        let d = doc("<r>just text</r>");
        let text = d.first_child(d.root_element().unwrap()).unwrap();
        assert!(canonicalize(d.node_ref(text), false).is_err());
    }

    #[test]
    fn test_accepts_only_nodes() {
        let d = doc("<r/>");
        let node = Value::from(d.as_node());
        assert!(DomNodeComparator.accepts(&node, &node));
        assert!(!DomNodeComparator.accepts(&node, &Value::Str("<r/>")));
        assert!(!DomNodeComparator.accepts(&Value::Null, &node));
    }

    #[test]
    fn test_equal_documents() {
        let a = doc("<root><a/></root>");
        let b = doc("<root><a /></root>");
        compare(a.as_node(), b.as_node(), false).unwrap();
    }

    #[test]
    fn test_mismatch_carries_canonical_strings() {
        let a = doc("<root><a>X</a></root>");
        let b = doc("<root><a>Y</a></root>");
        let err = compare(a.as_node(), b.as_node(), true).unwrap_err();
        let failure = err.as_failure().unwrap();
        assert_eq!(failure.kind(), DomKind::Documents);
        assert_eq!(
            failure.expected_as_string(),
            "<?xml version=\"1.0\"?>\n<root>\n  <a>X</a>\n</root>\n"
        );
        assert_eq!(
            failure.actual_as_string(),
            "<?xml version=\"1.0\"?>\n<root>\n  <a>Y</a>\n</root>\n"
        );
        assert_eq!(failure.expected(), Value::Node(a.as_node()));
        assert_eq!(failure.actual(), Value::Node(b.as_node()));
    }

    #[test]
    fn test_mismatch_between_subtrees_says_nodes() {
        let a = doc("<r><a/></r>");
        let b = doc("<r><b/></r>");
        let err = compare(
            a.node_ref(a.root_element().unwrap()),
            b.node_ref(b.root_element().unwrap()),
            false,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed asserting that two DOM nodes are equal.\n");
    }

    #[test]
    fn test_scalar_values_are_unsupported() {
        let err = DomNodeComparator
            .assert_equals(
                Value::Int(1),
                Value::Int(1),
                &CompareOptions::default(),
                &mut Processed::default(),
            )
            .unwrap_err();
        assert!(matches!(err, CompareError::Unsupported));
    }

    #[test]
    fn test_processed_is_untouched() {
        let a = doc("<r/>");
        let mut processed = Processed::default();
        DomNodeComparator
            .assert_equals(
                a.as_node().into(),
                a.as_node().into(),
                &CompareOptions::default(),
                &mut processed,
            )
            .unwrap();
        assert!(processed.is_empty());
    }
}
