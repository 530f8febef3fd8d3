//! Equality comparison of values, with a comparator for DOM nodes.
//!
//! A [`Comparator`] first declares which pairs of [`Value`]s it can handle
//! ([`Comparator::accepts`]) and then checks them
//! ([`Comparator::assert_equals`]). A mismatch is reported as a structured
//! [`ComparisonFailure`] that keeps both original values and the textual
//! forms that were compared, so a reporter can print a diff.
//!
//! [`DomNodeComparator`] compares document trees by their canonical
//! serialization (see [`canonicalize`]): attribute order, redundant
//! namespace declarations, comments, CDATA wrapping and indentation between
//! elements do not count as differences.
//!
//! # Examples
//!
//! ```
//! use domcompare::compare::{Comparator, CompareOptions, DomNodeComparator, Processed, Value};
//! use domcompare::Document;
//!
//! let expected = Document::parse_str("<root><a x=\"1\" y=\"2\"/></root>").unwrap();
//! let actual = Document::parse_str("<root>\n  <a y=\"2\" x=\"1\"></a>\n</root>").unwrap();
//!
//! let comparator = DomNodeComparator;
//! let (e, a) = (Value::from(expected.as_node()), Value::from(actual.as_node()));
//! assert!(comparator.accepts(&e, &a));
//! comparator
//!     .assert_equals(e, a, &CompareOptions::default(), &mut Processed::default())
//!     .unwrap();
//! ```

mod dom;
mod failure;

pub use dom::{canonicalize, DomNodeComparator};
pub use failure::{CompareError, ComparisonFailure, DomKind};

use std::collections::HashSet;

use crate::tree::{Document, NodeId, NodeRef};

/// A value handed to a comparator.
///
/// Only [`Value::Node`] is understood by [`DomNodeComparator`]; the scalar
/// variants exist so callers can hand mixed values to a set of comparators
/// and let `accepts` pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// A document (when the handle is the document node) or a sub-tree.
    Node(NodeRef<'a>),
    Str(&'a str),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl<'a> Value<'a> {
    /// Returns the node handle, if this value is a node.
    #[must_use]
    pub fn as_node(&self) -> Option<NodeRef<'a>> {
        match self {
            Self::Node(node) => Some(*node),
            _ => None,
        }
    }

    /// Returns `true` if this value is a node.
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

impl<'a> From<NodeRef<'a>> for Value<'a> {
    fn from(node: NodeRef<'a>) -> Self {
        Self::Node(node)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value<'_> {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value<'_> {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Options shared by all comparators.
///
/// `delta` and `canonicalize` are meant for numeric and collection
/// comparators; the DOM comparator ignores them.
///
/// ```
/// use domcompare::compare::CompareOptions;
///
/// let opts = CompareOptions::default().ignore_case(true).delta(0.5);
/// assert!(opts.ignore_case);
/// assert!(!opts.canonicalize);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompareOptions {
    /// Allowed numerical distance between two values.
    pub delta: f64,
    /// Sort collections before comparing them.
    pub canonicalize: bool,
    /// Case-sensitivity switch, see [`canonicalize`] for how the DOM
    /// comparator applies it.
    pub ignore_case: bool,
}

impl CompareOptions {
    #[must_use]
    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    #[must_use]
    pub fn canonicalize(mut self, yes: bool) -> Self {
        self.canonicalize = yes;
        self
    }

    #[must_use]
    pub fn ignore_case(mut self, yes: bool) -> Self {
        self.ignore_case = yes;
        self
    }
}

/// Identity of a node: its document's address and its id.
type NodeKey = (usize, NodeId);

/// Pairs of values already visited during a recursive comparison.
///
/// Comparators that descend into containers record pairs here to stop
/// on cycles. Only node values have an identity.
#[derive(Debug, Clone, Default)]
pub struct Processed {
    pairs: HashSet<(NodeKey, NodeKey)>,
}

impl Processed {
    /// Records a pair. Returns `false` if it was already recorded or if
    /// either value has no identity.
    pub fn insert(&mut self, expected: &Value<'_>, actual: &Value<'_>) -> bool {
        match (node_key(expected), node_key(actual)) {
            (Some(e), Some(a)) => self.pairs.insert((e, a)),
            _ => false,
        }
    }

    /// Returns `true` if the pair was recorded before.
    #[must_use]
    pub fn contains(&self, expected: &Value<'_>, actual: &Value<'_>) -> bool {
        match (node_key(expected), node_key(actual)) {
            (Some(e), Some(a)) => self.pairs.contains(&(e, a)),
            _ => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn node_key(value: &Value<'_>) -> Option<NodeKey> {
    value
        .as_node()
        .map(|node| (node.document() as *const Document as usize, node.id()))
}

/// A strategy for checking two values for equality.
pub trait Comparator {
    /// Returns `true` if this comparator can compare the two values.
    fn accepts(&self, expected: &Value<'_>, actual: &Value<'_>) -> bool;

    /// Checks the two values for equality.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Mismatch`] when the values differ,
    /// [`CompareError::Parse`] when a value could not be brought into
    /// comparable form, and [`CompareError::Unsupported`] when the values
    /// are not ones this comparator [accepts](Comparator::accepts).
    fn assert_equals<'a>(
        &self,
        expected: Value<'a>,
        actual: Value<'a>,
        options: &CompareOptions,
        processed: &mut Processed,
    ) -> Result<(), CompareError<'a>>;
}
