//! # domcompare
//!
//! Equality comparison of XML document trees by canonical form.
//!
//! Two trees compare equal when they only differ in attribute order,
//! redundant namespace declarations, comments, CDATA wrapping, whitespace
//! between elements or, unless asked otherwise, letter case. The crate
//! carries the small XML stack the comparison runs on: an arena tree, a
//! strict XML 1.0 parser, a pretty printer and a Canonical XML serializer.
//!
//! ## Quick Start
//!
//! ```
//! use domcompare::{Comparator, CompareOptions, Document, DomNodeComparator, Processed, Value};
//!
//! let expected = Document::parse_str("<root><a/></root>").unwrap();
//! let actual = Document::parse_str("<root><a /></root>").unwrap();
//!
//! DomNodeComparator
//!     .assert_equals(
//!         Value::from(expected.as_node()),
//!         Value::from(actual.as_node()),
//!         &CompareOptions::default(),
//!         &mut Processed::default(),
//!     )
//!     .unwrap();
//! ```

pub mod compare;
pub mod encoding;
pub mod error;
pub mod parser;
pub mod serial;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use compare::{
    canonicalize, Comparator, CompareError, CompareOptions, ComparisonFailure, DomKind,
    DomNodeComparator, Processed, Value,
};
pub use error::ParseError;
pub use tree::{Attribute, Document, NodeId, NodeKind, NodeRef};
