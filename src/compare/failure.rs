//! Comparison errors and the structured mismatch report.

use std::fmt;

use similar::{ChangeTag, TextDiff};

use super::Value;
use crate::error::ParseError;

/// Whether a failed DOM comparison was between whole documents or between
/// sub-tree nodes. Decided by the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomKind {
    Documents,
    Nodes,
}

impl DomKind {
    /// The plural noun used in failure messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Nodes => "nodes",
        }
    }
}

impl fmt::Display for DomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two values were compared and found different.
///
/// Keeps the caller's original values alongside the textual forms that were
/// actually compared.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonFailure<'a> {
    expected: Value<'a>,
    actual: Value<'a>,
    expected_as_string: String,
    actual_as_string: String,
    kind: DomKind,
    message: String,
}

impl<'a> ComparisonFailure<'a> {
    /// Builds the failure for two DOM values, with the message
    /// `Failed asserting that two DOM {kind} are equal.` and a line feed.
    #[must_use]
    pub fn dom(
        expected: Value<'a>,
        actual: Value<'a>,
        expected_as_string: String,
        actual_as_string: String,
        kind: DomKind,
    ) -> Self {
        Self {
            expected,
            actual,
            expected_as_string,
            actual_as_string,
            kind,
            message: format!("Failed asserting that two DOM {kind} are equal.\n"),
        }
    }

    #[must_use]
    pub fn expected(&self) -> Value<'a> {
        self.expected
    }

    #[must_use]
    pub fn actual(&self) -> Value<'a> {
        self.actual
    }

    /// The canonical text the expected value was compared as.
    #[must_use]
    pub fn expected_as_string(&self) -> &str {
        &self.expected_as_string
    }

    /// The canonical text the actual value was compared as.
    #[must_use]
    pub fn actual_as_string(&self) -> &str {
        &self.actual_as_string
    }

    #[must_use]
    pub fn kind(&self) -> DomKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders a unified diff from the expected to the actual text.
    ///
    /// Returns an empty string when both texts are equal.
    ///
    /// ```
    /// use domcompare::compare::{ComparisonFailure, DomKind, Value};
    ///
    /// let failure = ComparisonFailure::dom(
    ///     Value::Null,
    ///     Value::Null,
    ///     "<a>\n  <b>x</b>\n</a>\n".to_string(),
    ///     "<a>\n  <b>y</b>\n</a>\n".to_string(),
    ///     DomKind::Nodes,
    /// );
    /// let diff = failure.diff();
    /// assert!(diff.starts_with("--- Expected\n+++ Actual\n@@"));
    /// assert!(diff.contains("-  <b>x</b>\n+  <b>y</b>\n"));
    /// ```
    #[must_use]
    pub fn diff(&self) -> String {
        if self.expected_as_string == self.actual_as_string {
            return String::new();
        }
        let diff = TextDiff::from_lines(&self.expected_as_string, &self.actual_as_string);

        let mut out = String::from("--- Expected\n+++ Actual\n");
        for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
            out.push_str(&hunk.header().to_string());
            out.push('\n');
            for change in hunk.iter_changes() {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                out.push(sign);
                out.push_str(&change.to_string_lossy());
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
        out
    }
}

impl fmt::Display for ComparisonFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The error type returned by [`Comparator::assert_equals`].
///
/// [`Comparator::assert_equals`]: super::Comparator::assert_equals
#[derive(Debug, thiserror::Error)]
pub enum CompareError<'a> {
    /// A value could not be brought into comparable form.
    #[error("could not compare DOM values: {0}")]
    Parse(#[from] ParseError),

    /// The values differ.
    #[error("{0}")]
    Mismatch(Box<ComparisonFailure<'a>>),

    /// The comparator was handed values it does not accept.
    #[error("comparator does not accept the given values")]
    Unsupported,
}

impl<'a> CompareError<'a> {
    /// Returns the mismatch report, if this error is one.
    #[must_use]
    pub fn as_failure(&self) -> Option<&ComparisonFailure<'a>> {
        match self {
            Self::Mismatch(failure) => Some(&**failure),
            _ => None,
        }
    }
}

impl<'a> From<ComparisonFailure<'a>> for CompareError<'a> {
    fn from(failure: ComparisonFailure<'a>) -> Self {
        Self::Mismatch(Box::new(failure))
    }
}
