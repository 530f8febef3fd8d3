#![no_main]
use domcompare::{canonicalize, Comparator, CompareOptions, Document, DomNodeComparator, Processed};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse -> canonicalize should never panic, and a parsed document
        // always compares equal to itself.
        if let Ok(doc) = Document::parse_str(s) {
            let _ = canonicalize(doc.as_node(), false);
            if let Err(err) = DomNodeComparator.assert_equals(
                doc.as_node().into(),
                doc.as_node().into(),
                &CompareOptions::default(),
                &mut Processed::default(),
            ) {
                assert!(
                    !matches!(err, domcompare::CompareError::Mismatch(_)),
                    "document differs from itself"
                );
            }
        }
    }
});
