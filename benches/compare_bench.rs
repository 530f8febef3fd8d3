//! Benchmarks for parsing, canonicalization and DOM comparison.
//!
//! Run with: `cargo bench --bench compare_bench`
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use domcompare::serial::c14n::C14nOptions;
use domcompare::{
    canonicalize, Comparator, CompareOptions, Document, DomNodeComparator, Processed, Value,
};

/// Generates a document with `records` records, pretty printed or compact
/// and with attributes in reverse order for the compact form.
fn make_records(records: usize, pretty: bool) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    xml.push_str("<database xmlns:db=\"urn:example:db\">");
    for i in 0..records {
        if pretty {
            let _ = write!(
                xml,
                "\n  <db:record id=\"{i}\" status=\"active\" priority=\"{}\">\
                 \n    <name>Record {i}</name>\
                 \n    <value>{}</value>\
                 \n    <!-- record {i} -->\
                 \n  </db:record>",
                i % 5,
                i * 42
            );
        } else {
            let _ = write!(
                xml,
                "<db:record priority=\"{}\" status=\"active\" id=\"{i}\">\
                 <name>Record {i}</name><value>{}</value></db:record>",
                i % 5,
                i * 42
            );
        }
    }
    xml.push_str("\n</database>\n");
    xml
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for records in [10, 1000] {
        let xml = make_records(records, true);
        group.throughput(criterion::Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(records), &xml, |b, xml| {
            b.iter(|| Document::parse_str(black_box(xml)));
        });
    }
    group.finish();
}

fn bench_c14n(c: &mut Criterion) {
    let doc = Document::parse_str(&make_records(1000, true)).expect("parse failed");
    let opts = C14nOptions::default().with_comments(false).strip_blanks(true);
    c.bench_function("c14n_1000_records", |b| {
        b.iter(|| black_box(doc.as_node()).c14n(&opts));
    });
}

fn bench_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalize");
    for records in [10, 1000] {
        let doc = Document::parse_str(&make_records(records, true)).expect("parse failed");
        group.bench_with_input(BenchmarkId::from_parameter(records), &doc, |b, doc| {
            b.iter(|| canonicalize(black_box(doc.as_node()), false));
        });
    }
    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    for records in [10, 1000] {
        let expected = Document::parse_str(&make_records(records, true)).expect("parse failed");
        let actual = Document::parse_str(&make_records(records, false)).expect("parse failed");
        group.bench_function(BenchmarkId::new("equal", records), |b| {
            b.iter(|| {
                DomNodeComparator
                    .assert_equals(
                        Value::from(expected.as_node()),
                        Value::from(actual.as_node()),
                        &CompareOptions::default(),
                        &mut Processed::default(),
                    )
                    .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(parsing, bench_parse);

criterion_group!(canonical, bench_c14n, bench_canonicalize);

criterion_group!(comparison, bench_compare);

criterion_main!(parsing, canonical, comparison);
