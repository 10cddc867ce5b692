#![allow(missing_docs)]
//! Benchmarks for the ISIS subfield codec and record conversion.
//!
//! Uses Criterion.rs for statistical analysis.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use isisdm::subfield::{parse, serialize};
use isisdm::{CompositeField, FieldDescriptor, FieldInput, Record, RecordSchema, SubfieldKeys};
use std::sync::Arc;

const AUTHOR: &str = "^lHofstadter^fDouglas R.^rauthor^1Indiana University^2Bloomington";

fn long_field() -> String {
    (0..200)
        .map(|i| format!("^{}segment number {i}", char::from(b'a' + (i % 26) as u8)))
        .collect()
}

/// Benchmark parsing a typical author field.
fn benchmark_parse_author(c: &mut Criterion) {
    c.bench_function("parse_author", |b| b.iter(|| parse(black_box(AUTHOR), None)));
}

/// Benchmark parsing with a restricted key set.
fn benchmark_parse_recognized_keys(c: &mut Criterion) {
    let keys = SubfieldKeys::new("fl").unwrap();
    c.bench_function("parse_author_recognized_keys", |b| {
        b.iter(|| parse(black_box(AUTHOR), Some(&keys)));
    });
}

/// Benchmark parsing and re-serializing a field with 200 subfields.
fn benchmark_roundtrip_long(c: &mut Criterion) {
    let raw = long_field();
    c.bench_function("roundtrip_200_subfields", |b| {
        b.iter(|| serialize(&parse(black_box(&raw), None)));
    });
}

/// Benchmark record construction and structure conversion.
fn benchmark_record_structure(c: &mut Criterion) {
    let schema = Arc::new(
        RecordSchema::builder("Article")
            .field(FieldDescriptor::text("title").required())
            .field(FieldDescriptor::multi_composite_text("authors").subkeys("flr"))
            .field(FieldDescriptor::boolean("peer_reviewed"))
            .build()
            .unwrap(),
    );
    let authors: Vec<&str> = std::iter::repeat(AUTHOR).take(10).collect();

    c.bench_function("record_to_structure_and_back", |b| {
        b.iter(|| {
            let record = Record::new(
                Arc::clone(&schema),
                vec![
                    ("title", FieldInput::from("Godel, Escher, Bach")),
                    ("authors", authors.clone().into()),
                    ("peer_reviewed", true.into()),
                ],
            )
            .unwrap();
            let structure = record.to_structure();
            Record::from_structure(Arc::clone(&schema), black_box(&structure)).unwrap()
        });
    });
}

/// Benchmark composite lookups.
fn benchmark_composite_get(c: &mut Criterion) {
    let field = CompositeField::parse(AUTHOR, None);
    c.bench_function("composite_get", |b| {
        b.iter(|| field.get(black_box('2')).map(str::len));
    });
}

criterion_group!(
    benches,
    benchmark_parse_author,
    benchmark_parse_recognized_keys,
    benchmark_roundtrip_long,
    benchmark_record_structure,
    benchmark_composite_get
);
criterion_main!(benches);
