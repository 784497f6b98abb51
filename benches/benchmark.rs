use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use lazymap::{DataType, Model};
use serde_json::json;

pub fn criterion_benchmark(c: &mut Criterion) {
    let post = Model::builder("Post")
        .one("title", DataType::String)
        .one("created_at", DataType::Date)
        .many("updated_at", DataType::Date)
        .is("published")
        .build();
    let raw = json!({
        "title": "Hello",
        "createdAt": "2015-07-27",
        "updatedAt": ["2015-01-01", "2015-01-02", "2015-01-03"],
        "published": true
    });

    c.bench_function("first read", |b| {
        b.iter_batched(
            || post.from_record(raw.clone()).unwrap().unwrap(),
            |mapped| black_box(mapped.get("updated_at").unwrap()),
            BatchSize::SmallInput,
        )
    });

    let mapped = post.from_record(raw.clone()).unwrap().unwrap();
    mapped.get("updated_at").unwrap();
    c.bench_function("memoized read", |b| {
        b.iter(|| black_box(mapped.get("updated_at").unwrap()))
    });

    c.bench_function("full dump", |b| {
        b.iter_batched(
            || post.from_record(raw.clone()).unwrap().unwrap(),
            |mapped| black_box(mapped.to_record().unwrap()),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
