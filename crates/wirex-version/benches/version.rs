use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wirex_version::{Version, VersionRange};

fn bench_parse_version(c: &mut Criterion) {
    c.bench_function("parse version", |b| {
        b.iter(|| Version::parse(black_box("3.18.400.v20240115-1234")))
    });
}

fn bench_parse_range(c: &mut Criterion) {
    c.bench_function("parse range", |b| {
        b.iter(|| VersionRange::parse(black_box("[3.18.0,4.0.0)")))
    });
}

fn bench_includes(c: &mut Criterion) {
    let range = VersionRange::parse("[1.0,2.0)").unwrap();
    let versions: Vec<Version> = (0..64)
        .map(|i| Version::new(1, i, i * 3))
        .collect();

    c.bench_function("range includes", |b| {
        b.iter(|| versions.iter().filter(|v| range.includes(black_box(v))).count())
    });
}

criterion_group!(benches, bench_parse_version, bench_parse_range, bench_includes);
criterion_main!(benches);
