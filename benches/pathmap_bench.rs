use criterion::{black_box, criterion_group, criterion_main, Criterion};
use url::Url;
use webmirror::pathmap::output_path;

fn bench_output_path(c: &mut Criterion) {
    let root = std::path::PathBuf::from("/tmp/webmirror-bench");
    let u = Url::parse("https://example.com/docs/getting-started?lang=en").unwrap();
    c.bench_function("output_path", |b| {
        b.iter(|| black_box(output_path(black_box(&root), black_box(&u), black_box(Some("text/html")))))
    });
}

fn bench_output_path_extensioned(c: &mut Criterion) {
    let root = std::path::PathBuf::from("/tmp/webmirror-bench");
    let u = Url::parse("https://example.com/assets/app.js").unwrap();
    c.bench_function("output_path_extensioned", |b| {
        b.iter(|| black_box(output_path(black_box(&root), black_box(&u), black_box(None))))
    });
}

criterion_group!(benches, bench_output_path, bench_output_path_extensioned);
criterion_main!(benches);
