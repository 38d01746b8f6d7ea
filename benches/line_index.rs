use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rfscope::view::{LazyLineParser, VirtualWindow};
use std::hint::black_box;
use std::sync::Arc;

fn document(lines: usize) -> Arc<str> {
    let text: String = (0..lines)
        .map(|n| format!("    let value_{n} = compute({n}, \"some text\"); // trailing\n"))
        .collect();
    Arc::from(text)
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_index");
    for lines in [10_000usize, 100_000] {
        let text = document(lines);

        group.bench_with_input(BenchmarkId::new("build", lines), &text, |b, text| {
            b.iter(|| LazyLineParser::new(Arc::clone(text), 2000).line_count());
        });

        let parser = LazyLineParser::new(Arc::clone(&text), 2000);
        group.bench_with_input(BenchmarkId::new("chunk_from_middle", lines), &parser, |b, parser| {
            let start = lines / 2;
            b.iter(|| parser.get_lines(black_box(start), black_box(start + 50)).len());
        });

        group.bench_with_input(BenchmarkId::new("split_eager", lines), &text, |b, text| {
            b.iter(|| text.lines().count());
        });
    }
    group.finish();

    c.bench_function("virtual_window", |b| {
        b.iter(|| VirtualWindow::compute(black_box(123_456), 40, 1_000_000, 1, 10));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
