//! Mapping throughput on a synthetic compile of a large buffer.
//!
//! Measures:
//! 1. Source Map v3 decoding into the per-line table
//! 2. Host → dialect range mapping (diagnostics path)
//! 3. Dialect → host line lookup (completion path, full scan)

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use brewline::mapper::{dialect_to_host, host_to_dialect};
use brewline::sourcemap::SourceMap;
use tower_lsp::lsp_types::{Position, Range};

/// VLQ `mappings` for `n` host lines, each mapping host column 0 to the
/// next dialect line at column 2. Generated lines are interleaved every
/// fifth line.
fn synthetic_mappings(n: usize) -> String {
    let mut rows = Vec::with_capacity(n);
    let mut first = true;
    for i in 0..n {
        if i % 5 == 4 {
            rows.push(String::new());
            continue;
        }
        // [host col, source idx, dialect line delta, dialect col delta]
        rows.push(if first { "AAAE".to_string() } else { "AACA".to_string() });
        first = false;
    }
    rows.join(";")
}

fn dialect_text(n: usize) -> String {
    (0..n).map(|i| format!("  value{} = {}\n", i, i)).collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for n in [1_000, 10_000] {
        let mappings = synthetic_mappings(n);
        group.bench_function(format!("{}_lines", n), |b| {
            b.iter(|| SourceMap::from_v3_mappings(black_box(&mappings)).unwrap())
        });
    }
    group.finish();
}

fn bench_host_to_dialect(c: &mut Criterion) {
    let map = SourceMap::from_v3_mappings(&synthetic_mappings(10_000)).unwrap();
    let text = dialect_text(10_000);
    c.bench_function("host_to_dialect_10k", |b| {
        b.iter(|| {
            for line in (0..10_000).step_by(97) {
                let host = Range::new(Position::new(line, 0), Position::new(line, 0));
                let _ = black_box(host_to_dialect(&map, host, &text));
            }
        })
    });
}

fn bench_dialect_to_host(c: &mut Criterion) {
    let map = SourceMap::from_v3_mappings(&synthetic_mappings(10_000)).unwrap();
    c.bench_function("dialect_to_host_last_line_10k", |b| {
        b.iter(|| dialect_to_host(&map, black_box(Position::new(7_999, 2))))
    });
}

criterion_group!(
    benches,
    bench_decode,
    bench_host_to_dialect,
    bench_dialect_to_host
);
criterion_main!(benches);
