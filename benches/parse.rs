use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use textgrid::config::EngineConfig;
use textgrid::loader::ParseCoordinator;
use textgrid::parser::{parse, parse_with_progress, rows_to_text};
use tokio::runtime::Runtime;

/// Account-dump style text: id, user, mail, status with some ragged rows
fn generate_text(lines: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let statuses = ["active", "locked", "expired", "pending"];
    let mut out = String::with_capacity(lines * 48);

    for i in 0..lines {
        let user: String = (0..rng.gen_range(4..12))
            .map(|_| rng.gen_range(b'a'..=b'z') as char)
            .collect();
        let status = statuses[rng.gen_range(0..statuses.len())];
        if rng.gen_ratio(1, 20) {
            // Short row, padded by the parser
            out.push_str(&format!("{i}----{user}\n"));
        } else {
            out.push_str(&format!(
                " {i} ----{user}----{user}@example.com----{status}\n"
            ));
        }
        if rng.gen_ratio(1, 50) {
            out.push_str("   \n");
        }
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(3));

    for &lines in &[1_000usize, 50_000, 250_000] {
        let text = generate_text(lines, 42);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("plain", lines), &text, |b, text| {
            b.iter(|| black_box(parse(text, "----")));
        });

        group.bench_with_input(BenchmarkId::new("with_progress", lines), &text, |b, text| {
            let cancel = AtomicBool::new(false);
            b.iter(|| {
                let mut reports = 0usize;
                let outcome = parse_with_progress(text, "----", 5_000, &cancel, |_| reports += 1);
                black_box((outcome, reports))
            });
        });
    }

    group.finish();
}

fn bench_rows_to_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("rows_to_text");
    group.sample_size(10);

    let rows = parse(&generate_text(50_000, 7), "----");
    group.bench_function("50000_rows", |b| {
        b.iter(|| black_box(rows_to_text(&rows, "----")));
    });

    group.finish();
}

fn bench_background_parse(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("background_parse");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let text: Arc<str> = generate_text(250_000, 11).into();
    let mut coordinator = rt.block_on(async { ParseCoordinator::spawn(EngineConfig::default()) });

    group.bench_function("250000_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                coordinator
                    .submit(Arc::clone(&text), "----")
                    .await
                    .unwrap();
                let outcome = coordinator.finish(|_| ControlFlow::Continue(())).await.unwrap();
                black_box(outcome)
            })
        });
    });

    group.finish();
    rt.block_on(coordinator.shutdown());
}

criterion_group!(benches, bench_parse, bench_rows_to_text, bench_background_parse);
criterion_main!(benches);
