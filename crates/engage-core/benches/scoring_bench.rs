//! Benchmark for the CTS arithmetic hot path (pipeline/cts_decision.rs).
//!
//! The cts_decision node runs on every pipeline invocation that reaches
//! stage 5; it is pure arithmetic, so this exists to confirm it stays
//! negligible next to the LLM round trips around it.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use engage_core::model::RiskLevel;
use engage_core::pipeline::cts_decision;

fn bench_cts_decision(c: &mut Criterion) {
    c.bench_function("cts_decision_auto_post_eligible", |b| {
        b.iter(|| {
            let cts = cts_decision::run(black_box(0.85), black_box(RiskLevel::Low), black_box(0.1), black_box(0));
            black_box(cts);
        });
    });

    c.bench_function("cts_decision_routed_to_review", |b| {
        b.iter(|| {
            let cts = cts_decision::run(black_box(0.4), black_box(RiskLevel::Medium), black_box(0.6), black_box(2));
            black_box(cts);
        });
    });
}

fn bench_cts_decision_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("cts_decision_sweep");

    for cta_level in [0, 1, 2, 3] {
        group.bench_with_input(
            BenchmarkId::from_parameter(cta_level),
            &cta_level,
            |b, &cta_level| {
                b.iter(|| {
                    let cts = cts_decision::run(
                        black_box(0.7),
                        black_box(RiskLevel::Low),
                        black_box(0.2),
                        black_box(cta_level),
                    );
                    black_box(cts);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cts_decision, bench_cts_decision_sweep);
criterion_main!(benches);
