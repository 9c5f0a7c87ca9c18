//! Benchmark for the crisis pattern detector (crisis/mod.rs).
//!
//! Per spec §4.2 this must run in constant time relative to the LLM calls
//! around it — microseconds, not milliseconds — since it gates every post
//! that enters risk scoring. This tracks that it stays cheap as patterns
//! are added.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engage_core::crisis;

const CLEAN_TEXT: &str =
    "I've been struggling with staying organized and managing my time lately.";

const CRISIS_TEXT: &str = "I don't want to be alive anymore and I can't take it";

const LEETSPEAK_TEXT: &str = "i w4nt t0 k i l l mys3lf";

const LONG_CLEAN_TEXT: &str = "This is a fairly long post about productivity habits, \
    morning routines, time blocking, and the occasional struggle with procrastination. \
    None of it touches on anything dangerous, it's just a long chunk of ordinary text \
    meant to exercise the regex set against a realistically sized comment body.";

fn bench_detect_clean(c: &mut Criterion) {
    c.bench_function("crisis_detect_clean_text", |b| {
        b.iter(|| {
            let result = crisis::detect(black_box(CLEAN_TEXT));
            black_box(result);
        });
    });
}

fn bench_detect_crisis(c: &mut Criterion) {
    c.bench_function("crisis_detect_crisis_text", |b| {
        b.iter(|| {
            let result = crisis::detect(black_box(CRISIS_TEXT));
            black_box(result);
        });
    });
}

fn bench_detect_leetspeak(c: &mut Criterion) {
    c.bench_function("crisis_detect_leetspeak_text", |b| {
        b.iter(|| {
            let result = crisis::detect(black_box(LEETSPEAK_TEXT));
            black_box(result);
        });
    });
}

fn bench_detect_long_text(c: &mut Criterion) {
    c.bench_function("crisis_detect_long_clean_text", |b| {
        b.iter(|| {
            let result = crisis::detect(black_box(LONG_CLEAN_TEXT));
            black_box(result);
        });
    });
}

criterion_group!(
    benches,
    bench_detect_clean,
    bench_detect_crisis,
    bench_detect_leetspeak,
    bench_detect_long_text,
);
criterion_main!(benches);
