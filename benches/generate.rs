//! Generation and checking throughput.
//!
//! Run with: cargo bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use stdprop::generator::{DrawSource, GenConfig, generate, replay};
use stdprop::grammar::python;
use stdprop::lexer::{tokenize, untokenize};
use stdprop::Registry;

fn bench_generate_module(c: &mut Criterion) {
    let g = python::grammar().unwrap();
    let config = GenConfig::default();
    let mut seed = 0u64;
    c.bench_function("generate_module", |b| {
        b.iter(|| {
            seed += 1;
            generate(&g, black_box(seed), &config)
        })
    });
}

fn bench_replay_module(c: &mut Criterion) {
    let g = python::grammar().unwrap();
    let config = GenConfig::default();
    let candidate = generate(&g, 42, &config).unwrap();
    c.bench_function("replay_module", |b| {
        b.iter(|| replay(&g, black_box(&candidate.trace), &config))
    });
}

fn bench_tokenize_round_trip(c: &mut Criterion) {
    let g = python::grammar().unwrap();
    let config = GenConfig::default().with_budget(400);
    let source: String = (0..20).map(|seed| generate(&g, seed, &config).unwrap().value).collect();
    c.bench_function("tokenize_round_trip", |b| {
        b.iter(|| untokenize(&tokenize(black_box(&source)).unwrap()))
    });
}

fn bench_check_builtins(c: &mut Criterion) {
    let registry = Registry::builtin().unwrap();
    let config = GenConfig::default();
    let mut group = c.benchmark_group("check");
    for id in ["json.round_trip", "time.zone_offset_differential", "regex.match_by_construction"] {
        let property = registry.properties.get(id).unwrap();
        let mut seed = 0u64;
        group.bench_function(id, |b| {
            b.iter(|| {
                seed += 1;
                property.check(DrawSource::random(seed, config.bias), &config)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_generate_module,
    bench_replay_module,
    bench_tokenize_round_trip,
    bench_check_builtins,
);
criterion_main!(benches);
