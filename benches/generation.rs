//! Benchmarks for regularized evolution.

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use regevo::{
    compute::{
        evolution::{Features, Generator, Population, RandomSource, normalized_diversity, score_population},
        synthetic::{HistogramEvaluator, InstructionMutator, RandomProgramGenerator},
    },
    schema::{EvolutionConfig, RunMode, SyntheticConfig},
    store::MemoryStore,
    RegularizedEvolution,
};

fn random_population(size: usize) -> Population {
    let mut generator = RandomProgramGenerator::new(SyntheticConfig::default());
    let mut rng = RandomSource::new(0);
    let mut population = Population::new(size);
    for i in 0..size {
        let candidate = Arc::new(generator.new_seed_candidate(&mut rng));
        population.replace(i, candidate, 0.0, None);
    }
    population
}

fn bench_diversity(c: &mut Criterion) {
    let mut group = c.benchmark_group("diversity");

    for size in [100, 500, 1000] {
        let mut population = random_population(size);
        let features: Vec<Features> = population
            .slots()
            .iter()
            .map(|s| Features::of(&s.candidate))
            .collect();

        group.bench_with_input(BenchmarkId::new("normalized", size), &size, |b, _| {
            b.iter(|| normalized_diversity(black_box(&features)));
        });
        group.bench_with_input(BenchmarkId::new("score_population", size), &size, |b, _| {
            b.iter(|| score_population(black_box(&mut population)));
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");

    for (name, mode) in [
        ("standard", RunMode::Standard),
        ("hurdles", RunMode::Hurdles),
        ("quality_diversity", RunMode::QualityDiversity),
        ("map_elites", RunMode::map_elites()),
    ] {
        let config = EvolutionConfig {
            population_size: 100,
            mode,
            random_seed: Some(1),
            ..Default::default()
        };
        let synthetic = SyntheticConfig::default();
        let mut engine = RegularizedEvolution::new(
            config,
            RandomProgramGenerator::new(synthetic.clone()),
            InstructionMutator::new(synthetic.clone()),
            HistogramEvaluator::new(&synthetic),
            MemoryStore::default(),
        )
        .unwrap();
        engine.init();

        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| engine.run(black_box(1), Duration::MAX));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diversity, bench_generation);
criterion_main!(benches);
