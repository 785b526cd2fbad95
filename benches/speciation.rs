//! Benchmarks for speciation and generation steps.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use neat_rules::{
    evolution::{EvolutionRng, Genome, IdAllocator, Population, Simulation},
    schema::{EngineConfig, PopulationConfig},
};

fn config(size: usize) -> EngineConfig {
    EngineConfig {
        population: PopulationConfig {
            size,
            ..Default::default()
        },
        random_seed: Some(42),
        ..Default::default()
    }
}

fn bench_speciate(c: &mut Criterion) {
    let mut group = c.benchmark_group("speciate");

    for size in [50, 100, 200, 400] {
        let config = config(size);
        let mut ids = IdAllocator::new();
        let mut rng = EvolutionRng::new(42);
        let mut population = Population::random(&config, &mut ids, &mut rng);
        population.compat_threshold = 0.3;

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                population.speciate(black_box(&mut ids));
            });
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    let fitness = |genome: &Genome| 1.0 / (1.0 + genome.len() as f32);

    for size in [50, 100, 200] {
        let Ok(mut sim) = Simulation::new(config(size)) else {
            continue;
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                sim.evaluate(&fitness);
                let _ = black_box(sim.next_generation());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_speciate, bench_generation);
criterion_main!(benches);
