//! neat-rules CLI - Evolve rule sets toward a target sequence from JSON configuration.

use std::time::Instant;

use neat_rules::{EngineConfig, Genome, Simulation};

/// Default target when none is given on the command line.
const DEFAULT_TARGET: &str = "AUGGC|CAUGA";

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [target]", args[0]);
        eprintln!();
        eprintln!("Evolve rule sets whose best rule matches a target sequence.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to engine configuration file");
        eprintln!("  target       Target symbol sequence (default: {DEFAULT_TARGET})");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config = EngineConfig::from_json_file(&args[1]).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });
    let target: Vec<char> = args
        .get(2)
        .map_or(DEFAULT_TARGET, String::as_str)
        .chars()
        .collect();

    println!("neat-rules");
    println!("==========");
    println!("Population: {}", config.population.size);
    println!("Generations: {}", config.population.max_generations);
    println!("Target species: {}", config.speciation.target_num_species);
    println!("Target: {}", target.iter().collect::<String>());
    println!();

    let mut sim = Simulation::new(config).unwrap_or_else(|e| {
        eprintln!("Error creating simulation: {}", e);
        std::process::exit(1);
    });

    let fitness = |genome: &Genome| target_match(genome, &target);
    let start = Instant::now();

    let result = sim
        .run_with_callback(&fitness, |snapshot| {
            let best = snapshot
                .fittest
                .as_ref()
                .and_then(|f| f.fitness)
                .unwrap_or(0.0);
            println!(
                "  Generation {}: best={:.4}, species={}, threshold={:.3}",
                snapshot.generation, best, snapshot.num_species, snapshot.compat_threshold
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Evolution failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!("Best fitness: {:.4}", result.stats.best_fitness);
    println!("Extinctions: {}", result.stats.extinctions);
    if let Some(fittest) = &result.fittest {
        println!("Fittest genome {}:", fittest.genome_id);
        for (id, rule) in &fittest.rules {
            println!("  {id}: {rule}");
        }
    }
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());
}

/// Fraction of target positions matched by the best rule in the genome.
fn target_match(genome: &Genome, target: &[char]) -> f32 {
    let longest = |rule: &[char]| rule.len().max(target.len()).max(1) as f32;
    genome
        .rules()
        .values()
        .map(|rule| {
            let hits = rule
                .sequence
                .iter()
                .zip(target)
                .filter(|(a, b)| a == b)
                .count();
            hits as f32 / longest(rule.sequence.as_slice())
        })
        .fold(0.0, f32::max)
}

fn print_example_config() {
    let config = EngineConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
