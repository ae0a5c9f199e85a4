//! Regevo CLI - Run regularized evolution from a JSON experiment configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use regevo::{
    compute::synthetic::{HistogramEvaluator, InstructionMutator, RandomProgramGenerator},
    schema::ExperimentConfig,
    store::{EvolutionStore, MemoryStore, SqliteStore},
    RegularizedEvolution,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!("       {} --best <database> [run_id]", args[0]);
        eprintln!();
        eprintln!("Run regularized evolution from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to experiment configuration file");
        eprintln!("  --best       Print the best program stored in a database");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--example" => print_example_config(),
        "--best" => print_best(&args[2..]),
        path => run_experiment(PathBuf::from(path)),
    }
}

fn run_experiment(config_path: PathBuf) {
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: ExperimentConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    let store: Box<dyn EvolutionStore> = match &config.database {
        Some(path) => Box::new(SqliteStore::open(path).unwrap_or_else(|e| {
            eprintln!("Error opening database {}: {}", path.display(), e);
            std::process::exit(1);
        })),
        None => Box::new(MemoryStore::default()),
    };

    let evolution = &config.evolution;
    println!("Regularized Evolution");
    println!("=====================");
    println!("Run id: {}", evolution.migration.run_id);
    println!(
        "Population: {} (tournament {})",
        evolution.population_size, evolution.tournament_size
    );
    println!("Mode: {:?}", evolution.mode);
    println!("Migration probability: {}", evolution.migration.migrate_prob);
    println!("Train steps: {}", config.max_train_steps);
    println!();

    let synthetic = &config.synthetic;
    let mut engine = RegularizedEvolution::new(
        evolution.clone(),
        RandomProgramGenerator::new(synthetic.clone()),
        InstructionMutator::new(synthetic.clone()),
        HistogramEvaluator::new(synthetic),
        store,
    )
    .unwrap_or_else(|e| {
        eprintln!("Error creating engine: {}", e);
        std::process::exit(1);
    });

    let max_time = config
        .max_seconds
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(Duration::MAX);

    let start = Instant::now();
    engine.init();
    let generations = engine.run(config.max_train_steps, max_time);
    let elapsed = start.elapsed();

    if let Err(e) = engine.record_final() {
        log::warn!("Failed to record final result: {}", e);
    }

    println!("Generations: {}", generations);
    println!("Individuals: {}", engine.num_individuals());
    println!(
        "Time: {:.2}s ({:.1} individuals/s)",
        elapsed.as_secs_f32(),
        engine.num_individuals() as f32 / elapsed.as_secs_f32()
    );
    if let Some((best, fitness)) = engine.best() {
        println!();
        println!("Best fitness: {:.6}", fitness);
        print!("{}", best.to_readable());
    }
}

fn print_best(args: &[String]) {
    let Some(path) = args.first() else {
        eprintln!("Usage: regevo --best <database> [run_id]");
        std::process::exit(1);
    };
    let run_id = args.get(1).map(|s| {
        s.parse::<i64>().unwrap_or_else(|e| {
            eprintln!("Invalid run id {}: {}", s, e);
            std::process::exit(1);
        })
    });

    let mut store = SqliteStore::open(path).unwrap_or_else(|e| {
        eprintln!("Error opening database {}: {}", path, e);
        std::process::exit(1);
    });

    match store.fetch_best(run_id) {
        Ok(Some((best, fitness))) => {
            println!("Best fitness: {:.6}", fitness);
            print!("{}", best.to_readable());
        }
        Ok(None) => println!("No stored candidates"),
        Err(e) => {
            eprintln!("Error reading database: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_example_config() {
    let config = ExperimentConfig::default();

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
