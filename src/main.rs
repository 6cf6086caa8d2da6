//! Slopehunt CLI - Run the coverage formula search from a JSON dataset.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use slopehunt::{
    compute::{disassemble, search::SearchEngine},
    schema::{ExtendedSample, Sample, SearchConfig},
};

/// One dataset record as stored on disk: a sample plus its orientation flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetRecord {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    coverage: i32,
    #[serde(default = "default_true")]
    left: bool,
    #[serde(default = "default_true")]
    positive: bool,
}

fn default_true() -> bool {
    true
}

impl DatasetRecord {
    fn into_extended(self) -> ExtendedSample {
        let sample = Sample {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            coverage: self.coverage,
        };
        ExtendedSample::new(sample, self.left, self.positive)
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <dataset.json> [config.json]", args[0]);
        eprintln!();
        eprintln!("Search for a coverage formula matching a captured dataset.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  dataset.json  Captured (geometry, coordinate) -> coverage samples");
        eprintln!("  config.json   Search configuration (defaults when omitted)");
        eprintln!();
        eprintln!("Example files are generated with --example.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_files();
        return;
    }

    let dataset_path = PathBuf::from(&args[1]);
    let dataset_str = fs::read_to_string(&dataset_path).unwrap_or_else(|e| {
        eprintln!("Error reading dataset file: {}", e);
        std::process::exit(1);
    });
    let records: Vec<DatasetRecord> = serde_json::from_str(&dataset_str).unwrap_or_else(|e| {
        eprintln!("Error parsing dataset: {}", e);
        std::process::exit(1);
    });

    let config: SearchConfig = match args.get(2) {
        Some(path) => {
            let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config file: {}", e);
                std::process::exit(1);
            });
            serde_json::from_str(&config_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {}", e);
                std::process::exit(1);
            })
        }
        None => SearchConfig::default(),
    };

    let samples: Vec<ExtendedSample> = records
        .into_iter()
        .map(DatasetRecord::into_extended)
        .collect();

    println!("Slopehunt");
    println!("=========");
    println!("Samples: {}", samples.len());
    println!(
        "Workers: {}, population: {}, chromosome length: {}",
        config.workers, config.population_size, config.chromosome_length
    );
    println!();

    let engine = SearchEngine::new(config, samples).unwrap_or_else(|e| {
        eprintln!("Error starting search: {}", e);
        std::process::exit(1);
    });

    println!("Searching (interrupt to abort)...");
    let start = Instant::now();

    while !engine.converged() {
        std::thread::sleep(Duration::from_secs(1));
        let best = engine.best();
        let fitness = best
            .as_ref()
            .map(|b| b.fitness.to_string())
            .unwrap_or_else(|| "-".to_owned());
        println!(
            "  generation {}: best fitness {} ({:.0}s)",
            engine.generation(),
            fitness,
            start.elapsed().as_secs_f32()
        );
    }

    let best = engine.best().expect("converged search has a best");
    let generation = engine.generation();
    engine.stop();

    println!();
    println!(
        "Converged after {} generations in {:.2}s",
        generation,
        start.elapsed().as_secs_f32()
    );
    println!("Winning program (fitness {}):", best.fitness);
    print!("{}", disassemble(&best.genes));
}

fn print_example_files() {
    let records = vec![
        DatasetRecord {
            x: 0,
            y: 0,
            width: 15,
            height: 6,
            coverage: 6,
            left: true,
            positive: true,
        },
        DatasetRecord {
            x: 1,
            y: 0,
            width: 15,
            height: 6,
            coverage: 19,
            left: true,
            positive: true,
        },
    ];
    let config = SearchConfig::default();

    println!("Example dataset (dataset.json):");
    println!("{}", serde_json::to_string_pretty(&records).unwrap());
    println!();
    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
