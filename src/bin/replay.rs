//! Scenario replay binary.
//!
//! Plays every scenario of a replay configuration against a fresh engine,
//! in parallel, and writes the transcripts as JSON.
//!
//! Usage:
//!   cargo run --release --bin replay -- --config replay.json [OPTIONS]

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use reactive_strategy::engine::{EngineError, Policy};
use reactive_strategy::games::prisoners::{run_scenario, MatchTranscript, ReplayConfig};

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay scripted matches against the strategy engine")]
struct Args {
    /// Replay configuration JSON file
    #[arg(short, long)]
    config: PathBuf,

    /// Output file for the transcripts
    #[arg(short, long, default_value = "transcripts.json")]
    output: PathBuf,

    /// Random seed, overriding the configuration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run the hybrid leeway policy with default parameters
    #[arg(long)]
    hybrid: bool,

    /// Number of threads (default: auto)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    println!("=================================================");
    println!("  Strategy Engine Replay");
    println!("=================================================");
    println!();

    let mut config = match ReplayConfig::from_json_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(seed) = args.seed {
        config.engine = config.engine.with_seed(seed);
    }
    if args.hybrid {
        config.engine = config.engine.with_policy(Policy::hybrid());
    }
    if args.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
        {
            eprintln!("Error configuring threads: {}", e);
        }
    }

    println!("Policy: {}", config.engine.policy.name());
    println!("Scenarios: {}", config.scenarios.len());
    println!("Output: {}", args.output.display());
    println!();

    let start = Instant::now();
    let progress = ProgressBar::new(config.scenarios.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} scenarios ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results: Vec<(String, Result<MatchTranscript, EngineError>)> = config
        .scenarios
        .par_iter()
        .map(|scenario| {
            let result = run_scenario(&config.engine, scenario);
            progress.inc(1);
            (scenario.name.clone(), result)
        })
        .collect();
    progress.finish();

    let mut transcripts = Vec::new();
    let mut failures = 0;
    for (name, result) in results {
        match result {
            Ok(transcript) => {
                println!(
                    "{:<20} | rounds: {:>5} | defecting: {:>5} | punishments: {:>4} | repaired: {:>4}",
                    name,
                    transcript.stats.rounds,
                    transcript.defecting_rounds(),
                    transcript.stats.punishments_started,
                    transcript.stats.repaired_groups
                );
                transcripts.push(transcript);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{:<20} | failed: {}", name, e);
            }
        }
    }

    println!();
    println!("Total time: {:.2}s", start.elapsed().as_secs_f64());

    let json = match serde_json::to_string_pretty(&transcripts) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing transcripts: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match File::create(&args.output).and_then(|mut f| f.write_all(json.as_bytes())) {
        Ok(()) => println!("Transcripts saved to {}", args.output.display()),
        Err(e) => {
            eprintln!("Error saving transcripts: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
