//! rlfuzz command-line driver.
//!
//! Usage:
//!   cargo run -p rlfuzz-cli -- train --episodes 2000 --seed 7
//!   cargo run -p rlfuzz-cli -- train --target http --config fuzz.toml --journal run.jsonl
//!   cargo run -p rlfuzz-cli -- actions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rlfuzz_audit::JournalFilter;
use rlfuzz_contracts::{
    action::{ACTION_SCHEMA_VERSION, ACTION_TABLE},
    config::TrainingConfig,
    error::FuzzResult,
    observation::{FEATURE_COUNT, FEATURE_SCHEMA_VERSION},
};
use rlfuzz_ref_store::{run_campaign, CampaignOptions, JournalOptions, Target};

// ── CLI definition ────────────────────────────────────────────────────────────

/// rlfuzz: learn which requests make a REST service fail.
#[derive(Parser)]
#[command(
    name = "rlfuzz",
    about = "Reinforcement-learning HTTP API fuzzer",
    long_about = "Trains a SARSA agent to compose requests that trigger HTTP 500 responses,\n\
                  against the built-in reference store or a live service."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a training campaign and print the findings.
    Train(TrainArgs),
    /// Print the indexed action table.
    Actions,
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    /// In-process reference store.
    Mock,
    /// Live service at `service.base_url`.
    Http,
}

#[derive(clap::Args)]
struct TrainArgs {
    #[arg(long, value_enum, default_value = "mock")]
    target: TargetArg,
    /// TOML training configuration; unset fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    episodes: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    epsilon: Option<f64>,
    /// Overrides `service.base_url`.
    #[arg(long)]
    base_url: Option<String>,
    /// Stream the hash-chained transition journal here as JSON lines.
    #[arg(long)]
    journal: Option<PathBuf>,
    /// Journal dial-turns too, not only executes.
    #[arg(long, requires = "journal")]
    journal_all: bool,
    /// Journal entries held in memory for the end-of-run integrity check.
    #[arg(long, requires = "journal", default_value_t = 1_000)]
    journal_keep: usize,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // RUST_LOG=info for per-window progress, debug for every step.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Train(args) => train(args),
        Command::Actions => {
            print_actions();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("rlfuzz error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn load_config(args: &TrainArgs) -> FuzzResult<TrainingConfig> {
    let mut config = match &args.config {
        Some(path) => rlfuzz_policy::config::from_file(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        config.episodes = episodes;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(base_url) = &args.base_url {
        config.service.base_url = base_url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn train(args: TrainArgs) -> FuzzResult<()> {
    let config = load_config(&args)?;
    let options = CampaignOptions {
        target: match args.target {
            TargetArg::Mock => Target::Reference,
            TargetArg::Http => Target::Http,
        },
        journal: args.journal.as_ref().map(|path| JournalOptions {
            filter: if args.journal_all {
                JournalFilter::All
            } else {
                JournalFilter::ExecutesOnly
            },
            path: Some(path.clone()),
            keep_last: Some(args.journal_keep),
        }),
    };

    let outcome = run_campaign(&config, &options)?;

    if let Some(window) = outcome.windows.last() {
        println!("{}", window);
    }
    println!("{}", outcome);

    if let (Some(path), Some(journal)) = (&args.journal, &outcome.journal) {
        match journal.verify_integrity() {
            Ok(()) => info!(path = %path.display(), head = %journal.head(), "journal tail verified"),
            Err(err) => warn!(path = %path.display(), error = %err, "journal tail failed verification"),
        }
        println!("Journal: {} entries → {}", journal.recorded(), path.display());
    }
    Ok(())
}

fn print_actions() {
    println!(
        "Action schema v{}  ({} actions, {} features, feature schema v{})",
        ACTION_SCHEMA_VERSION,
        ACTION_TABLE.len(),
        FEATURE_COUNT,
        FEATURE_SCHEMA_VERSION
    );
    for (index, action) in ACTION_TABLE.iter().enumerate() {
        println!("  [{index:>2}] {action}");
    }
}
