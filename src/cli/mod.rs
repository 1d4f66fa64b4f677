//! Kolosal AutoFE CLI Module
//!
//! Command-line interface for running a feature-engineering search on a CSV
//! file and for inspecting how the loader types its columns.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::SearchConfig;
use crate::data::{DataLoader, FeatureType, TaskType};
use crate::evaluator::{HoldoutConfig, HoldoutEvaluator};
use crate::optimizer::{BudgetExhaustion, SearchResult};

/// Time budget applied when neither the command line nor the config sets one
const DEFAULT_TIME_BUDGET_SECS: f64 = 300.0;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-autofe")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluation-driven feature engineering search")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for the best feature representation of a dataset
    Search {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Task type (classification, regression)
        #[arg(long, default_value = "classification")]
        task: String,

        /// Maximum number of candidate evaluations
        #[arg(long)]
        max_evals: Option<usize>,

        /// Time budget in seconds [default: config value, else 300]
        #[arg(long)]
        time_budget: Option<f64>,

        /// Random seed [default: config value, else 1]
        #[arg(long)]
        seed: Option<u64>,

        /// JSON search configuration; command-line limits override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON search report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how the loader types each column
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Task type (classification, regression)
        #[arg(long, default_value = "classification")]
        task: String,
    },
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Search { data, target, task, max_evals, time_budget, seed, config, output } => {
            let search_config =
                resolve_config(config.as_deref(), max_evals, time_budget, seed)?;
            cmd_search(&data, &target, &task, search_config, output.as_deref())
        }
        Commands::Info { data, target, task } => cmd_info(&data, &target, &task),
    }
}

/// Build the search configuration from an optional JSON file and the flags.
///
/// Flags given on the command line win over the file. A search always runs
/// with a time budget: when neither sets one, 300 seconds applies.
pub fn resolve_config(
    path: Option<&Path>,
    max_evals: Option<usize>,
    time_budget: Option<f64>,
    seed: Option<u64>,
) -> anyhow::Result<SearchConfig> {
    let mut config = match path {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    if let Some(n) = max_evals {
        config = config.with_max_evaluations(n);
    }
    if let Some(secs) = time_budget {
        config = config.with_time_budget(secs);
    } else if config.time_budget_secs.is_none() {
        config = config.with_time_budget(DEFAULT_TIME_BUDGET_SECS);
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    Ok(config)
}

// ─── Search ────────────────────────────────────────────────────────────────────

pub fn cmd_search(
    data_path: &Path,
    target: &str,
    task_type: &str,
    config: SearchConfig,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Feature Search");

    let task: TaskType = task_type.parse()?;
    config.validate()?;

    step_run("Loading data");
    let start = Instant::now();
    let root = DataLoader::new().load_node(data_path, target, task)?;
    let (rows, cols) = root.shape();
    step_done(&format!("{} rows × {} cols in {:?}", rows, cols, start.elapsed()));
    println!(
        "  {:<16} {} numerical, {} categorical",
        muted("Features"),
        root.num_num(),
        root.cat_num()
    );

    let evaluator = HoldoutEvaluator::new(HoldoutConfig {
        seed: config.seed,
        ..HoldoutConfig::default()
    });

    step_run("Searching");
    let start = Instant::now();
    let result = crate::optimizer::search(root, &evaluator, config)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_result(&result);

    if let Some(path) = output {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &result.report())?;
        step_ok(&format!("Report written to {}", path.display()));
    }

    println!();
    Ok(())
}

fn print_result(result: &SearchResult) {
    let stats = &result.stats;
    let best = result.best_node();
    let (rows, cols) = best.shape();

    println!();
    println!("  {:<16} {}", muted("Root score"), format!("{:.4}", result.root_score).white());
    println!("  {:<16} {}", muted("Best score"), format!("{:.4}", result.best_score()).white().bold());
    println!("  {:<16} {}", muted("Improvement"), format!("{:+.4}", result.improvement()).white());
    println!("  {:<16} {} rows × {} cols", muted("Best shape"), rows, cols);
    println!("  {:<16} {}", muted("Evaluations"), stats.evaluations);
    println!("  {:<16} {}", muted("Rounds"), stats.rounds);
    println!("  {:<16} {}", muted("Graph nodes"), result.graph.len());
    println!("  {:<16} {}", muted("Discarded"), stats.failures.len());

    let stop = match stats.exhaustion {
        Some(BudgetExhaustion::Evaluations { limit }) => format!("evaluation limit ({})", limit),
        Some(BudgetExhaustion::Time { budget_secs, .. }) => format!("time budget ({:.0}s)", budget_secs),
        None => "search space exhausted".to_string(),
    };
    println!("  {:<16} {}", muted("Stopped by"), stop);

    let path = result.best_path();
    if path.is_empty() {
        println!("  {:<16} {}", muted("Pipeline"), dim("(original features)"));
    } else {
        println!("  {:<16} {}", muted("Pipeline"), path.join(" → ").cyan());
    }
}

// ─── Info ──────────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &Path, target: &str, task_type: &str) -> anyhow::Result<()> {
    section("Data Info");

    let task: TaskType = task_type.parse()?;
    let loader = DataLoader::new();
    let df = loader.load_csv(data_path)?;
    let summary = loader.describe(&df, target, task)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), summary.n_rows);
    println!("  {:<12} {} ({:?})", muted("Target"), summary.target, summary.task);
    println!();

    println!("  {:<20} {:<12} {:>10}", muted("Column"), muted("Type"), muted("Categories"));
    println!("  {}", dim(&"─".repeat(44)));

    for col in &summary.columns {
        let ftype = match col.feature_type {
            FeatureType::Numerical => "numerical",
            FeatureType::Categorical => "categorical",
        };
        let categories = col
            .n_categories
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<12} {:>10}",
            col.name,
            ftype.truecolor(140, 140, 140),
            categories
        );
    }

    println!();
    Ok(())
}
