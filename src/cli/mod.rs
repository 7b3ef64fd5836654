//! Tender Threshold CLI Module
//!
//! Command-line interface for training, prediction and threshold statistics.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::artifacts::ModelArtifactStore;
use crate::config::AppConfig;
use crate::inference::{PredictionRequest, Predictor};
use crate::summary::ThresholdSummary;
use crate::training::{ModelTrainer, TrainingGuard};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<18}", key)), val.white())
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
#[command(name = "tender-threshold")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Anomaly threshold prediction for procurement tenders")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the model artifacts
    #[arg(long, global = true, env = "TENDER_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the threshold model on historical tenders
    Train {
        /// Historical tenders (CSV, JSON, JSONL or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Train even below the minimum sample count
        #[arg(long)]
        force: bool,
    },

    /// Predict the anomaly threshold of one tender
    Predict {
        /// Base amount of the tender
        #[arg(short, long)]
        amount: f64,

        /// Tender date (YYYY-MM-DD)
        #[arg(short, long)]
        date: chrono::NaiveDate,

        /// Work category
        #[arg(long)]
        category: Option<String>,

        /// Expected number of competitors
        #[arg(long)]
        competitors: Option<i64>,
    },

    /// List the categories accepted by the trained model
    Categories,

    /// Statistics of the historical anomaly thresholds
    Summary {
        /// Historical tenders (CSV, JSON, JSONL or Parquet)
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Setup ─────────────────────────────────────────────────────────────────────

/// Resolve configuration: file, then environment, then `--model-dir`
pub fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.model_dir {
        config = config.with_model_dir(dir.clone());
    }
    Ok(config)
}

pub fn load_data(path: &Path) -> anyhow::Result<DataFrame> {
    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_auto(path)?;
    step_done(&format!("{} rows × {} cols in {:.2?}", df.height(), df.width(), start.elapsed()));
    Ok(df)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_train(config: &AppConfig, data_path: &Path, force: bool) -> anyhow::Result<()> {
    section("Train");

    let df = load_data(data_path)?;

    let guard = TrainingGuard::new(config.training.min_training_samples);
    let readiness = guard.check(&df)?;
    println!(
        "  {} {} / {} usable rows",
        accent("›"),
        readiness.valid_samples.to_string().white().bold(),
        readiness.required
    );
    if !readiness.is_ready() {
        if !force {
            anyhow::bail!(
                "not enough data: {} more rows with threshold, amount and date are needed (use --force to override)",
                readiness.missing()
            );
        }
        println!("  {}", "below the minimum sample count, training anyway".yellow());
    }

    let store = ModelArtifactStore::open(config.artifacts.clone());
    let trainer = ModelTrainer::new(config.training.clone());

    step_run(&format!("Training {} trees", config.training.n_estimators.to_string().cyan()));
    let start = Instant::now();
    let metrics = tokio::task::spawn_blocking(move || trainer.train_and_persist(&df, &store)).await??;
    step_done(&format!("{:.2?}", start.elapsed()));

    println!();
    println!("  {:<16} {}", muted("MAE"), format!("{:.4} pp", metrics.mae).white().bold());
    println!("  {:<16} {}", muted("R²"), format!("{:.4}", metrics.r2).white().bold());
    println!("  {:<16} {}", muted("Samples"), metrics.n_samples.to_string().white());
    println!("  {:<16} {}", muted("Saved to"), config.artifacts.directory.display().to_string().white());

    section("Feature importance");
    for item in &metrics.feature_importances {
        let bar = "█".repeat((item.importance * 30.0).round() as usize);
        println!("  {:<18} {:>6.3} {}", item.feature, item.importance, accent(&bar));
    }
    println!();

    Ok(())
}

pub fn cmd_predict(config: &AppConfig, request: PredictionRequest) -> anyhow::Result<()> {
    section("Predict");

    let store = Arc::new(ModelArtifactStore::open(config.artifacts.clone()));
    let predictor = Predictor::new(store);
    let threshold = predictor.predict(&request)?;

    println!();
    line_box_top();
    line_box_center(&format!("{}", format!("{:.4} %", threshold).white().bold()));
    line_box_center(&muted("predicted anomaly threshold").to_string());
    line_box_sep();
    line_box(&kv("Base amount", &format!("{:.2}", request.base_amount)));
    line_box(&kv("Tender date", &request.tender_date.to_string()));
    line_box(&kv("Work category", request.work_category.as_deref().unwrap_or("Unknown")));
    line_box(&kv(
        "Competitors",
        &request.competitor_count.map_or_else(|| "-".to_string(), |c| c.to_string()),
    ));
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_categories(config: &AppConfig) -> anyhow::Result<()> {
    section("Categories");

    let store = Arc::new(ModelArtifactStore::open(config.artifacts.clone()));
    let categories = Predictor::new(store).known_categories();
    if categories.is_empty() {
        println!("  {}", "No trained model found".yellow());
    }
    for category in categories {
        println!("  {} {}", dim("·"), category);
    }
    println!();

    Ok(())
}

pub fn cmd_summary(data_path: &Path) -> anyhow::Result<()> {
    section("Summary");

    let df = load_data(data_path)?;
    let summary = ThresholdSummary::from_frame(&df)?;

    println!();
    println!("  {:<16} {}", muted("Count"), summary.count.to_string().white());
    println!("  {:<16} {}", muted("Mean"), format!("{:.4} %", summary.mean).white().bold());
    println!("  {:<16} {}", muted("Median"), format!("{:.4} %", summary.median).white());
    println!(
        "  {:<16} {}",
        muted("Std dev"),
        summary.std_dev.map_or_else(|| "-".to_string(), |s| format!("{:.4}", s)).white()
    );
    println!("  {:<16} {}", muted("Range"), format!("{:.4} – {:.4} %", summary.min, summary.max).white());
    println!();

    Ok(())
}
