//! Financial Crisis Early Warning
//!
//! Collects macro indicators, trains the crisis classifier and serves the
//! what-if simulator.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use crisis_warning::{
    analyst,
    config::{Config, TrainingConfig},
    data::{csv_store, Collector, Indicator},
    ml::{FeatureImportance, SimulationInput, Trainer, TrainingOutcome},
    monitor::{start_dashboard, Session},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crisis-warning")]
#[command(about = "Early warning of equity market crashes from macro indicators")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Download indicators and write the aligned dataset
    Collect {
        /// First date to request (defaults to the configured start date)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last date to request (defaults to today)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Train on the dataset and print the held-out report
    Train {
        /// Use the deeper evaluation preset (200 depth-5 trees, gold added)
        #[arg(long)]
        evaluation: bool,
    },
    /// Predict one scenario; omitted values come from the latest row
    Simulate {
        #[arg(long)]
        vix: Option<f64>,
        #[arg(long)]
        oil: Option<f64>,
        #[arg(long)]
        t10y2y: Option<f64>,
        #[arg(long)]
        gold: Option<f64>,
        #[arg(long)]
        evaluation: bool,
    },
    /// Train and serve the simulator dashboard
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Collect { start, end } => collect(config, start, end).await,
        Commands::Train { evaluation } => train(config, evaluation),
        Commands::Simulate {
            vix,
            oil,
            t10y2y,
            gold,
            evaluation,
        } => {
            let overrides = [
                (Indicator::Vix, vix),
                (Indicator::Oil, oil),
                (Indicator::YieldSpread, t10y2y),
                (Indicator::Gold, gold),
            ];
            simulate(config, &overrides, evaluation)
        }
        Commands::Serve => serve(config).await,
    }
}

fn training_config(config: &Config, evaluation: bool) -> TrainingConfig {
    if evaluation {
        TrainingConfig {
            lag_horizon: config.training.lag_horizon,
            crash_threshold: config.training.crash_threshold,
            random_seed: config.training.random_seed,
            ..TrainingConfig::evaluation()
        }
    } else {
        config.training.clone()
    }
}

async fn collect(
    config: Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let start = start.unwrap_or(config.collector.start_date);
    let end = end.unwrap_or_else(|| Utc::now().date_naive());
    anyhow::ensure!(start < end, "start date {} must precede end date {}", start, end);

    let collector = Collector::from_config(&config.collector)?;
    let series = collector.collect(start, end).await?;
    csv_store::save(&series, &config.data.path)?;

    println!(
        "Saved {} rows ({} columns) to {}",
        series.len(),
        series.indicators().count(),
        config.data.path
    );
    Ok(())
}

fn fit(config: &Config, evaluation: bool) -> anyhow::Result<TrainingOutcome> {
    let series = csv_store::load(&config.data.path)
        .with_context(|| format!("loading {} (run `collect` first)", config.data.path))?;
    tracing::info!("Loaded {} rows from {}", series.len(), config.data.path);

    let trainer = Trainer::new(training_config(config, evaluation))?;
    Ok(trainer.train(&series)?)
}

fn train(config: Config, evaluation: bool) -> anyhow::Result<()> {
    let outcome = fit(&config, evaluation)?;
    let summary = outcome.model.split_summary();

    println!(
        "Trained {} trees on {} rows ({} -> {}), crisis rate {:.1}%",
        outcome.model.n_trees(),
        summary.train_rows,
        summary.train_start,
        summary.train_end,
        summary.train_positive_rate * 100.0
    );

    match &outcome.report {
        Some(report) => {
            println!("\nHeld-out evaluation ({} rows):\n", summary.test_rows);
            println!("{}", report);
            let [[tn, fp], [fn_, tp]] = report.confusion;
            println!("Confusion: TN={} FP={} FN={} TP={}", tn, fp, fn_, tp);
        }
        None => println!("No held-out rows; evaluation skipped"),
    }

    println!("\nFeature importance:");
    for (name, score) in FeatureImportance::from_model(&outcome.model).ranked() {
        println!("  {:<12} {:.4}", name, score);
    }
    Ok(())
}

fn simulate(
    config: Config,
    overrides: &[(Indicator, Option<f64>)],
    evaluation: bool,
) -> anyhow::Result<()> {
    let outcome = fit(&config, evaluation)?;
    let model = &outcome.model;

    let series = csv_store::load(&config.data.path)?;
    let latest = SimulationInput::latest(model.schema(), &series)?;

    // Start from the latest observed values and apply overrides for the
    // features this model uses
    let values: Vec<(Indicator, f64)> = model
        .schema()
        .indicators()
        .iter()
        .map(|indicator| {
            let value = overrides
                .iter()
                .find(|(i, _)| i == indicator)
                .and_then(|(_, v)| *v)
                .or_else(|| latest.indicator(*indicator))
                .unwrap_or(f64::NAN);
            (*indicator, value)
        })
        .collect();
    for (indicator, value) in overrides {
        if value.is_some() && !model.schema().indicators().contains(indicator) {
            tracing::warn!("{} is not a feature of this model; ignored", indicator);
        }
    }

    let input = SimulationInput::from_indicators(&values);
    let prediction = model.predict(&input)?;
    let commentary = analyst::comment(&input, &config.analyst);

    for (indicator, value) in &values {
        println!("  {:<8} {:>10.2}", indicator.to_string(), value);
    }
    println!(
        "\n{}  (crash probability {:.1}%)",
        prediction.decision,
        prediction.probability * 100.0
    );
    println!("{}", commentary.message());
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let series = csv_store::load(&config.data.path)
        .with_context(|| format!("loading {} (run `collect` first)", config.data.path))?;

    let session = Arc::new(Session::new(config, series));
    let summary = session.retrain().await?;
    tracing::info!(
        "Initial model ready: {} trees, held-out accuracy {:?}",
        summary.n_trees,
        summary.accuracy
    );

    start_dashboard(session).await?;
    Ok(())
}
