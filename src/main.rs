//! Tender Threshold - Main Entry Point

use clap::Parser;
use tender_threshold::cli::{cmd_categories, cmd_predict, cmd_summary, cmd_train, resolve_config, Cli, Commands};
use tender_threshold::inference::PredictionRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tender_threshold=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Train { data, force } => {
            cmd_train(&config, &data, force).await?;
        }
        Commands::Predict { amount, date, category, competitors } => {
            let request = PredictionRequest {
                base_amount: amount,
                tender_date: date,
                work_category: category,
                competitor_count: competitors,
            };
            cmd_predict(&config, request)?;
        }
        Commands::Categories => {
            cmd_categories(&config)?;
        }
        Commands::Summary { data } => {
            cmd_summary(&data)?;
        }
    }

    Ok(())
}
