//! Command-line entry point: `immo preprocess | train | predict | run`.
//!
//! Paths and parameters come from environment variables (see [`Settings`]).

use clap::{Parser, Subcommand};
use immo_pipeline::exceptions::{ImmoError, ImmoResult};
use immo_pipeline::settings::Settings;
use immo_pipeline::workflow;
use std::process::ExitCode;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "immo", version, about = "Real-estate price preprocessing and inference")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Impute and encode the raw training data, then write the preprocessed CSV and the schema.
    Preprocess,
    /// Train the ridge regression on the preprocessed data and save the model.
    Train,
    /// Predict every new file in the production directory.
    Predict,
    /// Preprocess, then train.
    Run,
}

async fn execute(command: Commands, settings: &Settings) -> ImmoResult<()> {
    match command {
        Commands::Preprocess => {
            let schema = workflow::preprocess(settings).await?;
            info!(features = schema.features.len(), "preprocessing finished");
        }
        Commands::Train => {
            let report = workflow::train(settings).await?;
            info!(rmse = report.rmse, r2 = report.r2, "training finished");
        }
        Commands::Run => {
            let report = workflow::run(settings).await?;
            info!(rmse = report.rmse, r2 = report.r2, "training finished");
        }
        Commands::Predict => {
            let report = workflow::predict(settings).await?;
            info!(
                predicted = report.predicted.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "prediction finished"
            );
            if let Some(failure) = report.failed.into_iter().next() {
                return Err(failure.error);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // A subscriber may already be installed through DEBUG_IMMO_PIPELINE.
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .try_init();

    let cli = Cli::parse();
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match execute(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ImmoError::AllAlreadyProcessed(dir)) => {
            info!(%dir, "all files have already been processed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}
