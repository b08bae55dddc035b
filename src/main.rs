use anyhow::Result;
use clap::Parser;
use just_nutrition::config::AppConfig;
use just_nutrition::errors::{error_logging, AppError};
use just_nutrition::observability;
use just_nutrition::pipeline::{LabelReport, NutritionPipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Read a nutrition label and compare it with catalog products
#[derive(Parser)]
#[command(name = "just-nutrition", version, long_about = None)]
struct Cli {
    /// Label photo, or a `.txt` transcription to skip OCR
    input: PathBuf,

    /// Product search query; the search is skipped when omitted
    query: Vec<String>,

    /// Treat the input as a transcription regardless of its extension
    #[arg(long)]
    text: bool,
}

impl Cli {
    fn is_transcription(&self) -> bool {
        self.text
            || self
                .input
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
    }

    fn joined_query(&self) -> Option<String> {
        if self.query.is_empty() {
            None
        } else {
            Some(self.query.join(" "))
        }
    }
}

/// Load and validate configuration at startup
fn load_configuration() -> Result<AppConfig, AppError> {
    let config = AppConfig::from_env().inspect_err(|e| {
        error_logging::log_config_error(e, "environment", "load_configuration")
    })?;
    config
        .validate()
        .inspect_err(|e| error_logging::log_config_error(e, "app_config", "validate"))?;
    Ok(config)
}

async fn run(cli: &Cli, config: &AppConfig) -> Result<LabelReport, AppError> {
    let pipeline = NutritionPipeline::from_config(config)?;
    let query = cli.joined_query();
    let input = cli.input.to_string_lossy();

    if cli.is_transcription() {
        let transcription = tokio::fs::read_to_string(&cli.input).await.map_err(|e| {
            AppError::InvalidInput(format!("cannot read transcription {}: {}", input, e))
        })?;
        pipeline.analyze_text(&transcription, query.as_deref()).await
    } else {
        pipeline.analyze_image(&input, query.as_deref()).await
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match load_configuration() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {}", err.category(), err);
            return Ok(ExitCode::FAILURE);
        }
    };

    observability::init_tracing_with_config(&config.observability)?;
    info!(summary = %config.summary(), "Configuration loaded");

    match run(&cli, &config).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}: {}", err.category(), err.user_message());
            eprintln!("{}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}
