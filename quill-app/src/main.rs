use anyhow::Result;
use clap::Parser;
use cli::{Cli, DEFAULT_CONFIG_FILE};
use quill_common::OutputFormat;
use quill_common::observability::init_logging;
use quill_config::QuillConfigLoader;
use quill_pipeline::PipelineOutcome;
use std::process::ExitCode;

mod cli;
mod wiring;

const EXHAUSTED_EXIT_CODE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // API keys usually come from a local .env
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let loader = match &cli.config {
        Some(path) => QuillConfigLoader::new().with_file(path),
        None => QuillConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load()?;
    if let Some(n) = cli.max_retries {
        cfg.pipeline.max_retries = n;
    }

    let log_path = init_logging(wiring::log_config(&cfg.logging))?;
    tracing::info!(log = %log_path.display(), topic = %cli.topic, "quill.start");

    let pipeline = wiring::build_pipeline(&cfg).await?;
    let outcome = match cli.voice.as_deref() {
        Some(voice) => pipeline.run(&cli.topic, voice).await?,
        None => pipeline.run_with_default_voice(&cli.topic).await?,
    };

    println!("{}", render(&outcome, cli.format)?);

    if cli.strict && !outcome.is_validated() {
        tracing::warn!(retry_count = outcome.retry_count, "draft never passed validation");
        return Ok(ExitCode::from(EXHAUSTED_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

fn render(outcome: &PipelineOutcome, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => outcome.content.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(outcome)?,
    })
}
