use clap::Parser;
use quill_common::OutputFormat;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "quill.yaml";

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    about = "Search a topic, summarise it and draft validated marketing copy",
    version
)]
pub struct Cli {
    /// Topic to research and write about.
    pub topic: String,

    /// Brand voice for the draft; defaults to `pipeline.default_brand_voice`.
    #[arg(long, env = "QUILL_BRAND_VOICE")]
    pub voice: Option<String>,

    /// Configuration file. When unset, `quill.yaml` is used if present.
    #[arg(long, env = "QUILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Redraft attempts after a failed validation.
    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Exit with status 2 when the draft never passed validation.
    #[arg(long)]
    pub strict: bool,
}
