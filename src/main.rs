//! # skimmer CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skimmer serve` | Start the HTTP API |
//! | `skimmer summarize --words N --text T` | Summarize inline text |
//! | `skimmer summarize --words N --file F` | Summarize a PDF/Office/text file |
//! | `skimmer summarize --words N --url U` | Summarize a web page or YouTube video |
//! | `skimmer check` | Validate the configuration and print the provider |
//!
//! ## Configuration
//!
//! All commands accept `--config <path>` (default `./config/skimmer.toml`).
//! A `.env` file in the working directory is loaded first, so API keys can
//! live there.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use skimmer::config::{self, Config};
use skimmer::llm::create_client;
use skimmer::models::{DocumentFormat, Source, SummaryRequest};
use skimmer::pipeline::Pipeline;
use skimmer::{server, telemetry};

/// skimmer: summarize text, documents, web pages and videos with an LLM.
#[derive(Parser)]
#[command(name = "skimmer", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// If the default path does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/skimmer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,
    /// Summarize one input and print the result.
    Summarize {
        /// Approximate length of the summary in words.
        #[arg(long)]
        words: i64,

        #[command(flatten)]
        input: InputArgs,
    },
    /// Load and validate the configuration.
    Check,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Inline text.
    #[arg(long)]
    text: Option<String>,
    /// A .pdf, .docx, .xlsx, .pptx, .txt or .md file.
    #[arg(long)]
    file: Option<PathBuf>,
    /// A web page or YouTube URL.
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let cfg = load(&cli.config)?;
    telemetry::init(&cfg.logging)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Summarize { words, input } => {
            let source = input.into_source()?;
            let pipeline = Pipeline::new(&cfg, create_client(&cfg.llm)?)?;
            let outcome = pipeline
                .summarize(SummaryRequest::new(words, source))
                .await?;
            if outcome.origin.is_degraded() {
                eprintln!("warning: no content was available, summary is based on a placeholder");
            }
            println!("{}", outcome.summary);
        }
        Commands::Check => {
            println!("Config OK: {}", cli.config.display());
            println!("  provider: {}", cfg.llm.provider);
            println!("  model:    {}", cfg.llm.model);
            println!("  bind:     {}", cfg.server.bind);
        }
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        return config::load_config(path);
    }
    let mut cfg = Config::default();
    config::resolve_api_key(&mut cfg)?;
    Ok(cfg)
}

impl InputArgs {
    fn into_source(self) -> anyhow::Result<Source> {
        if let Some(text) = self.text {
            return Ok(Source::RawText(text));
        }
        if let Some(url) = self.url {
            return Ok(Source::from_url(&url)?);
        }
        let path = self.file.context("one of --text, --file or --url is required")?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if matches!(ext.as_deref(), Some("txt" | "md")) {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return Ok(Source::RawText(text));
        }
        let format = DocumentFormat::from_path(&path)?;
        let bytes =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Source::Document { bytes, format })
    }
}
