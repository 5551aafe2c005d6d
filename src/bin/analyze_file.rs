use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use findoc::config::{AnalysisMode, Config};
use findoc::pipeline::{AnalysisService, DocumentUpload};

#[derive(Parser)]
#[command(
    name = "analyze-file",
    about = "Run the financial document analysis on a local PDF without starting the server"
)]
struct Cli {
    /// PDF to analyze.
    #[arg(long)]
    file: PathBuf,
    /// Question the analysis should answer.
    #[arg(long)]
    query: Option<String>,
    /// Override `ANALYSIS_MODE` for this run.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Print the full JSON result instead of the analysis text.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Single,
    Crew,
}

impl From<ModeArg> for AnalysisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => AnalysisMode::Single,
            ModeArg::Crew => AnalysisMode::Crew,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let mut config = Config::from_env().context("loading configuration from environment")?;
    findoc::logging::init_tracing(&config.log_file);
    if let Some(mode) = cli.mode {
        config.analysis_mode = mode.into();
    }

    let content = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("reading {}", cli.file.display()))?;
    let filename = cli
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.file.display().to_string());

    let service = AnalysisService::from_config(&config).context("building analysis backend")?;
    let result = service
        .analyze_document(DocumentUpload { filename, content }, cli.query)
        .await
        .with_context(|| format!("analyzing {}", cli.file.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Query: {}\n", result.query);
        println!("{}", result.analysis);
    }
    Ok(())
}
