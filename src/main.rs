use anyhow::Result;
use clap::Parser;
use doc_lens::llm::gemini::{self, GeminiClient, GeminiConfig};
use doc_lens::shell::Shell;
use std::path::PathBuf;

/// Analyze a plain-text document: structured summary plus grounded Q&A.
#[derive(Parser, Debug)]
#[command(name = "doc-lens", version, about)]
struct Cli {
    /// Text file to load on startup
    file: Option<PathBuf>,

    /// Gemini model id
    #[arg(long, default_value = gemini::DEFAULT_MODEL)]
    model: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("doc_lens=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = GeminiConfig::from_env()?;
    config.model = cli.model;

    let mut shell = Shell::new(GeminiClient::new(config));
    if let Some(path) = &cli.file {
        shell.open(path);
    }
    shell.run().await
}
