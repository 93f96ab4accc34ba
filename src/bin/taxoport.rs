use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use taxoport::{init_tracing, ImportConfig, ImportRunner};

/// Imports a hierarchical taxonomy code list into a remote catalog tree.
#[derive(Debug, Parser)]
#[command(name = "taxoport", version, about)]
struct Cli {
    /// Path of the JSON configuration file.
    #[arg(short, long, default_value = "taxoport.json")]
    config: PathBuf,

    /// Path of the taxonomy source JSON file.
    #[arg(short, long)]
    source: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(clean) if clean => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "import aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let config = ImportConfig::from_file(&cli.config).await?;
    let runner = ImportRunner::new(config)?;

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received; finishing current wave then stopping");
            token.cancel();
        }
    });

    let report = runner.run_from_file(&cli.source).await?;
    Ok(report.failed() == 0 && report.is_complete())
}
