use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use tably_core::config::Settings;
use tably_llm::{CompletionProvider, OpenAiProvider};
use tably_server::{AppState, ServerConfig};
use tably_telemetry::{init_telemetry, TelemetryConfig};

/// Concierge chat server for a local business: routes questions,
/// gathers weather and business context, and relays model tokens.
#[derive(Debug, Parser)]
#[command(name = "tably", version)]
struct Cli {
    /// Port to listen on (overrides the PORT env var).
    #[arg(long)]
    port: Option<u16>,

    /// Emit JSON log lines instead of human-readable output.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env before reading settings; absence is fine.
    let _ = dotenvy::dotenv();

    init_telemetry(&TelemetryConfig {
        json_output: cli.json_logs,
        ..TelemetryConfig::default()
    });

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    let port = cli.port.unwrap_or(settings.port);

    let provider = Arc::new(OpenAiProvider::from_settings(&settings)?);
    info!(model = provider.model(), "completion provider ready");

    let state = AppState::build(&settings, provider);
    let handle = tably_server::start(ServerConfig { port }, state).await?;
    info!(port = handle.port, "tably ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
