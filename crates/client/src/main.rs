use client::{ClientConfig, Orchestrator, logging::setup_logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ClientConfig::load();

    let _telemetry = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ClientConfig) -> anyhow::Result<()> {
    tracing::debug!(config = ?config, "Loaded configuration");

    let orchestrator = Orchestrator::new(config)?;

    if orchestrator.config().watch {
        orchestrator.watch().await?;
        return Ok(());
    }

    let report = orchestrator.run_file().await?;
    tracing::info!(uid = %report.uid, line_id = report.line_id, "Answer: {}", report.message);

    Ok(())
}
