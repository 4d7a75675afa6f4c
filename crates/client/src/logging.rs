use crate::config::ClientConfig;
use common::TelemetryGuard;

/// Installs the global subscriber, exporting over OTLP when an endpoint is
/// configured. Keep the returned guard alive for the whole run.
pub fn setup_logging(config: &ClientConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match config.otel_endpoint.as_deref() {
        Some(endpoint) => {
            let guard = TelemetryGuard::init("client", endpoint, config.environment)?;
            Ok(Some(guard))
        }
        None => {
            common::setup_logging(config.environment);
            Ok(None)
        }
    }
}
