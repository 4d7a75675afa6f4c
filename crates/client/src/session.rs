use crate::error::ClientError;
use schema::EngineClient;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// One connection to the recognition engine.
///
/// The config channel and every unary call share the underlying HTTP/2
/// connection. Dropping the session (or calling [`Session::close`]) releases it.
pub struct Session {
    address: String,
    client: EngineClient<Channel>,
}

impl Session {
    /// Connects to `host:port`. Fails fast; there is no retry.
    pub async fn open(address: &str, connect_timeout: Duration) -> Result<Self, ClientError> {
        let connection_error = |reason: String| ClientError::Connection {
            address: address.to_string(),
            reason,
        };

        let endpoint = Endpoint::from_shared(format!("http://{}", address))
            .map_err(|e| connection_error(e.to_string()))?
            .connect_timeout(connect_timeout);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| connection_error(transport_reason(&e)))?;

        tracing::info!(address, "Connected to recognition engine");

        Ok(Self {
            address: address.to_string(),
            client: EngineClient::new(channel),
        })
    }

    /// Handle for issuing calls over this session. Clones share the connection.
    pub(crate) fn client(&self) -> EngineClient<Channel> {
        self.client.clone()
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::debug!(address = %self.address, "Session released");
    }
}

// tonic's transport error hides the io cause behind `source()`.
fn transport_reason(e: &tonic::transport::Error) -> String {
    use std::error::Error;

    match e.source() {
        Some(source) => format!("{}: {}", e, source),
        None => e.to_string(),
    }
}
