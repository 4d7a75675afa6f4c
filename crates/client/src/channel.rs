//! Long-lived configuration channel (`ConfigUpdater`).
//!
//! The channel moves through `Unopened → Opened → Handshaking → Synced →
//! Closed`. Sends and receives are independent: handshake messages go out on
//! the request stream, configs arrive on the response stream, and nothing
//! pairs one with the other. Publishing goes through the unary `SetConfig`
//! call on the same session.

use crate::error::ClientError;
use crate::lines::SyncedConfig;
use crate::session::Session;
use schema::{Config, EngineClient};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;
use tonic::codec::Streaming;
use tonic::transport::Channel;

/// Outbound messages buffered before the engine starts reading.
const OUTBOUND_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unopened,
    Opened,
    Handshaking,
    Synced,
    Closed,
}

type StreamCall = JoinHandle<Result<tonic::Response<Streaming<Config>>, Status>>;

enum Inbound {
    Idle,
    // Response headers may not arrive until the engine pushes its first
    // config, so the call is driven on its own task.
    Pending(StreamCall),
    Streaming(Streaming<Config>),
}

pub struct ConfigChannel {
    client: EngineClient<Channel>,
    state: ChannelState,
    outbound: Option<mpsc::Sender<schema::Response>>,
    inbound: Inbound,
    current: Option<SyncedConfig>,
}

impl ConfigChannel {
    pub fn new(session: &Session) -> Self {
        Self {
            client: session.client(),
            state: ChannelState::Unopened,
            outbound: None,
            inbound: Inbound::Idle,
            current: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Most recent config received from (or accepted by) the engine.
    pub fn current(&self) -> Option<&SyncedConfig> {
        self.current.as_ref()
    }

    /// Starts the bidirectional `ConfigUpdater` stream.
    pub fn open(&mut self) -> Result<(), ClientError> {
        match self.state {
            ChannelState::Unopened => {}
            ChannelState::Closed => return Err(ClientError::ChannelClosed),
            other => {
                return Err(ClientError::ChannelOpen(format!(
                    "channel already opened (state {:?})",
                    other
                )));
            }
        }

        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let mut client = self.client.clone();
        let call =
            tokio::spawn(async move { client.config_updater(ReceiverStream::new(rx)).await });

        self.outbound = Some(tx);
        self.inbound = Inbound::Pending(call);
        self.state = ChannelState::Opened;

        tracing::debug!("Config channel opened");
        Ok(())
    }

    /// Sends handshake messages in order. At least one is required before a
    /// config can be expected.
    pub async fn handshake<I>(&mut self, messages: I) -> Result<usize, ClientError>
    where
        I: IntoIterator<Item = schema::Response>,
    {
        match self.state {
            ChannelState::Opened | ChannelState::Handshaking => {}
            ChannelState::Closed => return Err(ClientError::ChannelClosed),
            other => {
                return Err(ClientError::Validation(format!(
                    "handshake not allowed in state {:?}",
                    other
                )));
            }
        }

        let Some(tx) = self.outbound.clone() else {
            return Err(ClientError::ChannelClosed);
        };

        let mut sent = 0;
        for message in messages {
            if tx.send(message).await.is_err() {
                self.close();
                return Err(ClientError::ChannelOpen(
                    "config stream ended before handshake completed".to_string(),
                ));
            }
            sent += 1;
        }

        if sent == 0 && self.state == ChannelState::Opened {
            return Err(ClientError::Validation(
                "at least one handshake message is required".to_string(),
            ));
        }

        self.state = ChannelState::Handshaking;
        tracing::debug!(sent, "Handshake sent");
        Ok(sent)
    }

    /// Blocks until the engine pushes the first config.
    ///
    /// With `timeout` set to `None` this waits forever if the engine stays
    /// silent.
    pub async fn sync(&mut self, timeout: Option<Duration>) -> Result<SyncedConfig, ClientError> {
        match self.state {
            ChannelState::Handshaking => {}
            ChannelState::Closed => return Err(ClientError::ChannelClosed),
            other => {
                return Err(ClientError::Validation(format!(
                    "initial sync requires a completed handshake (state {:?})",
                    other
                )));
            }
        }

        let received = match self.receive(timeout).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                self.close();
                return Err(ClientError::ConfigSync(
                    "config stream ended before the first config".to_string(),
                ));
            }
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        let synced = match SyncedConfig::from_server(received) {
            Ok(synced) => synced,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        tracing::info!(
            uid = %synced.uid(),
            lines = synced.lines().len(),
            "Initial config received"
        );

        self.current = Some(synced.clone());
        self.state = ChannelState::Synced;
        Ok(synced)
    }

    /// Waits for the next hot-reloaded config. `Ok(None)` means the engine
    /// ended the stream. The channel is closed after a stream end, a stream
    /// error or an invalid config.
    pub async fn recv_update(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<SyncedConfig>, ClientError> {
        self.require_synced()?;

        let received = match self.receive(timeout).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                self.close();
                return Ok(None);
            }
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        let synced = match SyncedConfig::from_server(received) {
            Ok(synced) => synced,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };
        tracing::info!(
            uid = %synced.uid(),
            lines = synced.lines().len(),
            "Config updated by engine"
        );

        self.current = Some(synced.clone());
        Ok(Some(synced))
    }

    /// Reads the next config and makes it current. A closed stream is an error.
    pub async fn resync(&mut self, timeout: Option<Duration>) -> Result<SyncedConfig, ClientError> {
        self.recv_update(timeout).await?.ok_or_else(|| {
            ClientError::ConfigSync("config stream ended while waiting for an update".to_string())
        })
    }

    /// Publishes `config` through `SetConfig`. Idempotent; may be called any
    /// number of times while synced.
    ///
    /// The engine's accepted version becomes current when it is a valid
    /// config. Otherwise the published config is kept.
    pub async fn publish(&mut self, config: &SyncedConfig) -> Result<SyncedConfig, ClientError> {
        self.require_synced()?;

        let accepted = self
            .client
            .set_config(config.as_wire().clone())
            .await
            .map_err(|status| {
                ClientError::ConfigSync(format!(
                    "SetConfig rejected ({:?}): {}",
                    status.code(),
                    status.message()
                ))
            })?
            .into_inner();

        tracing::info!(accepted = ?accepted, "Config published");

        let current = match SyncedConfig::from_server(accepted) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::debug!(reason = %e, "Keeping published config as current");
                config.clone()
            }
        };

        self.current = Some(current.clone());
        Ok(current)
    }

    /// Ends both directions. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }

        self.outbound = None;
        if let Inbound::Pending(call) = std::mem::replace(&mut self.inbound, Inbound::Idle) {
            call.abort();
        }
        self.state = ChannelState::Closed;
        tracing::debug!("Config channel closed");
    }

    fn require_synced(&self) -> Result<(), ClientError> {
        match self.state {
            ChannelState::Synced => Ok(()),
            ChannelState::Closed => Err(ClientError::ChannelClosed),
            other => Err(ClientError::Validation(format!(
                "config channel is not synced (state {:?})",
                other
            ))),
        }
    }

    async fn receive(&mut self, timeout: Option<Duration>) -> Result<Option<Config>, ClientError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.next_config())
                .await
                .map_err(|_| {
                    ClientError::ConfigSync(format!("no config received within {:?}", limit))
                })?,
            None => self.next_config().await,
        }
    }

    async fn next_config(&mut self) -> Result<Option<Config>, ClientError> {
        if let Inbound::Pending(call) = &mut self.inbound {
            let response = call
                .await
                .map_err(|e| ClientError::ChannelOpen(format!("config stream task failed: {}", e)))?
                .map_err(|status| {
                    ClientError::ChannelOpen(format!(
                        "ConfigUpdater refused ({:?}): {}",
                        status.code(),
                        status.message()
                    ))
                })?;
            self.inbound = Inbound::Streaming(response.into_inner());
        }

        let Inbound::Streaming(stream) = &mut self.inbound else {
            return Err(ClientError::ChannelClosed);
        };

        stream.message().await.map_err(|status| {
            ClientError::ConfigSync(format!(
                "config stream failed ({:?}): {}",
                status.code(),
                status.message()
            ))
        })
    }
}

impl Drop for ConfigChannel {
    fn drop(&mut self) {
        self.close();
    }
}
