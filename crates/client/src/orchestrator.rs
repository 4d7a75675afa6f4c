use crate::channel::ConfigChannel;
use crate::codec;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::geometry::CropRect;
use crate::lines::{LinePatch, SyncedConfig};
use crate::session::Session;
use crate::submitter::Submitter;

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub uid: String,
    pub line_id: i32,
    pub message: String,
    pub warning: Option<String>,
    pub publishes: u32,
}

/// Drives one run: connect, sync config, attach the line, publish, submit.
///
/// Every step short-circuits on failure. The session is released on every
/// exit path.
pub struct Orchestrator {
    config: ClientConfig,
}

impl Orchestrator {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs the full sequence for one already-encoded image payload.
    pub async fn run(&self, payload: Vec<u8>) -> Result<RunReport, ClientError> {
        let rect = self.config.crop_rect()?;

        let session = Session::open(&self.config.address(), self.config.connect_timeout()).await?;
        let result = self.submit_once(&session, payload, rect).await;
        session.close();

        result
    }

    /// Prepares the configured image as a JPEG payload, then runs the full
    /// sequence. An unreadable image fails before any connection is made.
    pub async fn run_file(&self) -> Result<RunReport, ClientError> {
        let payload = codec::load_payload(&self.config.file)?;
        self.run(payload).await
    }

    /// Syncs once, then logs every config the engine pushes until it ends the
    /// stream. Returns the number of updates seen after the initial sync.
    pub async fn watch(&self) -> Result<usize, ClientError> {
        let session = Session::open(&self.config.address(), self.config.connect_timeout()).await?;
        let result = self.follow_updates(&session).await;
        session.close();

        result
    }

    async fn open_synced(
        &self,
        session: &Session,
    ) -> Result<(ConfigChannel, SyncedConfig), ClientError> {
        let mut channel = ConfigChannel::new(session);
        channel.open()?;
        channel.handshake(self.config.handshake()).await?;
        let synced = channel.sync(self.config.sync_timeout()).await?;
        Ok((channel, synced))
    }

    async fn submit_once(
        &self,
        session: &Session,
        payload: Vec<u8>,
        rect: CropRect,
    ) -> Result<RunReport, ClientError> {
        let (mut channel, synced) = self.open_synced(session).await?;

        let line = self.config.detection_line();
        let line_id = line.id;
        let patched = LinePatch::Replace(vec![line]).apply(&synced)?;

        let mut publishes = 0;
        let published = channel.publish(&patched).await?;
        publishes += 1;

        // The accepted config is authoritative from here on.
        let mut submitter = Submitter::new(session);
        let outcome = submitter
            .submit(&published, payload, rect, line_id, self.config.deadline())
            .await?;

        if let Some(warning) = &outcome.warning {
            tracing::warn!("Warn: {}", warning);
        }

        if self.config.republish {
            channel.publish(&published).await?;
            publishes += 1;
        }

        channel.close();

        Ok(RunReport {
            uid: published.uid().to_string(),
            line_id,
            message: outcome.message,
            warning: outcome.warning,
            publishes,
        })
    }

    async fn follow_updates(&self, session: &Session) -> Result<usize, ClientError> {
        let (mut channel, _) = self.open_synced(session).await?;

        let mut updates = 0;
        while let Some(config) = channel.recv_update(None).await? {
            updates += 1;
            tracing::info!(
                update = updates,
                uid = %config.uid(),
                lines = ?config.line_ids(),
                "Hot reload"
            );
        }

        tracing::info!(updates, "Engine closed the config stream");
        Ok(updates)
    }
}
