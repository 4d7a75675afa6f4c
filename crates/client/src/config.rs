use crate::error::ClientError;
use crate::geometry::{CropRect, PixelPoint};
use clap::{ArgAction, Parser};
use schema::DetectionLine;
use std::path::PathBuf;
use std::time::Duration;

pub use common::Environment;

/// Immutable run configuration, from flags with environment fallbacks.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "client",
    version,
    about = "Submit a plate detection to the recognition engine"
)]
pub struct ClientConfig {
    /// Engine hostname
    #[arg(long, env = "CLIENT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Engine port
    #[arg(long, env = "CLIENT_PORT", default_value = "50051")]
    pub port: String,

    /// Image to submit (any supported format, re-encoded to JPEG)
    #[arg(long, env = "CLIENT_FILE", default_value = "sample.jpg")]
    pub file: PathBuf,

    /// Left edge of the crop rectangle
    #[arg(short, env = "CLIENT_X", default_value_t = 0, allow_negative_numbers = true)]
    pub x: i32,

    /// Top edge of the crop rectangle
    #[arg(short, env = "CLIENT_Y", default_value_t = 0, allow_negative_numbers = true)]
    pub y: i32,

    /// Width of the crop rectangle
    #[arg(long, env = "CLIENT_WIDTH", default_value_t = 4032, allow_negative_numbers = true)]
    pub width: i32,

    /// Height of the crop rectangle
    #[arg(long, env = "CLIENT_HEIGHT", default_value_t = 3024, allow_negative_numbers = true)]
    pub height: i32,

    /// Id of the detection line attached to the config and referenced by the submission
    #[arg(long, env = "CLIENT_LINE_ID", default_value_t = 1)]
    pub line_id: i32,

    /// Detection line start, as `x,y`
    #[arg(long, env = "CLIENT_LINE_BEGIN", default_value = "1,1")]
    pub line_begin: PixelPoint,

    /// Detection line end, as `x,y`
    #[arg(long, env = "CLIENT_LINE_END", default_value = "416,416")]
    pub line_end: PixelPoint,

    /// Message sent on the config channel before the first config is expected
    #[arg(long, env = "CLIENT_HANDSHAKE_MESSAGE", default_value = "Channel opened!")]
    pub handshake_message: String,

    /// How many times the handshake message is sent
    #[arg(long, env = "CLIENT_HANDSHAKE_COUNT", default_value_t = 2)]
    pub handshake_count: u32,

    /// Deadline for the detection call, in milliseconds
    #[arg(long, env = "CLIENT_DEADLINE_MS", default_value_t = 60_000)]
    pub deadline_ms: u64,

    /// Connection timeout, in milliseconds
    #[arg(long, env = "CLIENT_CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    /// Give up waiting for the first config after this many milliseconds.
    /// Unset waits forever.
    #[arg(long, env = "CLIENT_SYNC_TIMEOUT_MS")]
    pub sync_timeout_ms: Option<u64>,

    /// Publish the config again after the detection was accepted
    #[arg(long, env = "CLIENT_REPUBLISH", default_value_t = true, action = ArgAction::Set)]
    pub republish: bool,

    /// Only follow config updates pushed by the engine; submit nothing
    #[arg(long, env = "CLIENT_WATCH")]
    pub watch: bool,

    /// Log format selector (`development` or `production`)
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: Environment,

    /// OTLP collector endpoint; enables trace and metric export when set
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,
}

impl ClientConfig {
    /// Parse flags and environment, exiting with usage on error.
    pub fn load() -> Self {
        Self::parse()
    }

    /// Checks everything that can be checked before touching the network.
    pub fn validate(&self) -> Result<(), ClientError> {
        for (name, value) in [("host", &self.host), ("port", &self.port)] {
            if value.trim().is_empty() {
                return Err(ClientError::Validation(format!("{} must not be empty", name)));
            }
        }

        if self.port.parse::<u16>().is_err() {
            return Err(ClientError::Validation(format!(
                "port must be a number between 0 and 65535, got `{}`",
                self.port
            )));
        }

        if !self.watch && self.file.as_os_str().is_empty() {
            return Err(ClientError::Validation("file must not be empty".to_string()));
        }

        if self.handshake_count == 0 {
            return Err(ClientError::Validation(
                "at least one handshake message is required".to_string(),
            ));
        }

        if self.deadline_ms == 0 {
            return Err(ClientError::Validation(
                "detection deadline must be greater than zero".to_string(),
            ));
        }

        self.crop_rect()?;
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn crop_rect(&self) -> Result<CropRect, ClientError> {
        CropRect::new(self.x, self.y, self.width, self.height)
    }

    /// The line attached to the synced config before submitting.
    pub fn detection_line(&self) -> DetectionLine {
        DetectionLine {
            id: self.line_id,
            begin: Some(self.line_begin.into()),
            end: Some(self.line_end.into()),
        }
    }

    pub fn handshake(&self) -> Vec<schema::Response> {
        (0..self.handshake_count)
            .map(|_| schema::Response::greeting(self.handshake_message.clone()))
            .collect()
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout_ms.map(Duration::from_millis)
    }
}
