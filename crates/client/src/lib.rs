pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod geometry;
pub mod lines;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod session;
pub mod submitter;

pub use channel::{ChannelState, ConfigChannel};
pub use config::ClientConfig;
pub use error::{ClientError, SubmissionKind};
pub use geometry::{CropRect, PixelPoint};
pub use lines::{LinePatch, SyncedConfig};
pub use orchestrator::{Orchestrator, RunReport};
pub use session::Session;
pub use submitter::{DetectionOutcome, Submitter};
