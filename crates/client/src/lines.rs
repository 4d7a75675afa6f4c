//! Reconciliation of locally attached detection lines against the
//! server-issued configuration.
//!
//! A [`SyncedConfig`] is only ever built from a config the server sent (or
//! accepted), so its uid is always server-issued. Local changes go through a
//! [`LinePatch`], which returns a new value instead of editing in place.

use crate::error::ClientError;
use schema::{Config, DetectionLine};
use std::collections::BTreeSet;

/// A server-issued config with a non-empty uid and unique line ids.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedConfig {
    inner: Config,
}

impl SyncedConfig {
    /// Accepts a config received from the engine.
    pub fn from_server(config: Config) -> Result<Self, ClientError> {
        check(&config).map_err(ClientError::ConfigSync)?;
        Ok(Self { inner: config })
    }

    pub fn uid(&self) -> &str {
        &self.inner.uid
    }

    pub fn lines(&self) -> &[DetectionLine] {
        &self.inner.detection_lines
    }

    pub fn line_ids(&self) -> BTreeSet<i32> {
        self.inner.detection_lines.iter().map(|l| l.id).collect()
    }

    pub fn contains_line(&self, id: i32) -> bool {
        self.inner.detection_lines.iter().any(|l| l.id == id)
    }

    pub fn as_wire(&self) -> &Config {
        &self.inner
    }
}

/// A local change to the detection line set of a synced config.
#[derive(Debug, Clone, PartialEq)]
pub enum LinePatch {
    /// Drop every line and attach these instead.
    Replace(Vec<DetectionLine>),
    /// Replace the line with the same id, or append it.
    Upsert(DetectionLine),
    /// Remove the line with this id if present.
    Remove(i32),
}

impl LinePatch {
    pub fn apply(&self, base: &SyncedConfig) -> Result<SyncedConfig, ClientError> {
        let mut config = base.inner.clone();

        match self {
            LinePatch::Replace(lines) => {
                config.detection_lines = lines.clone();
            }
            LinePatch::Upsert(line) => {
                match config.detection_lines.iter_mut().find(|l| l.id == line.id) {
                    Some(existing) => *existing = line.clone(),
                    None => config.detection_lines.push(line.clone()),
                }
            }
            LinePatch::Remove(id) => {
                config.detection_lines.retain(|l| l.id != *id);
            }
        }

        check(&config).map_err(ClientError::Validation)?;
        Ok(SyncedConfig { inner: config })
    }
}

fn check(config: &Config) -> Result<(), String> {
    if config.uid.is_empty() {
        return Err("config has an empty uid".to_string());
    }

    let mut seen = BTreeSet::new();
    for line in &config.detection_lines {
        if !seen.insert(line.id) {
            return Err(format!("duplicate detection line id {}", line.id));
        }
    }

    Ok(())
}
