/// Persistence of the last successful scrape time.
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contents of `state.json` in the mirror directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeState {
    /// Start time of the last completed scrape. `None` means never scraped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_scrape: Option<DateTime<Utc>>,
}

impl ScrapeState {
    /// Load from disk; a missing file means a fresh mirror.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid state JSON", path.display()))
    }

    /// Persist to disk.
    pub fn store(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string(self)?;
        fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Whether `reported` falls before the recorded last scrape. Always false
    /// for a fresh mirror.
    pub fn predates_last_scrape(&self, reported: DateTime<Utc>) -> bool {
        matches!(self.last_scrape, Some(last) if reported < last)
    }
}
