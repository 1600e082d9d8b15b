//! Application configuration
//!
//! Loaded from a YAML file; every field has a default, so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ingest::PollSchedule;
use crate::ole::codepage::{DEFAULT_CODEPAGE, codepage_to_encoding};
use crate::schedule::{ScheduleAggregator, Tables};

/// Settings shared by the `parse` and `watch` commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Schedule file URLs polled by `watch`
    pub sources: Vec<String>,
    /// Directory the snapshot keys are written to
    pub out_dir: PathBuf,
    /// Codepage for workbooks that do not declare one
    pub fallback_codepage: u16,
    pub poll: PollSchedule,
    /// Replacement lookup tables; the built-in ones when absent
    pub tables: Option<Tables>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sources: vec![
                "https://msu.tj/file/timetable/enf.xls".to_string(),
                "https://msu.tj/file/timetable/gf.xls".to_string(),
            ],
            out_dir: PathBuf::from("snapshot"),
            fallback_codepage: DEFAULT_CODEPAGE,
            poll: PollSchedule::default(),
            tables: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        let config: AppConfig = serde_saphyr::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if codepage_to_encoding(self.fallback_codepage).is_none() {
            return Err(Error::Config(format!(
                "unsupported fallback codepage {}",
                self.fallback_codepage
            )));
        }
        if self.poll.day_start > 24 || self.poll.day_end > 24 {
            return Err(Error::Config("poll hours must be within 0..=24".to_string()));
        }
        Ok(())
    }

    /// Aggregator over the configured tables and fallback codepage
    pub fn aggregator(&self) -> Result<ScheduleAggregator> {
        let aggregator = match &self.tables {
            Some(tables) => ScheduleAggregator::new(tables.clone())?,
            None => ScheduleAggregator::default(),
        };
        Ok(aggregator.with_codepage(self.fallback_codepage))
    }
}
