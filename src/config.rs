//! Pipeline configuration: indirect pool, attribution mode, overhead table
//! and which extra sources are merged in.

use crate::channel::ChannelLabel;
use crate::mapping::{AttributionMode, ChannelMapping};
use crate::overhead::{OverheadEntry, OverheadTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Indirect cost pool of the reference deployment.
pub const DEFAULT_INDIRECT_POOL: f64 = 10_000.0;

/// Which "extra" record sets are fetched and merged into their base source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraSources {
    pub customers: bool,
    pub spend: bool,
    pub touchpoints: bool,
}

/// Configuration for one cost pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_indirect_pool")]
    pub total_indirect_pool: f64,
    pub attribution: AttributionMode,
    #[serde(default)]
    pub overhead: OverheadTable,
    #[serde(default)]
    pub extra_sources: ExtraSources,
}

fn default_indirect_pool() -> f64 {
    DEFAULT_INDIRECT_POOL
}

impl PipelineConfig {
    pub fn new(attribution: AttributionMode, overhead: OverheadTable) -> Self {
        PipelineConfig {
            total_indirect_pool: DEFAULT_INDIRECT_POOL,
            attribution,
            overhead,
            extra_sources: ExtraSources::default(),
        }
    }

    /// Simple-mode reference deployment: one vocabulary for acquisition and
    /// touchpoint channels, no extra sources.
    pub fn reference_simple() -> Result<Self, ConfigError> {
        let overhead = overhead_table(&[
            ("Email", 400.0, 600.0, 300.0),
            ("Facebook", 1200.0, 1000.0, 800.0),
            ("Google", 1800.0, 1500.0, 1000.0),
            ("Instagram", 1500.0, 1400.0, 900.0),
            ("TikTok", 1000.0, 1200.0, 1100.0),
            ("Walk-in", 2500.0, 400.0, 300.0),
            ("Direct", 800.0, 700.0, 500.0),
        ])?;

        Ok(PipelineConfig::new(AttributionMode::Simple, overhead))
    }

    /// Mapped-mode reference deployment: Referral and Social Media
    /// acquisitions are credited through their touchpoint channels, and the
    /// extra customer and touchpoint sources are merged in.
    pub fn reference_mapped() -> Result<Self, ConfigError> {
        let direct_channels = ["Direct", "Email", "Facebook", "Google", "Instagram", "TikTok"]
            .into_iter()
            .map(label)
            .collect::<Result<Vec<_>, _>>()?;
        let mut mapping = ChannelMapping::identity(direct_channels);
        mapping.insert(label("Referral")?, vec![label("Walk-in")?, label("Direct")?]);
        mapping.insert(
            label("Social Media")?,
            vec![
                label("Instagram")?,
                label("Facebook")?,
                label("TikTok")?,
                label("Walk-in")?,
            ],
        );

        let overhead = overhead_table(&[
            ("Direct", 800.0, 700.0, 500.0),
            ("Email", 400.0, 600.0, 300.0),
            ("Facebook", 1200.0, 1000.0, 800.0),
            ("Google", 1800.0, 1500.0, 1000.0),
            ("Instagram", 1500.0, 1400.0, 900.0),
            ("Referral", 1000.0, 800.0, 600.0),
            ("Social Media", 1100.0, 900.0, 700.0),
            ("TikTok", 1000.0, 1200.0, 1100.0),
        ])?;

        let mut config = PipelineConfig::new(AttributionMode::Mapped { mapping }, overhead);
        config.extra_sources = ExtraSources {
            customers: true,
            spend: false,
            touchpoints: true,
        };
        Ok(config)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    /// Checks that the pool and every overhead figure are finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.total_indirect_pool.is_finite() || self.total_indirect_pool < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "total_indirect_pool must be finite and non-negative, got {}",
                self.total_indirect_pool
            )));
        }

        if let Some(channel) = self.overhead.find_invalid() {
            return Err(ConfigError::Invalid(format!(
                "overhead for channel '{}' must be finite and non-negative",
                channel
            )));
        }

        Ok(())
    }
}

fn label(name: &str) -> Result<ChannelLabel, ConfigError> {
    ChannelLabel::new(name).map_err(|e| ConfigError::Invalid(e.to_string()))
}

fn overhead_table(rows: &[(&str, f64, f64, f64)]) -> Result<OverheadTable, ConfigError> {
    rows.iter()
        .map(|(channel, staff, technology, returns)| {
            Ok((
                label(channel)?,
                OverheadEntry::new(*staff, *technology, *returns),
            ))
        })
        .collect()
}

/// Errors that can occur when loading a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io(String),
    /// The configuration is not valid JSON for this schema
    Parse(String),
    /// The configuration parsed but holds unusable values
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Failed to read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
