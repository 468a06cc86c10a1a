//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::calculate::benchmark::BenchmarkRules;
use crate::calculate::labels::LabelRules;
use crate::calculate::lineup::PeriodLengths;
use crate::models::Season;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Derivation engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prior games in the last-N rolling window
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    #[serde(default = "default_regulation_periods")]
    pub regulation_periods: u8,

    /// Regulation period length in seconds (10-minute quarters)
    #[serde(default = "default_regulation_period_secs")]
    pub regulation_period_secs: u32,

    #[serde(default = "default_overtime_period_secs")]
    pub overtime_period_secs: u32,
}

fn default_rolling_window() -> usize {
    5
}

fn default_regulation_periods() -> u8 {
    4
}

fn default_regulation_period_secs() -> u32 {
    600
}

fn default_overtime_period_secs() -> u32 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            regulation_periods: default_regulation_periods(),
            regulation_period_secs: default_regulation_period_secs(),
            overtime_period_secs: default_overtime_period_secs(),
        }
    }
}

impl EngineConfig {
    pub fn period_lengths(&self) -> PeriodLengths {
        PeriodLengths {
            regulation_periods: self.regulation_periods,
            regulation_secs: self.regulation_period_secs,
            overtime_secs: self.overtime_period_secs,
        }
    }
}

/// Benchmark population settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarksConfig {
    #[serde(default = "default_min_population")]
    pub min_population: usize,

    #[serde(default = "default_min_player_minutes")]
    pub min_player_minutes: f64,

    #[serde(default = "default_min_player_fga")]
    pub min_player_fga: u32,

    /// Rank every season against this season's distributions
    #[serde(default)]
    pub reference_season: Option<Season>,
}

fn default_min_population() -> usize {
    10
}

fn default_min_player_minutes() -> f64 {
    10.0
}

fn default_min_player_fga() -> u32 {
    5
}

impl Default for BenchmarksConfig {
    fn default() -> Self {
        Self {
            min_population: default_min_population(),
            min_player_minutes: default_min_player_minutes(),
            min_player_fga: default_min_player_fga(),
            reference_season: None,
        }
    }
}

impl BenchmarksConfig {
    pub fn rules(&self) -> BenchmarkRules {
        BenchmarkRules {
            min_population: self.min_population,
            min_player_minutes: self.min_player_minutes,
            min_player_fga: self.min_player_fga,
        }
    }
}

/// Label thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Minimum percentile differential for a why-team-won driver
    #[serde(default = "default_why_won_threshold")]
    pub why_won_threshold: f64,

    #[serde(default = "default_why_won_max")]
    pub why_won_max: usize,

    #[serde(default = "default_blowout_margin")]
    pub blowout_margin: u32,

    #[serde(default = "default_close_margin")]
    pub close_margin: u32,

    #[serde(default = "default_upset_rank_diff")]
    pub upset_rank_diff: u8,
}

fn default_why_won_threshold() -> f64 {
    15.0
}

fn default_why_won_max() -> usize {
    3
}

fn default_blowout_margin() -> u32 {
    20
}

fn default_close_margin() -> u32 {
    5
}

fn default_upset_rank_diff() -> u8 {
    10
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            why_won_threshold: default_why_won_threshold(),
            why_won_max: default_why_won_max(),
            blowout_margin: default_blowout_margin(),
            close_margin: default_close_margin(),
            upset_rank_diff: default_upset_rank_diff(),
        }
    }
}

impl LabelsConfig {
    pub fn rules(&self) -> LabelRules {
        LabelRules {
            why_won_threshold: self.why_won_threshold,
            why_won_max: self.why_won_max,
            blowout_margin: self.blowout_margin,
            close_margin: self.close_margin,
            upset_rank_diff: self.upset_rank_diff,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub benchmarks: BenchmarksConfig,

    #[serde(default)]
    pub labels: LabelsConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            engine: EngineConfig::default(),
            benchmarks: BenchmarksConfig::default(),
            labels: LabelsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.engine.rolling_window == 0 {
            return invalid("Rolling window must be greater than 0");
        }
        if self.engine.regulation_periods == 0 {
            return invalid("Regulation periods must be greater than 0");
        }
        if self.engine.regulation_period_secs == 0 || self.engine.overtime_period_secs == 0 {
            return invalid("Period lengths must be greater than 0");
        }
        if self.benchmarks.min_population == 0 {
            return invalid("Benchmark minimum population must be greater than 0");
        }
        if !self.benchmarks.min_player_minutes.is_finite()
            || self.benchmarks.min_player_minutes < 0.0
        {
            return invalid("Minimum player minutes must be a non-negative number");
        }
        if !(0.0..=100.0).contains(&self.labels.why_won_threshold) {
            return invalid("Why-won threshold must be within 0-100");
        }
        if self.labels.close_margin >= self.labels.blowout_margin {
            return invalid("Close margin must be below blowout margin");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.engine.rolling_window, 5);
        assert_eq!(config.benchmarks.min_population, 10);
        assert_eq!(config.labels.why_won_threshold, 15.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rules_match_engine_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.engine.period_lengths(), PeriodLengths::default());
        assert_eq!(config.benchmarks.rules(), BenchmarkRules::default());
        assert_eq!(config.labels.rules(), LabelRules::default());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = AppConfig::default();
        config.engine.rolling_window = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.labels.close_margin = 25;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.benchmarks.min_player_minutes = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
data_dir = "/srv/scout"

[benchmarks]
reference_season = 2024

[labels]
why_won_threshold = 20.0
"#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/scout"));
        assert_eq!(config.benchmarks.reference_season, Some(2024));
        assert_eq!(config.benchmarks.min_player_fga, 5);
        assert_eq!(config.labels.why_won_threshold, 20.0);
        assert_eq!(config.labels.why_won_max, 3);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let mut config = AppConfig::default();
        config.benchmarks.reference_season = Some(2024);
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_or_default() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert_eq!(AppConfig::load_or_default(&missing).unwrap(), AppConfig::default());

        let bad = temp_dir.path().join("bad.toml");
        std::fs::write(&bad, "[engine]\nrolling_window = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_or_default(&bad),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
