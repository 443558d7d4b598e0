//! smellscale.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::decay::DEFAULT_HALF_LIFE_HOURS;
use crate::schedule::{ScheduleEntry, default_schedule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScaleConfig {
    /// Hours after which a vote's weight halves.
    pub half_life_hours: f64,
    /// Daily base-adjustment schedule.
    pub schedule: Vec<ScheduleEntry>,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            half_life_hours: DEFAULT_HALF_LIFE_HOURS,
            schedule: default_schedule(),
        }
    }
}

impl ScaleConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScaleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.half_life_hours.is_finite() || self.half_life_hours <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "half_life_hours must be a positive number, got {}",
                self.half_life_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BaseAction;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ScaleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScaleConfig::default());
        assert_eq!(config.half_life_hours, 1.0);
        assert_eq!(config.schedule.len(), 7);
    }

    #[test]
    fn parse_custom_schedule() {
        let toml_str = r#"
half_life_hours = 2

[[schedule]]
time = "06:00"
action = "set"
value = 3

[[schedule]]
time = "18:30"
action = "change"
value = +1.5
"#;
        let config = ScaleConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.half_life_hours, 2.0);
        assert_eq!(config.schedule.len(), 2);
        assert_eq!(config.schedule[0].action, BaseAction::Set(3.0));
        assert_eq!(config.schedule[1].action, BaseAction::Change(1.5));
    }

    #[test]
    fn empty_schedule_is_allowed() {
        let config = ScaleConfig::from_toml_str("schedule = []").unwrap();
        assert!(config.schedule.is_empty());
    }

    #[test]
    fn rejects_non_positive_half_life() {
        let err = ScaleConfig::from_toml_str("half_life_hours = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_schedule_time() {
        let toml_str = r#"
[[schedule]]
time = "7pm"
action = "change"
value = 1
"#;
        assert!(matches!(
            ScaleConfig::from_toml_str(toml_str),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn render_and_reparse() {
        let config = ScaleConfig::default();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("half_life_hours"));
        assert!(rendered.contains("\"22:00\""));
        assert_eq!(ScaleConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smellscale.toml");
        std::fs::write(&path, "half_life_hours = 1.5\n").unwrap();
        let config = ScaleConfig::from_file(&path).unwrap();
        assert_eq!(config.half_life_hours, 1.5);
    }
}
