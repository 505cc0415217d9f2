use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{warn, Level};

use crate::estimate::WORLD_CARBON_INTENSITY;

const APP_DIR: &str = "carbon-track";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Where log output goes. Stdout is reserved for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    File,
    Both,
}

fn default_project_name() -> String {
    "GreenQuest".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    pub measure_power_secs: u64,
    /// Grid carbon intensity in kg CO2eq per kWh.
    pub carbon_intensity: f64,
    pub log_level: LogLevel,
    pub log_output: LogOutput,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            measure_power_secs: 1,
            carbon_intensity: WORLD_CARBON_INTENSITY,
            log_level: LogLevel::Warn,
            log_output: LogOutput::Stderr,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join(APP_DIR)
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR)
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl UserConfig {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let config: Self = toml::from_str(content).unwrap_or_default();
        config.sanitized()
    }

    /// Replaces values that would make reports meaningless with defaults.
    fn sanitized(mut self) -> Self {
        if !self.carbon_intensity.is_finite() || self.carbon_intensity < 0.0 {
            warn!(
                carbon_intensity = self.carbon_intensity,
                "Ignoring invalid carbon_intensity in config"
            );
            self.carbon_intensity = WORLD_CARBON_INTENSITY;
        }
        self
    }

    /// Sampling interval for the power tracker, at least one second.
    pub fn measure_power_interval(&self) -> Duration {
        Duration::from_secs(self.measure_power_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = UserConfig::default();
        assert_eq!(config.project_name, "GreenQuest");
        assert_eq!(config.measure_power_interval(), Duration::from_secs(1));
        assert_eq!(config.carbon_intensity, 0.475);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_output, LogOutput::Stderr);
    }

    #[test]
    fn test_partial_toml() {
        let config = UserConfig::parse(
            r#"
            carbon_intensity = 0.233
            log_level = "debug"
            log_output = "both"
            "#,
        );
        assert_eq!(config.carbon_intensity, 0.233);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_output, LogOutput::Both);
        assert_eq!(config.project_name, "GreenQuest");
        assert_eq!(config.measure_power_secs, 1);
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        assert_eq!(UserConfig::parse("log_level = 7"), UserConfig::default());
        assert_eq!(UserConfig::parse("not = [toml"), UserConfig::default());
    }

    #[test]
    fn test_invalid_carbon_intensity_reset() {
        for content in [
            "carbon_intensity = nan",
            "carbon_intensity = inf",
            "carbon_intensity = -2.0",
        ] {
            let config = UserConfig::parse(content);
            assert_eq!(config.carbon_intensity, WORLD_CARBON_INTENSITY, "{}", content);
        }

        let config = UserConfig::parse("carbon_intensity = 0.0\nproject_name = \"Lab\"");
        assert_eq!(config.carbon_intensity, 0.0);
        assert_eq!(config.project_name, "Lab");
    }

    #[test]
    fn test_zero_interval_clamped() {
        let config = UserConfig::parse("measure_power_secs = 0");
        assert_eq!(config.measure_power_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = UserConfig::load_from(&dir.path().join("config.toml"));
        assert_eq!(config, UserConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "project_name = \"Lab\"\nmeasure_power_secs = 5\n").unwrap();

        let config = UserConfig::load_from(&path);
        assert_eq!(config.project_name, "Lab");
        assert_eq!(config.measure_power_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Off.as_tracing_level(), None);
        assert_eq!(LogLevel::Info.as_tracing_level(), Some(Level::INFO));
    }
}
