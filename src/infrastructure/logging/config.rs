use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

use crate::domain::models::config::LoggingSection;

/// Logging configuration used to build the subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Log file (optional, if None logs only to stdout)
    pub log_file: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy for the log file
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_file: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

impl LogConfig {
    /// Derive settings from a dictConfig-style `logging` section
    ///
    /// Reads `root.level` and the first handler that has a `filename`.
    /// Everything else in the section is left for the hosted plugin.
    pub fn from_section(section: &LoggingSection) -> Self {
        let mut config = Self::default();
        if let Some(level) = section.get(&["root", "level"]).and_then(level_name) {
            config.level = level.to_string();
        }

        let Some(handlers) = section.get(&["handlers"]).and_then(Value::as_mapping) else {
            return config;
        };

        let mut has_stream = false;
        for handler in handlers.values().filter_map(Value::as_mapping) {
            let class = handler.get("class").and_then(Value::as_str).unwrap_or_default();
            if class.ends_with("StreamHandler") {
                has_stream = true;
            }
            if config.log_file.is_some() {
                continue;
            }
            if let Some(filename) = handler.get("filename").and_then(Value::as_str) {
                config.log_file = Some(PathBuf::from(filename));
                config.rotation = rotation_for(class, handler.get("when").and_then(Value::as_str));
            }
        }
        config.enable_stdout = has_stream || config.log_file.is_none();
        config
    }

    /// Directory and file name of the log file
    pub fn file_parts(&self) -> Option<(&Path, &str)> {
        let file = self.log_file.as_deref()?;
        let name = file.file_name()?.to_str()?;
        let dir = file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Some((dir, name))
    }
}

/// Map a Python-style level (name or number) onto a tracing level name
fn level_name(value: &Value) -> Option<&'static str> {
    if let Some(number) = value.as_u64() {
        return Some(match number {
            0..=5 => "trace",
            6..=10 => "debug",
            11..=20 => "info",
            21..=30 => "warn",
            _ => "error",
        });
    }
    match value.as_str()?.to_ascii_uppercase().as_str() {
        "NOTSET" | "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" | "WARNING" => Some("warn"),
        "ERROR" | "CRITICAL" | "FATAL" => Some("error"),
        _ => None,
    }
}

fn rotation_for(class: &str, when: Option<&str>) -> RotationPolicy {
    if class.ends_with("TimedRotatingFileHandler") {
        match when.map(str::to_ascii_uppercase).as_deref() {
            Some("H" | "M" | "S") => RotationPolicy::Hourly,
            _ => RotationPolicy::Daily,
        }
    } else if class.ends_with("RotatingFileHandler") {
        RotationPolicy::Daily
    } else {
        RotationPolicy::Never
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_format() -> LogFormat {
    LogFormat::Json
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(yaml: &str) -> LoggingSection {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_empty_section_uses_defaults() {
        let config = LogConfig::from_section(&LoggingSection::default());
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_root_level_names() {
        let config = LogConfig::from_section(&section("root:\n  level: WARNING\n"));
        assert_eq!(config.level, "warn");
        let config = LogConfig::from_section(&section("root:\n  level: 10\n"));
        assert_eq!(config.level, "debug");
        let config = LogConfig::from_section(&section("root:\n  level: LOUD\n"));
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_file_handler() {
        let config = LogConfig::from_section(&section(
            r"
handlers:
  console:
    class: logging.StreamHandler
  file:
    class: logging.handlers.TimedRotatingFileHandler
    filename: ./logs/bot.log
    when: H
",
        ));
        assert_eq!(config.log_file, Some(PathBuf::from("./logs/bot.log")));
        assert_eq!(config.rotation, RotationPolicy::Hourly);
        assert!(config.enable_stdout);
        assert_eq!(config.file_parts(), Some((Path::new("./logs"), "bot.log")));
    }

    #[test]
    fn test_file_only_disables_stdout() {
        let config = LogConfig::from_section(&section(
            "handlers:\n  file:\n    class: logging.FileHandler\n    filename: bot.log\n",
        ));
        assert!(!config.enable_stdout);
        assert_eq!(config.rotation, RotationPolicy::Never);
        assert_eq!(config.file_parts(), Some((Path::new("."), "bot.log")));
    }
}
