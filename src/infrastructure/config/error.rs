use figment::error::Kind;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error types
///
/// Every variant is fatal: the host refuses to start on any of them.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Syntax error{}: {message}", location(.line, .column))]
    Syntax {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    #[error("Missing required field `{path}`")]
    MissingField { path: String },

    #[error("Type mismatch at `{path}`: expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid value at `{path}`: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("`{first}` conflicts with `{second}`: {rule}")]
    CrossField {
        first: String,
        second: String,
        rule: String,
    },

    #[error("Unknown top-level key `{key}` (strict mode)")]
    UnknownKey { key: String },

    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

impl ConfigError {
    /// Short machine-readable name of the error class
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::MissingField { .. } => "missing_field",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidValue { .. } => "invalid_value",
            Self::CrossField { .. } => "cross_field",
            Self::UnknownKey { .. } => "unknown_key",
            Self::Io { .. } => "io",
            Self::Serialize(_) => "serialize",
        }
    }

    /// Dotted path of the offending field, when the error concerns one field
    pub fn field_path(&self) -> Option<&str> {
        match self {
            Self::MissingField { path }
            | Self::TypeMismatch { path, .. }
            | Self::InvalidValue { path, .. } => Some(path),
            Self::UnknownKey { key } => Some(key),
            _ => None,
        }
    }

    pub(crate) fn missing(path: &str) -> Self {
        Self::MissingField {
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn cross(first: &str, second: &str, rule: impl Into<String>) -> Self {
        Self::CrossField {
            first: first.to_string(),
            second: second.to_string(),
            rule: rule.into(),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        let location = err.location();
        let message = err.to_string();
        // Integers beyond 64 bits fail while parsing, before any field sees them
        if message.contains(" as u128") || message.contains(" as i128") {
            let path = message
                .split_once(": ")
                .map(|(path, _)| path)
                .filter(|path| !path.contains(char::is_whitespace))
                .unwrap_or("<root>");
            return Self::invalid(path, "integer out of range");
        }
        Self::Syntax {
            message,
            line: location.as_ref().map(serde_yaml::Location::line),
            column: location.as_ref().map(serde_yaml::Location::column),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        let mut path = err.path.join(".");
        match err.kind {
            Kind::MissingField(field) => {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(&field);
                Self::MissingField { path }
            }
            Kind::InvalidType(actual, expected) => Self::TypeMismatch {
                path: display_path(path),
                expected,
                actual: actual.to_string(),
            },
            Kind::InvalidValue(actual, expected) => Self::InvalidValue {
                path: display_path(path),
                reason: format!("{actual} is not {expected}"),
            },
            Kind::Message(message) => Self::InvalidValue {
                path: display_path(path),
                reason: message,
            },
            other => Self::InvalidValue {
                path: display_path(path),
                reason: other.to_string(),
            },
        }
    }
}

fn display_path(path: String) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path
    }
}

fn location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {line} column {column}"),
        (Some(line), None) => format!(" at line {line}"),
        _ => String::new(),
    }
}
