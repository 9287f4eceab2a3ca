use figment::providers::{Env, Serialized};
use figment::Figment;
use serde_yaml::{Mapping, Value};
use std::net::IpAddr;
use std::path::Path;

use super::error::ConfigError;
use crate::domain::models::config::{BotConfig, LoggingSection};
use crate::domain::models::database::DatabaseBackend;

/// Annotated example document written by `bothost init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../../config/example.yaml");

/// Fields that must be present and non-empty
const REQUIRED_FIELDS: &[&str] = &[
    "user.credentials.id",
    "user.credentials.homeserver",
    "user.credentials.access_token",
    "database",
];

/// Fields whose environment overrides are kept as text
const STRING_FIELDS: &[&str] = &[
    "user.credentials.id",
    "user.credentials.homeserver",
    "user.credentials.access_token",
    "user.credentials.device_id",
    "user.hs_token",
    "user.displayname",
    "user.avatar_url",
    "server.hostname",
    "server.base_path",
    "server.public_url",
    "server.log_token",
    "database",
];

/// Sections handed to their consumers untouched
const OPAQUE_SECTIONS: &[&str] = &["plugin_config", "logging"];

/// Options controlling how a document is loaded
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Reject unknown top-level keys instead of ignoring them
    pub strict: bool,

    /// Environment variable prefix for overrides (e.g. `BOTHOST_`);
    /// nested keys are separated by `__`
    pub env_prefix: Option<String>,
}

impl LoadOptions {
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }
}

/// Configuration loader
///
/// Loading is a pure parse-and-validate step: the only I/O is reading the
/// document (and the environment, when overrides are enabled).
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub fn load_from_file(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<BotConfig, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::load_from_str(&source, options)?;
        tracing::debug!(path = %path.display(), user = %config.user.credentials.id, "configuration loaded");
        Ok(config)
    }

    /// Load configuration from YAML text
    ///
    /// Precedence (lowest to highest):
    /// 1. The document
    /// 2. Environment variables (`<prefix>SECTION__KEY`), if a prefix is set
    pub fn load_from_str(source: &str, options: &LoadOptions) -> Result<BotConfig, ConfigError> {
        let mut document = Self::parse_document(source)?;
        if options.strict {
            Self::check_unknown_keys(&document)?;
        }

        // Opaque sections bypass figment so they reach their consumers verbatim
        let plugin_config = take_opaque_section(&mut document, "plugin_config")?;
        let logging = take_opaque_section(&mut document, "logging")?;
        document.retain(|key, _| {
            key.as_str()
                .is_some_and(|key| BotConfig::KNOWN_KEYS.contains(&key))
        });

        let mut figment = Figment::new().merge(Serialized::defaults(document));
        if let Some(prefix) = &options.env_prefix {
            figment = Self::merge_env(figment, prefix);
        }

        Self::check_required(&figment)?;
        let mut config: BotConfig = figment.extract()?;
        config.plugin_config = plugin_config;
        config.logging = LoggingSection(logging);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Layer `<prefix>SECTION__KEY` variables over the document
    ///
    /// Values for text fields are taken as written; everything else is parsed
    /// the way figment parses environment values. The opaque sections cannot
    /// be overridden.
    fn merge_env(mut figment: Figment, prefix: &str) -> Figment {
        let env = Env::prefixed(prefix).split("__");
        for (key, value) in env.iter() {
            if STRING_FIELDS.contains(&key.as_str()) {
                figment = figment.merge(Serialized::default(key.as_str(), value));
            }
        }

        figment.merge(env.filter(|key| {
            let key = key.as_str().to_ascii_lowercase();
            !STRING_FIELDS.contains(&key.as_str()) && !is_opaque_path(&key)
        }))
    }

    /// Parse the raw document, surfacing syntax errors with their location
    fn parse_document(source: &str) -> Result<Mapping, ConfigError> {
        let blank = source.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            return Ok(Mapping::new());
        }
        match serde_yaml::from_str::<Value>(source)? {
            Value::Mapping(mapping) => Ok(mapping),
            Value::Null => Ok(Mapping::new()),
            other => Err(ConfigError::TypeMismatch {
                path: "<root>".to_string(),
                expected: "a mapping".to_string(),
                actual: describe(&other).to_string(),
            }),
        }
    }

    fn check_unknown_keys(document: &Mapping) -> Result<(), ConfigError> {
        for key in document.keys() {
            let known = key
                .as_str()
                .is_some_and(|key| BotConfig::KNOWN_KEYS.contains(&key));
            if !known {
                return Err(ConfigError::UnknownKey { key: key_text(key) });
            }
        }
        Ok(())
    }

    /// Required fields must exist in the merged sources and not be blank
    fn check_required(figment: &Figment) -> Result<(), ConfigError> {
        for path in REQUIRED_FIELDS {
            let value = match figment.find_value(path) {
                Ok(value) => value,
                Err(err) if err.missing() => return Err(ConfigError::missing(path)),
                Err(err) => return Err(err.into()),
            };
            let blank = matches!(value, figment::value::Value::Empty(..))
                || value.as_str().is_some_and(|s| s.trim().is_empty());
            if blank {
                return Err(ConfigError::missing(path));
            }
        }
        Ok(())
    }

    /// Validate cross-field rules and the values serde cannot check on its own
    pub fn validate(config: &BotConfig) -> Result<(), ConfigError> {
        let user = &config.user;
        let credentials = &user.credentials;

        if credentials.access_token.trim().is_empty() {
            return Err(ConfigError::missing("user.credentials.access_token"));
        }

        if credentials.device_id.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::invalid(
                "user.credentials.device_id",
                "must not be empty; use null to disable encryption",
            ));
        }

        if user.appservice {
            if user.hs_token.as_deref().is_none_or(|token| token.trim().is_empty()) {
                return Err(ConfigError::cross(
                    "user.appservice",
                    "user.hs_token",
                    "appservice mode requires hs_token to be set",
                ));
            }
            if !user.sync {
                return Err(ConfigError::cross(
                    "user.sync",
                    "user.appservice",
                    "appservice mode cannot be enabled while sync is disabled",
                ));
            }
        } else if user.hs_token.is_some() {
            tracing::warn!("user.hs_token is set but user.appservice is false; the token is ignored");
        }

        if let Some(server) = &config.server {
            if !is_valid_host(&server.hostname) {
                return Err(ConfigError::invalid(
                    "server.hostname",
                    format!("'{}' is not an IP address or hostname", server.hostname),
                ));
            }
            if server.log_token.as_deref().is_some_and(|token| token.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    "server.log_token",
                    "must not be empty; use null to disable the log stream",
                ));
            }
        }

        let opts = &config.database_opts;
        match config.database.backend() {
            DatabaseBackend::Postgres if opts.min_size > opts.max_size => {
                return Err(ConfigError::cross(
                    "database_opts.min_size",
                    "database_opts.max_size",
                    format!(
                        "min_size ({}) must not exceed max_size ({}) for Postgres",
                        opts.min_size, opts.max_size
                    ),
                ));
            }
            DatabaseBackend::Sqlite { .. } if opts.max_size != opts.min_size => {
                tracing::debug!(
                    min_size = opts.min_size.get(),
                    max_size = opts.max_size.get(),
                    "database_opts.max_size is ignored for SQLite"
                );
            }
            _ => {}
        }

        Ok(())
    }
}

impl BotConfig {
    /// Serialize back into the document form accepted by the loader
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }
}

/// Remove an opaque section from the document; absent and null mean empty
fn take_opaque_section(document: &mut Mapping, key: &str) -> Result<Mapping, ConfigError> {
    match document.shift_remove(key) {
        None | Some(Value::Null) => Ok(Mapping::new()),
        Some(Value::Mapping(mapping)) => Ok(mapping),
        Some(other) => Err(ConfigError::TypeMismatch {
            path: key.to_string(),
            expected: "a mapping".to_string(),
            actual: describe(&other).to_string(),
        }),
    }
}

/// Render a mapping key as it would appear in the document
fn key_text(key: &Value) -> String {
    match key {
        Value::String(key) => key.clone(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| format!("{other:?}"), |text| text.trim_end().to_string()),
    }
}

fn is_opaque_path(path: &str) -> bool {
    OPAQUE_SECTIONS.iter().any(|section| {
        path.strip_prefix(section)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}

fn is_valid_host(hostname: &str) -> bool {
    hostname.parse::<IpAddr>().is_ok() || url::Host::parse(hostname).is_ok()
}

const fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
