use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;
use std::num::{NonZeroU16, NonZeroU32};

use super::database::{DatabaseBackend, DatabaseUrl};
use super::identifiers::{BasePath, HttpUrl, UserId};

/// Sentinel value meaning "leave this profile field alone"
pub const PROFILE_SENTINEL: &str = "disable";

/// Root configuration for a standalone bot
///
/// Built once by the loader and never mutated; a reload produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BotConfig {
    /// Account and session settings
    pub user: UserConfig,

    /// Embedded web server; absent when no web server is wanted
    #[serde(default)]
    pub server: Option<ServerConfig>,

    /// Connection URI, scheme selects the backend
    pub database: DatabaseUrl,

    /// Connection pool sizing
    #[serde(default)]
    pub database_opts: DatabaseOpts,

    /// Opaque settings handed to the hosted plugin
    #[serde(default, deserialize_with = "mapping_or_null")]
    pub plugin_config: Mapping,

    /// Logging setup, passed through to the logging subsystem
    #[serde(default)]
    pub logging: LoggingSection,
}

impl BotConfig {
    /// Top-level keys understood by this version
    pub const KNOWN_KEYS: &'static [&'static str] = &[
        "user",
        "server",
        "database",
        "database_opts",
        "plugin_config",
        "logging",
    ];

    /// End-to-end encryption is only set up when a device ID is configured
    pub const fn encryption_enabled(&self) -> bool {
        self.user.credentials.device_id.is_some()
    }

    /// Copy with access tokens, the appservice token, the log stream token
    /// and database passwords replaced
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.user.credentials.access_token = REDACTED.to_string();
        if copy.user.hs_token.is_some() {
            copy.user.hs_token = Some(REDACTED.to_string());
        }
        if let Some(server) = copy.server.as_mut() {
            if server.log_token.is_some() {
                server.log_token = Some(REDACTED.to_string());
            }
        }
        if let Ok(database) = DatabaseUrl::parse(&self.database.redacted()) {
            copy.database = database;
        }
        copy
    }
}

const REDACTED: &str = "[REDACTED]";

/// Account, sync and profile settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserConfig {
    pub credentials: Credentials,

    /// Run the client sync loop
    #[serde(default = "default_true")]
    pub sync: bool,

    /// Receive events as an appservice instead of (or in addition to) syncing
    #[serde(default)]
    pub appservice: bool,

    /// Token the homeserver uses to authenticate appservice transactions
    #[serde(default)]
    pub hs_token: Option<String>,

    /// Accept all room invites
    #[serde(default)]
    pub autojoin: bool,

    #[serde(default)]
    pub displayname: ProfileField,

    #[serde(default)]
    pub avatar_url: ProfileField,

    /// Skip events from the initial sync of every session
    #[serde(default = "default_true")]
    pub ignore_initial_sync: bool,

    /// Skip events from the first sync after the account is created
    #[serde(default = "default_true")]
    pub ignore_first_sync: bool,
}

impl UserConfig {
    /// Profile fields that should be pushed to the homeserver at startup
    pub fn profile_updates(&self) -> Vec<(&'static str, &str)> {
        [
            ("displayname", &self.displayname),
            ("avatar_url", &self.avatar_url),
        ]
        .into_iter()
        .filter_map(|(name, field)| field.value().map(|value| (name, value)))
        .collect()
    }
}

/// Login credentials for the bot account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Credentials {
    pub id: UserId,
    pub homeserver: HttpUrl,
    pub access_token: String,
    /// Absent disables the encryption path
    #[serde(default)]
    pub device_id: Option<String>,
}

/// A profile value that is either left untouched or set to a value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum ProfileField {
    /// Do not update the field (`"disable"` or null in the document)
    #[default]
    Keep,
    /// Set the field to this value
    Set(String),
}

impl ProfileField {
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Keep => None,
            Self::Set(value) => Some(value),
        }
    }
}

impl From<Option<String>> for ProfileField {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) if value != PROFILE_SENTINEL => Self::Set(value),
            _ => Self::Keep,
        }
    }
}

impl From<ProfileField> for String {
    fn from(value: ProfileField) -> Self {
        match value {
            ProfileField::Keep => PROFILE_SENTINEL.to_string(),
            ProfileField::Set(value) => value,
        }
    }
}

/// Embedded web server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Interface to bind, IP address or hostname
    #[serde(default = "default_hostname")]
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: NonZeroU16,

    /// Prefix for every route served by the host
    #[serde(default = "BasePath::root")]
    pub base_path: BasePath,

    /// Externally reachable URL; `base_path` is appended when advertising
    #[serde(default = "default_public_url")]
    pub public_url: HttpUrl,

    /// Token accepted by the log stream; the endpoint is off when absent
    #[serde(default)]
    pub log_token: Option<String>,
}

impl ServerConfig {
    /// Public URL of the base path, without a trailing slash
    pub fn public_base_url(&self) -> String {
        format!(
            "{}{}",
            self.public_url.as_str().trim_end_matches('/'),
            self.base_path.trimmed()
        )
    }

    /// Public URL of a resource below the base path
    pub fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url(),
            resource.trim_start_matches('/')
        )
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            base_path: BasePath::root(),
            public_url: default_public_url(),
            log_token: None,
        }
    }
}

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> NonZeroU16 {
    match NonZeroU16::new(8080) {
        Some(port) => port,
        None => unreachable!(),
    }
}

fn default_public_url() -> HttpUrl {
    HttpUrl::parse("http://localhost:8080").unwrap_or_else(|_| unreachable!())
}

/// Connection pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseOpts {
    /// Postgres: minimum pool size. SQLite: worker pool size
    #[serde(default = "default_min_size")]
    pub min_size: NonZeroU32,

    /// Postgres: maximum pool size. Ignored for SQLite
    #[serde(default = "default_max_size")]
    pub max_size: NonZeroU32,
}

impl DatabaseOpts {
    /// Effective `(min, max)` connections for the given backend
    pub const fn pool_bounds(&self, backend: &DatabaseBackend) -> (u32, u32) {
        match backend {
            DatabaseBackend::Sqlite { .. } => (self.min_size.get(), self.min_size.get()),
            DatabaseBackend::Postgres => (self.min_size.get(), self.max_size.get()),
        }
    }
}

impl Default for DatabaseOpts {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            max_size: default_max_size(),
        }
    }
}

const fn default_min_size() -> NonZeroU32 {
    NonZeroU32::MIN
}

const fn default_max_size() -> NonZeroU32 {
    match NonZeroU32::new(10) {
        Some(size) => size,
        None => unreachable!(),
    }
}

/// The `logging` section, kept verbatim
///
/// Only its shape (a mapping) is checked at load time; the logging subsystem
/// reads what it understands from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggingSection(#[serde(deserialize_with = "mapping_or_null")] pub Mapping);

impl LoggingSection {
    /// Look up a nested value by a path of keys
    pub fn get(&self, path: &[&str]) -> Option<&serde_yaml::Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.0.get(*first)?;
        for key in rest {
            current = current.as_mapping()?.get(*key)?;
        }
        Some(current)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

const fn default_true() -> bool {
    true
}

fn mapping_or_null<'de, D>(deserializer: D) -> Result<Mapping, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default())
}
