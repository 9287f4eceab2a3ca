pub mod config;
pub mod database;
pub mod identifiers;

pub use config::{
    BotConfig, Credentials, DatabaseOpts, LoggingSection, ProfileField, ServerConfig, UserConfig,
    PROFILE_SENTINEL,
};
pub use database::{DatabaseBackend, DatabaseUrl, DatabaseUrlError};
pub use identifiers::{BasePath, HttpUrl, IdentifierError, UserId};
