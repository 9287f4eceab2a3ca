//! Validated string newtypes used by the configuration model.
//!
//! Each type parses on deserialization, so a `BotConfig` that exists always
//! holds well-formed identifiers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

/// Errors produced while parsing identifier values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("'{0}' is not a Matrix user ID of the form @localpart:domain")]
    MalformedUserId(String),

    #[error("Matrix user ID is longer than 255 bytes")]
    UserIdTooLong,

    #[error("'{0}' is not an absolute URL: {1}")]
    MalformedUrl(String, String),

    #[error("URL '{0}' must use the http or https scheme")]
    UnsupportedScheme(String),

    #[error("path '{0}' must start with '/'")]
    RelativePath(String),
}

const MAX_USER_ID_LEN: usize = 255;

// Localpart allows the historical upper-case characters; the server name is a
// DNS name, IPv4 literal or bracketed IPv6 literal with an optional port.
static USER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^@(?P<localpart>[A-Za-z0-9._=\-/+]+):(?P<server>(?:\[[0-9A-Fa-f:.]+\]|[A-Za-z0-9.\-]+)(?::[0-9]{1,5})?)$",
    )
    .expect("user ID pattern compiles")
});

/// A Matrix user ID (`@localpart:domain`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId {
    raw: String,
    colon: usize,
}

impl UserId {
    /// Parse a user ID, rejecting anything not shaped like `@localpart:domain`
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        if value.len() > MAX_USER_ID_LEN {
            return Err(IdentifierError::UserIdTooLong);
        }
        let captures = USER_ID_PATTERN
            .captures(value)
            .ok_or_else(|| IdentifierError::MalformedUserId(value.to_string()))?;
        let colon = captures
            .name("server")
            .map_or(0, |server| server.start() - 1);
        Ok(Self {
            raw: value.to_string(),
            colon,
        })
    }

    /// The part between `@` and the first `:`
    pub fn localpart(&self) -> &str {
        &self.raw[1..self.colon]
    }

    /// The server name, including the port if one was given
    pub fn domain(&self) -> &str {
        &self.raw[self.colon + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.raw
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// An absolute `http` or `https` URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HttpUrl(Url);

impl HttpUrl {
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let url = Url::parse(value)
            .map_err(|err| IdentifierError::MalformedUrl(value.to_string(), err.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            _ => Err(IdentifierError::UnsupportedScheme(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub const fn as_url(&self) -> &Url {
        &self.0
    }
}

impl TryFrom<String> for HttpUrl {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HttpUrl> for String {
    fn from(value: HttpUrl) -> Self {
        value.0.into()
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// URL path prefix for web resources; always starts with `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BasePath(String);

impl BasePath {
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        if value.starts_with('/') {
            Ok(Self(value.to_string()))
        } else {
            Err(IdentifierError::RelativePath(value.to_string()))
        }
    }

    /// The root path `/`
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without trailing slashes; empty for the root path
    pub fn trimmed(&self) -> &str {
        self.0.trim_end_matches('/')
    }
}

impl TryFrom<String> for BasePath {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BasePath> for String {
    fn from(value: BasePath) -> Self {
        value.0
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
