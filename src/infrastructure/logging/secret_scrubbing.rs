use regex::{Captures, Regex};
use std::sync::LazyLock;

// Synapse (syt_) and MAS (mat_/mct_) access token formats
static MATRIX_TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bm[ac]t_[A-Za-z0-9_]{10,}|\bsyt_[A-Za-z0-9_]{10,}").expect("token pattern compiles")
});

static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[A-Za-z0-9\-_.~+/=]+").expect("bearer pattern compiles"));

// access_token=... in query strings and `token: value` style fields
static FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?P<key>["']?(?:access_token|hs_token|as_token|log_token|token|password|secret)["']?)(?P<sep>\s*[:=]\s*)["']?[^"'\s,&}]+["']?"#,
    )
    .expect("field pattern compiles")
});

/// Structured field names whose values are never kept
const SECRET_FIELDS: &[&str] = &[
    "access_token",
    "hs_token",
    "as_token",
    "log_token",
    "token",
    "password",
    "secret",
];

/// Removes credentials from log text before it is kept or streamed
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretScrubber;

impl SecretScrubber {
    /// Scrub a message of sensitive data
    pub fn scrub_message(self, message: &str) -> String {
        let scrubbed = MATRIX_TOKEN_PATTERN.replace_all(message, "[TOKEN_REDACTED]");
        let scrubbed = BEARER_PATTERN.replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        FIELD_PATTERN
            .replace_all(&scrubbed, |caps: &Captures| {
                format!("{}{}[REDACTED]", &caps["key"], &caps["sep"])
            })
            .into_owned()
    }

    /// Whether a structured field with this name carries a credential
    pub fn is_secret_field(self, name: &str) -> bool {
        SECRET_FIELDS
            .iter()
            .any(|secret| secret.eq_ignore_ascii_case(name))
    }
}
