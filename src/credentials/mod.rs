//! Credential bundle and the sources it is read from.

pub mod file;
pub mod source;

pub use file::{LocalCredentials, default_credentials_path};
pub use source::{CredentialSource, EnvCredentialSource, MemoryCredentialSource};

use std::fmt;

/// Secret holding the OAuth access token.
pub const ACCESS_TOKEN_VAR: &str = "CLAUDE_ACCESS_TOKEN";

/// Secret holding the OAuth refresh token.
pub const REFRESH_TOKEN_VAR: &str = "CLAUDE_REFRESH_TOKEN";

/// Secret holding the access-token expiry, in milliseconds since the epoch.
pub const EXPIRES_AT_VAR: &str = "CLAUDE_EXPIRES_AT";

/// The three OAuth values a run needs.
///
/// Read once per run, validated, and handed on unchanged.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub access_token: String,
    pub refresh_token: String,
    /// Milliseconds since the Unix epoch, as the secret stores it.
    pub expires_at: String,
}

impl CredentialBundle {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: expires_at.into(),
        }
    }

    /// Read the bundle from a source. Unset values come back empty.
    pub fn from_source(source: &dyn CredentialSource) -> Self {
        Self {
            access_token: source.get(ACCESS_TOKEN_VAR).unwrap_or_default(),
            refresh_token: source.get(REFRESH_TOKEN_VAR).unwrap_or_default(),
            expires_at: source.get(EXPIRES_AT_VAR).unwrap_or_default(),
        }
    }

    /// True when all three values are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && !self.expires_at.is_empty()
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}
