//! Local Claude CLI credentials file.
//!
//! A machine where the Claude CLI is logged in keeps its OAuth tokens in
//! `~/.claude/.credentials.json`:
//!
//! ```json
//! {"claudeAiOauth": {"accessToken": "...", "refreshToken": "...", "expiresAt": 1700000000000}}
//! ```
//!
//! The `secrets` command reads that file so an operator can copy fresh values
//! into the repository secrets. The file is never written.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::instrument;

use super::{ACCESS_TOKEN_VAR, CredentialBundle, EXPIRES_AT_VAR, REFRESH_TOKEN_VAR};
use crate::error::CredentialFileError;

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "claudeAiOauth")]
    claude_ai_oauth: Option<OAuthEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthEntry {
    access_token: String,
    refresh_token: String,
    expires_at: ExpiresAt,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    subscription_type: Option<String>,
}

/// `expiresAt` appears both as a JSON number and as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresAt {
    Millis(i64),
    Text(String),
}

impl ExpiresAt {
    fn into_string(self) -> String {
        match self {
            Self::Millis(ms) => ms.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// OAuth credentials read from a local credentials file.
#[derive(Debug, Clone)]
pub struct LocalCredentials {
    pub bundle: CredentialBundle,
    pub scopes: Vec<String>,
    pub subscription_type: Option<String>,
    pub path: PathBuf,
}

/// Default location of the Claude CLI credentials file.
pub fn default_credentials_path() -> Result<PathBuf, CredentialFileError> {
    dirs::home_dir()
        .map(|home| home.join(".claude").join(".credentials.json"))
        .ok_or(CredentialFileError::NoHomeDir)
}

impl LocalCredentials {
    /// Load credentials from `path`.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, CredentialFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| CredentialFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: CredentialsFile =
            serde_json::from_str(&content).map_err(|source| CredentialFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let entry = file.claude_ai_oauth.ok_or_else(|| CredentialFileError::MissingOAuth {
            path: path.to_path_buf(),
        })?;

        tracing::debug!(scopes = entry.scopes.len(), "Loaded local OAuth credentials");

        Ok(Self {
            bundle: CredentialBundle::new(
                entry.access_token,
                entry.refresh_token,
                entry.expires_at.into_string(),
            ),
            scopes: entry.scopes,
            subscription_type: entry.subscription_type,
            path: path.to_path_buf(),
        })
    }

    /// `gh secret set` commands that install these credentials as
    /// repository secrets.
    pub fn gh_commands(&self) -> Vec<String> {
        [
            (ACCESS_TOKEN_VAR, &self.bundle.access_token),
            (REFRESH_TOKEN_VAR, &self.bundle.refresh_token),
            (EXPIRES_AT_VAR, &self.bundle.expires_at),
        ]
        .into_iter()
        .map(|(name, value)| format!("gh secret set {name} --body {}", shell_quote(value)))
        .collect()
    }
}

/// Single-quote `value` for a POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
