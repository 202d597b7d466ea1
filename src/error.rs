//! Error types for credential validation.

use std::path::PathBuf;

use crate::credentials::{ACCESS_TOKEN_VAR, EXPIRES_AT_VAR, REFRESH_TOKEN_VAR};

/// Terminal failures raised by the validation controller.
///
/// Both variants abort the OAuth path: the driver reports them to the CI
/// run-status sink and exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// One or more of the three required credential values is empty or unset.
    #[error(
        "OAuth credentials not found. Set {}, {} and {} as repository secrets.",
        ACCESS_TOKEN_VAR,
        REFRESH_TOKEN_VAR,
        EXPIRES_AT_VAR
    )]
    MissingCredentials,

    /// The access token is expired, or will expire before it can be used.
    ///
    /// The message carries the full remediation text shown to the operator.
    #[error("{message}")]
    ExpiredCredentials { message: String },
}

impl CredentialError {
    /// Short machine-friendly code for logs and JSON reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::ExpiredCredentials { .. } => "expired_credentials",
        }
    }
}

/// An expiration timestamp that is not a base-10 integer of milliseconds.
///
/// Never surfaced from the evaluator; it is absorbed into a fail-safe value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid expiration timestamp {input:?}: {reason}")]
pub struct ParseFailure {
    pub input: String,
    pub reason: String,
}

/// Failure reading a local credentials file.
#[derive(Debug, thiserror::Error)]
pub enum CredentialFileError {
    #[error("Failed to read credentials file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credentials file '{}' has no OAuth entry (is Claude logged in?)", .path.display())]
    MissingOAuth { path: PathBuf },

    #[error("No home directory; pass --file to locate the credentials file")]
    NoHomeDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_names_all_three_secrets() {
        let msg = CredentialError::MissingCredentials.to_string();
        assert!(msg.contains("CLAUDE_ACCESS_TOKEN"));
        assert!(msg.contains("CLAUDE_REFRESH_TOKEN"));
        assert!(msg.contains("CLAUDE_EXPIRES_AT"));
    }

    #[test]
    fn test_expired_credentials_displays_message_verbatim() {
        let err = CredentialError::ExpiredCredentials {
            message: "line one\nline two".into(),
        };
        assert_eq!(err.to_string(), "line one\nline two");
        assert_eq!(err.code(), "expired_credentials");
    }

    #[test]
    fn test_parse_failure_display() {
        let err = ParseFailure {
            input: "abc".into(),
            reason: "invalid digit found in string".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid expiration timestamp \"abc\": invalid digit found in string"
        );
    }
}
