//! Operator-facing remediation text.
//!
//! The secret names and step order here are what operators follow to fix a
//! failed run, so tests pin them.

use crate::credentials::{ACCESS_TOKEN_VAR, EXPIRES_AT_VAR, REFRESH_TOKEN_VAR};

/// Where operators sign in to mint new OAuth tokens.
pub const PROVIDER_URL: &str = "https://claude.ai";

/// Where the Claude CLI stores OAuth tokens after login.
pub const LOCAL_CREDENTIALS_HINT: &str = "~/.claude/.credentials.json";

/// Helper command that prints the secret values from a local login.
pub const HELPER_COMMAND: &str = "oauth-guard secrets";

fn secret_list() -> String {
    format!("   - {ACCESS_TOKEN_VAR}\n   - {REFRESH_TOKEN_VAR}\n   - {EXPIRES_AT_VAR}")
}

/// Failure text for the buffered expiry check.
pub fn expired_credentials(buffer_minutes: u32) -> String {
    format!(
        "Claude OAuth credentials have expired or will expire within {buffer_minutes} minutes.\n\
         \n\
         To fix this:\n\
         1. Sign in at {PROVIDER_URL} and run `claude login` to regenerate your OAuth tokens.\n\
         2. Copy accessToken, refreshToken and expiresAt from {LOCAL_CREDENTIALS_HINT}.\n\
         3. Update these repository secrets with the new values:\n\
         {}",
        secret_list()
    )
}

/// Failure text when the advisory check finds the tokens already expired.
pub fn manual_refresh_required() -> String {
    format!(
        "Claude OAuth tokens have expired and must be refreshed manually before this workflow can run.\n\
         \n\
         Manual steps:\n\
         1. On your machine, sign in at {PROVIDER_URL} and run `claude login`.\n\
         2. Read the new tokens from {LOCAL_CREDENTIALS_HINT}.\n\
         3. Replace these repository secrets:\n\
         {}\n\
         4. Re-run this workflow.\n\
         \n\
         Tip: run `{HELPER_COMMAND}` where you are logged in to print ready-to-use `gh secret set` commands.",
        secret_list()
    )
}

/// Error-tier notice for expired tokens.
pub fn expired_notice() -> String {
    "Claude OAuth tokens have expired.".to_string()
}

/// Warning-tier notice for tokens expiring within the warning window.
pub fn expiring_warning(remaining: &str) -> String {
    format!("Claude OAuth tokens expire in {remaining}. Refresh them before the next run.")
}

/// Informational notice for tokens expiring within the notice window.
pub fn expiring_notice(remaining: &str) -> String {
    format!("Claude OAuth tokens expire in {remaining}. Consider refreshing them soon.")
}

/// Remediation notice that accompanies the error and warning tiers.
pub fn refresh_instructions() -> String {
    format!(
        "To refresh: sign in at {PROVIDER_URL}, run `claude login`, then update {ACCESS_TOKEN_VAR}, \
         {REFRESH_TOKEN_VAR} and {EXPIRES_AT_VAR} (run `{HELPER_COMMAND}` to print the values)."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_names_secrets(text: &str) {
        assert!(text.contains("CLAUDE_ACCESS_TOKEN"), "{text}");
        assert!(text.contains("CLAUDE_REFRESH_TOKEN"), "{text}");
        assert!(text.contains("CLAUDE_EXPIRES_AT"), "{text}");
    }

    #[test]
    fn test_expired_credentials_text() {
        let text = expired_credentials(5);
        assert!(text.contains("within 5 minutes"));
        assert!(text.contains(PROVIDER_URL));
        assert_names_secrets(&text);

        let steps: Vec<usize> = ["1. ", "2. ", "3. "]
            .iter()
            .map(|step| text.find(step).unwrap())
            .collect();
        assert!(steps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_manual_refresh_text_is_distinct() {
        let text = manual_refresh_required();
        assert_names_secrets(&text);
        assert!(text.contains("manually"));
        assert!(text.contains(HELPER_COMMAND));
        assert_ne!(text, expired_credentials(5));
    }

    #[test]
    fn test_tier_notices() {
        assert!(expiring_warning("3 hours 0 minute").contains("3 hours 0 minute"));
        assert!(expiring_notice("30 hours 5 minutes").contains("30 hours 5 minutes"));
        assert_names_secrets(&refresh_instructions());
        assert!(!expired_notice().is_empty());
    }
}
