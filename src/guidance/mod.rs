//! Credential validation and renewal guidance.
//!
//! [`Validator`] runs two independent checks before credentials are used:
//!
//! - [`Validator::validate_credentials`] requires all three values and applies
//!   the *buffered* expiry check (expired a few minutes early).
//! - [`Validator::validate_with_guidance`] classifies the *raw* time left into
//!   advisory tiers and fails only once the tokens are literally expired.
//!
//! The two checks answer different questions and keep different margins: the
//! first guards the run about to start, the second tells operators how soon
//! to act.

pub mod messages;
pub mod sink;

pub use sink::{ActionsSink, GuidanceSink, RecordingSink, Severity, TracingSink};

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::clock::Clock;
use crate::credentials::{CredentialBundle, CredentialSource};
use crate::error::CredentialError;
use crate::expiry::{self, DEFAULT_BUFFER_MINUTES};

/// Default raw-hours threshold below which a warning is emitted.
pub const DEFAULT_WARN_HOURS: f64 = 24.0;

/// Default raw-hours threshold below which an informational notice is emitted.
pub const DEFAULT_NOTICE_HOURS: f64 = 72.0;

/// Thresholds for the expiry checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvicePolicy {
    /// Margin for the buffered check in [`Validator::validate_credentials`].
    pub buffer_minutes: u32,
    pub warn_hours: f64,
    pub notice_hours: f64,
}

impl Default for AdvicePolicy {
    fn default() -> Self {
        Self {
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            warn_hours: DEFAULT_WARN_HOURS,
            notice_hours: DEFAULT_NOTICE_HOURS,
        }
    }
}

/// Urgency of a token's remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceTier {
    /// Past the literal expiry.
    Expired,
    /// Inside the warning window.
    Urgent,
    /// Inside the notice window.
    Soon,
    Healthy,
    /// The expiry could not be parsed.
    Unknown,
}

impl AdviceTier {
    /// Whether the tokens must be refreshed before they can be used.
    pub fn requires_refresh(self) -> bool {
        self == Self::Expired
    }
}

/// Validates credentials and emits renewal guidance.
#[derive(Clone)]
pub struct Validator {
    source: Arc<dyn CredentialSource>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn GuidanceSink>,
    policy: AdvicePolicy,
}

impl Validator {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn GuidanceSink>,
    ) -> Self {
        Self {
            source,
            clock,
            sink,
            policy: AdvicePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AdvicePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &AdvicePolicy {
        &self.policy
    }

    /// Read credentials from the source and apply presence and buffered
    /// expiry checks.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub fn validate_credentials(&self) -> Result<CredentialBundle, CredentialError> {
        let bundle = CredentialBundle::from_source(self.source.as_ref());

        if !bundle.is_complete() {
            tracing::debug!(?bundle, "Credential values missing");
            return Err(CredentialError::MissingCredentials);
        }

        let buffer = self.policy.buffer_minutes;
        if expiry::is_expired(&bundle.expires_at, buffer, self.clock.as_ref(), self.sink.as_ref()) {
            return Err(CredentialError::ExpiredCredentials {
                message: messages::expired_credentials(buffer),
            });
        }

        tracing::debug!("Credentials present and outside the expiry buffer");
        Ok(bundle)
    }

    /// Classify the raw time left until `expires_at`, without side effects.
    pub fn classify(&self, expires_at: &str) -> AdviceTier {
        match expiry::parse_expires_at(expires_at) {
            Ok(expires_at_ms) => self.classify_at(expires_at_ms, self.clock.now_ms()),
            Err(_) => AdviceTier::Unknown,
        }
    }

    fn classify_at(&self, expires_at_ms: i64, now_ms: i64) -> AdviceTier {
        if expires_at_ms <= now_ms {
            return AdviceTier::Expired;
        }

        let hours = expiry::hours_remaining(expires_at_ms, now_ms);
        if hours < self.policy.warn_hours {
            AdviceTier::Urgent
        } else if hours < self.policy.notice_hours {
            AdviceTier::Soon
        } else {
            AdviceTier::Healthy
        }
    }

    /// Emit tiered guidance for `expires_at`.
    ///
    /// Returns `true` only when the tokens are already expired and need an
    /// immediate refresh. The tier and the remaining-time label come from one
    /// reading of the clock.
    #[instrument(skip(self))]
    pub fn check_and_advise(&self, expires_at: &str) -> bool {
        let Ok(expires_at_ms) = expiry::parse_expires_at(expires_at) else {
            tracing::warn!("Cannot classify token lifetime: expiration timestamp is not a number");
            return false;
        };

        let now_ms = self.clock.now_ms();
        let tier = self.classify_at(expires_at_ms, now_ms);
        let remaining = || expiry::format_remaining(expires_at_ms.saturating_sub(now_ms));

        match tier {
            AdviceTier::Expired => {
                self.sink.error(&messages::expired_notice());
                self.sink.notice(&messages::refresh_instructions());
            }
            AdviceTier::Urgent => {
                self.sink.warning(&messages::expiring_warning(&remaining()));
                self.sink.notice(&messages::refresh_instructions());
            }
            AdviceTier::Soon => {
                self.sink.notice(&messages::expiring_notice(&remaining()));
            }
            AdviceTier::Healthy | AdviceTier::Unknown => {}
        }

        tracing::debug!(?tier, "Token lifetime classified");
        tier.requires_refresh()
    }

    /// Apply the advisory check and fail if the tokens need an immediate
    /// refresh.
    ///
    /// The two token arguments are returned as given; only `expires_at` is
    /// checked.
    #[instrument(skip_all)]
    pub fn validate_with_guidance(
        &self,
        access_token: String,
        refresh_token: String,
        expires_at: String,
    ) -> Result<CredentialBundle, CredentialError> {
        if self.check_and_advise(&expires_at) {
            return Err(CredentialError::ExpiredCredentials {
                message: messages::manual_refresh_required(),
            });
        }

        Ok(CredentialBundle {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Both checks in order: presence and buffered expiry, then advisory
    /// tiers. Either failure is terminal.
    pub fn run_checks(&self) -> Result<CredentialBundle, CredentialError> {
        let bundle = self.validate_credentials()?;
        self.validate_with_guidance(bundle.access_token, bundle.refresh_token, bundle.expires_at)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("source", &self.source.name())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::credentials::{
        ACCESS_TOKEN_VAR, EXPIRES_AT_VAR, MemoryCredentialSource, REFRESH_TOKEN_VAR,
    };

    const NOW: i64 = 1_700_000_000_000;
    const MINUTE: i64 = 60_000;
    const HOUR: i64 = 3_600_000;

    fn validator(source: MemoryCredentialSource) -> (Validator, RecordingSink) {
        let sink = RecordingSink::new();
        let validator = Validator::new(
            Arc::new(source),
            Arc::new(FixedClock::new(NOW)),
            Arc::new(sink.clone()),
        );
        (validator, sink)
    }

    fn full_source(expires_at: &str) -> MemoryCredentialSource {
        MemoryCredentialSource::new()
            .with(ACCESS_TOKEN_VAR, "access")
            .with(REFRESH_TOKEN_VAR, "refresh")
            .with(EXPIRES_AT_VAR, expires_at)
    }

    fn at(offset_ms: i64) -> String {
        (NOW + offset_ms).to_string()
    }

    // -- validate_credentials --

    #[test]
    fn test_validate_credentials_returns_bundle_unchanged() {
        let (v, sink) = validator(full_source(&at(10 * HOUR)));
        let bundle = v.validate_credentials().unwrap();
        assert_eq!(bundle, CredentialBundle::new("access", "refresh", at(10 * HOUR)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_validate_credentials_missing_any_value() {
        for missing in [ACCESS_TOKEN_VAR, REFRESH_TOKEN_VAR, EXPIRES_AT_VAR] {
            let source = full_source(&at(10 * HOUR)).with(missing, "");
            let (v, _) = validator(source);
            assert_eq!(
                v.validate_credentials(),
                Err(CredentialError::MissingCredentials),
                "{missing} empty"
            );
        }

        let (v, _) = validator(MemoryCredentialSource::new());
        assert_eq!(v.validate_credentials(), Err(CredentialError::MissingCredentials));
    }

    #[test]
    fn test_validate_credentials_within_buffer_is_expired() {
        for offset in [4 * MINUTE, 5 * MINUTE, 0, -HOUR] {
            let (v, sink) = validator(full_source(&at(offset)));
            let err = v.validate_credentials().unwrap_err();
            match err {
                CredentialError::ExpiredCredentials { message } => {
                    assert!(message.contains("CLAUDE_ACCESS_TOKEN"));
                    assert!(message.contains("CLAUDE_REFRESH_TOKEN"));
                    assert!(message.contains("CLAUDE_EXPIRES_AT"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(sink.count(Severity::Warning), 1);
        }
    }

    #[test]
    fn test_validate_credentials_unparseable_expiry_fails_safe() {
        let (v, sink) = validator(full_source("tomorrow"));
        assert!(matches!(
            v.validate_credentials(),
            Err(CredentialError::ExpiredCredentials { .. })
        ));
        assert_eq!(sink.count(Severity::Error), 1);
    }

    #[test]
    fn test_validate_credentials_respects_custom_buffer() {
        let (v, _) = validator(full_source(&at(20 * MINUTE)));
        assert!(v.validate_credentials().is_ok());

        let v = v.with_policy(AdvicePolicy {
            buffer_minutes: 30,
            ..AdvicePolicy::default()
        });
        assert!(v.validate_credentials().is_err());
    }

    // -- check_and_advise --

    #[test]
    fn test_check_and_advise_expired() {
        let (v, sink) = validator(MemoryCredentialSource::new());
        assert!(v.check_and_advise(&at(-MINUTE)));
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.count(Severity::Notice), 1);
    }

    #[test]
    fn test_check_and_advise_under_24_hours_warns() {
        let (v, sink) = validator(MemoryCredentialSource::new());
        assert!(!v.check_and_advise(&at(3 * HOUR)));

        let warnings = sink.with_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("3 hours 0 minute"));
        assert_eq!(sink.count(Severity::Notice), 1);
        assert_eq!(sink.count(Severity::Error), 0);
    }

    #[test]
    fn test_check_and_advise_ignores_buffer() {
        // Inside the 5-minute buffer but not literally expired.
        let (v, sink) = validator(MemoryCredentialSource::new());
        assert!(!v.check_and_advise(&at(2 * MINUTE)));
        assert_eq!(sink.count(Severity::Warning), 1);
    }

    #[test]
    fn test_check_and_advise_between_24_and_72_hours_notices() {
        let (v, sink) = validator(MemoryCredentialSource::new());
        assert!(!v.check_and_advise(&at(24 * HOUR)));
        assert!(!v.check_and_advise(&at(71 * HOUR)));

        assert_eq!(sink.count(Severity::Notice), 2);
        assert_eq!(sink.count(Severity::Warning), 0);
    }

    #[test]
    fn test_check_and_advise_healthy_is_silent() {
        let (v, sink) = validator(MemoryCredentialSource::new());
        assert!(!v.check_and_advise(&at(72 * HOUR)));
        assert!(!v.check_and_advise(&at(30 * 24 * HOUR)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_check_and_advise_unparseable() {
        let (v, sink) = validator(MemoryCredentialSource::new());
        assert!(!v.check_and_advise("nope"));
        assert!(sink.is_empty());
    }

    /// Moves forward one millisecond on every read.
    struct TickingClock(std::sync::atomic::AtomicI64);

    impl Clock for TickingClock {
        fn now_ms(&self) -> i64 {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[test]
    fn test_check_and_advise_uses_one_instant() {
        let sink = RecordingSink::new();
        let v = Validator::new(
            Arc::new(MemoryCredentialSource::new()),
            Arc::new(TickingClock(std::sync::atomic::AtomicI64::new(NOW))),
            Arc::new(sink.clone()),
        );

        // One millisecond left at the first reading; later readings pass expiry.
        assert!(!v.check_and_advise(&at(1)));

        let warnings = sink.with_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("0 minute"), "{}", warnings[0]);
        assert!(!warnings[0].contains("in expired"), "{}", warnings[0]);
        assert_eq!(sink.count(Severity::Error), 0);
    }

    #[test]
    fn test_classify_tiers() {
        let (v, _) = validator(MemoryCredentialSource::new());
        assert_eq!(v.classify(&at(0)), AdviceTier::Expired);
        assert_eq!(v.classify(&at(1)), AdviceTier::Urgent);
        assert_eq!(v.classify(&at(24 * HOUR - 1)), AdviceTier::Urgent);
        assert_eq!(v.classify(&at(24 * HOUR)), AdviceTier::Soon);
        assert_eq!(v.classify(&at(72 * HOUR - 1)), AdviceTier::Soon);
        assert_eq!(v.classify(&at(72 * HOUR)), AdviceTier::Healthy);
        assert_eq!(v.classify(""), AdviceTier::Unknown);
    }

    // -- validate_with_guidance --

    #[test]
    fn test_validate_with_guidance_passes_tokens_through() {
        let (v, _) = validator(MemoryCredentialSource::new());
        // Tokens are not re-validated, even when empty.
        let bundle = v
            .validate_with_guidance(String::new(), "refresh".into(), at(100 * HOUR))
            .unwrap();
        assert_eq!(bundle, CredentialBundle::new("", "refresh", at(100 * HOUR)));
    }

    #[test]
    fn test_validate_with_guidance_expired_is_terminal() {
        let (v, sink) = validator(MemoryCredentialSource::new());
        let err = v
            .validate_with_guidance("access".into(), "refresh".into(), at(-HOUR))
            .unwrap_err();
        assert_eq!(
            err,
            CredentialError::ExpiredCredentials {
                message: messages::manual_refresh_required(),
            }
        );
        assert_eq!(sink.count(Severity::Error), 1);
    }

    // -- run_checks --

    #[test]
    fn test_run_checks_healthy() {
        let (v, sink) = validator(full_source(&at(100 * HOUR)));
        let bundle = v.run_checks().unwrap();
        assert_eq!(bundle.access_token, "access");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_run_checks_short_lived_passes_with_warning() {
        let (v, sink) = validator(full_source(&at(HOUR)));
        assert!(v.run_checks().is_ok());
        assert_eq!(sink.count(Severity::Warning), 1);
    }

    #[test]
    fn test_run_checks_stops_at_first_failure() {
        let (v, sink) = validator(full_source(&at(-HOUR)));
        let err = v.run_checks().unwrap_err();
        assert_eq!(err.code(), "expired_credentials");
        // Only the buffered check ran; no advisory tier messages.
        assert_eq!(sink.count(Severity::Error), 0);
        assert_eq!(sink.count(Severity::Warning), 1);
    }
}
