//! Expiration evaluation for OAuth access tokens.
//!
//! Expiration timestamps arrive as strings of milliseconds since the Unix
//! epoch. Nothing in this module returns an error: an unparseable timestamp
//! makes [`is_expired`] answer `true` and [`remaining_time`] answer
//! `"unknown"`, with the parse failure reported to the sink.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::error::ParseFailure;
use crate::guidance::sink::GuidanceSink;

/// Default margin before the literal expiry at which a token counts as expired.
pub const DEFAULT_BUFFER_MINUTES: u32 = 5;

/// Label returned by [`remaining_time`] once the token has expired.
pub const EXPIRED_LABEL: &str = "expired";

/// Label returned by [`remaining_time`] when the timestamp cannot be parsed.
pub const UNKNOWN_LABEL: &str = "unknown";

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;

/// Parse an expiration timestamp (base-10 integer milliseconds).
///
/// Surrounding whitespace is ignored; anything else that is not an `i64`,
/// including the empty string, is rejected.
pub fn parse_expires_at(input: &str) -> Result<i64, ParseFailure> {
    input.trim().parse::<i64>().map_err(|e| ParseFailure {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Render an instant as RFC 3339 UTC with millisecond precision.
///
/// Instants outside chrono's range fall back to the raw millisecond value.
pub fn format_instant(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{ms}ms"))
}

/// Check whether a token is expired, treating it as expired
/// `buffer_minutes` before its literal expiry.
///
/// Emits a warning with both instants when expired. A timestamp that fails to
/// parse is reported as an error and treated as expired.
pub fn is_expired(
    expires_at: &str,
    buffer_minutes: u32,
    clock: &dyn Clock,
    sink: &dyn GuidanceSink,
) -> bool {
    is_expired_at(expires_at, buffer_minutes, clock.now_ms(), sink)
}

/// [`is_expired`] evaluated at a given instant.
pub fn is_expired_at(
    expires_at: &str,
    buffer_minutes: u32,
    now_ms: i64,
    sink: &dyn GuidanceSink,
) -> bool {
    let expires_at_ms = match parse_expires_at(expires_at) {
        Ok(ms) => ms,
        Err(e) => {
            tracing::debug!(error = %e, "Treating unparseable expiration as expired");
            sink.error(&format!("Failed to check token expiration: {e}"));
            return true;
        }
    };

    let buffer_ms = i64::from(buffer_minutes) * MS_PER_MINUTE;
    let expired = now_ms >= expires_at_ms.saturating_sub(buffer_ms);

    if expired {
        sink.warning(&format!(
            "Token expired or expiring within {buffer_minutes} minutes. Expires at: {}, current time: {}",
            format_instant(expires_at_ms),
            format_instant(now_ms),
        ));
    }

    expired
}

/// Human-readable time left until the literal expiry.
///
/// Returns `"expired"` once the instant has passed and `"unknown"` for an
/// unparseable timestamp.
pub fn remaining_time(expires_at: &str, clock: &dyn Clock) -> String {
    remaining_time_at(expires_at, clock.now_ms())
}

/// [`remaining_time`] evaluated at a given instant.
pub fn remaining_time_at(expires_at: &str, now_ms: i64) -> String {
    match parse_expires_at(expires_at) {
        Ok(expires_at_ms) => format_remaining(expires_at_ms.saturating_sub(now_ms)),
        Err(_) => UNKNOWN_LABEL.to_string(),
    }
}

/// Format a remaining duration in milliseconds.
///
/// The plural `s` is added only for values greater than one, so zero reads
/// as `"0 minute"`.
pub fn format_remaining(remaining_ms: i64) -> String {
    if remaining_ms <= 0 {
        return EXPIRED_LABEL.to_string();
    }

    let hours = remaining_ms / MS_PER_HOUR;
    let minutes = (remaining_ms % MS_PER_HOUR) / MS_PER_MINUTE;

    if hours > 0 {
        format!(
            "{hours} hour{} {minutes} minute{}",
            plural(hours),
            plural(minutes)
        )
    } else {
        format!("{minutes} minute{}", plural(minutes))
    }
}

fn plural(n: i64) -> &'static str {
    if n > 1 { "s" } else { "" }
}

/// Raw hours until the literal expiry, with no safety margin.
pub fn hours_remaining(expires_at_ms: i64, now_ms: i64) -> f64 {
    (expires_at_ms as f64 - now_ms as f64) / MS_PER_HOUR as f64
}

/// Combined expiry view of a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationStatus {
    pub is_expired: bool,
    pub remaining: String,
    /// The expiry instant in RFC 3339, when the timestamp parses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Evaluate both the buffered check and the remaining-time label against a
/// single reading of the clock.
pub fn status(
    expires_at: &str,
    buffer_minutes: u32,
    clock: &dyn Clock,
    sink: &dyn GuidanceSink,
) -> ExpirationStatus {
    let now_ms = clock.now_ms();
    ExpirationStatus {
        is_expired: is_expired_at(expires_at, buffer_minutes, now_ms, sink),
        remaining: remaining_time_at(expires_at, now_ms),
        expires_at: parse_expires_at(expires_at).ok().map(format_instant),
    }
}
