//! Operator-facing message sinks.
//!
//! The controller never prints directly. It hands formatted messages to a
//! [`GuidanceSink`], which decides where they go: GitHub Actions workflow
//! commands on stdout, `tracing` events, or an in-memory record for tests.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

/// Severity of an operator message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Notice,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Notice => write!(f, "notice"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Four-severity sink for operator guidance.
pub trait GuidanceSink: Send + Sync {
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
    fn notice(&self, message: &str);
    fn info(&self, message: &str);

    /// Ask the host to redact `secret` from subsequent output.
    fn mask(&self, _secret: &str) {}

    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => self.error(message),
            Severity::Warning => self.warning(message),
            Severity::Notice => self.notice(message),
            Severity::Info => self.info(message),
        }
    }
}

impl<T: GuidanceSink + ?Sized> GuidanceSink for Arc<T> {
    fn error(&self, message: &str) {
        (**self).error(message)
    }
    fn warning(&self, message: &str) {
        (**self).warning(message)
    }
    fn notice(&self, message: &str) {
        (**self).notice(message)
    }
    fn info(&self, message: &str) {
        (**self).info(message)
    }
    fn mask(&self, secret: &str) {
        (**self).mask(secret)
    }
}

impl<T: GuidanceSink + ?Sized> GuidanceSink for Box<T> {
    fn error(&self, message: &str) {
        (**self).error(message)
    }
    fn warning(&self, message: &str) {
        (**self).warning(message)
    }
    fn notice(&self, message: &str) {
        (**self).notice(message)
    }
    fn info(&self, message: &str) {
        (**self).info(message)
    }
    fn mask(&self, secret: &str) {
        (**self).mask(secret)
    }
}

// ---------------------------------------------------------------------------
// GitHub Actions workflow commands
// ---------------------------------------------------------------------------

/// Escape a workflow-command payload (`%`, CR and LF).
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Render a message as the line the Actions runner understands.
///
/// `Info` has no command form and is written as-is.
pub fn format_command(severity: Severity, message: &str) -> String {
    match severity {
        Severity::Info => message.to_string(),
        other => format!("::{other}::{}", escape_data(message)),
    }
}

/// Sink that writes GitHub Actions workflow commands.
pub struct ActionsSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ActionsSink {
    /// Write commands to the given writer.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Write commands to stdout, where the runner picks them up.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    fn write_line(&self, line: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        let result = writeln!(out, "{line}");
        if let Err(e) = result.and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "Failed to write workflow command");
        }
    }
}

impl fmt::Debug for ActionsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionsSink").finish_non_exhaustive()
    }
}

impl GuidanceSink for ActionsSink {
    fn error(&self, message: &str) {
        self.write_line(&format_command(Severity::Error, message));
    }
    fn warning(&self, message: &str) {
        self.write_line(&format_command(Severity::Warning, message));
    }
    fn notice(&self, message: &str) {
        self.write_line(&format_command(Severity::Notice, message));
    }
    fn info(&self, message: &str) {
        self.write_line(&format_command(Severity::Info, message));
    }
    fn mask(&self, secret: &str) {
        if !secret.is_empty() {
            self.write_line(&format!("::add-mask::{}", escape_data(secret)));
        }
    }
}

// ---------------------------------------------------------------------------
// tracing
// ---------------------------------------------------------------------------

/// Sink that forwards messages to `tracing`, for runs outside Actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl GuidanceSink for TracingSink {
    fn error(&self, message: &str) {
        tracing::error!(target: "oauth_guard::guidance", "{message}");
    }
    fn warning(&self, message: &str) {
        tracing::warn!(target: "oauth_guard::guidance", "{message}");
    }
    fn notice(&self, message: &str) {
        tracing::info!(target: "oauth_guard::guidance", notice = true, "{message}");
    }
    fn info(&self, message: &str) {
        tracing::info!(target: "oauth_guard::guidance", "{message}");
    }
}

// ---------------------------------------------------------------------------
// In-memory recording
// ---------------------------------------------------------------------------

/// Sink that records every message. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<RwLock<Vec<(Severity, String)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages, oldest first.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.inner.read().expect("lock poisoned").clone()
    }

    /// Recorded messages of one severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<String> {
        self.inner
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().expect("lock poisoned").clear();
    }

    fn push(&self, severity: Severity, message: &str) {
        self.inner
            .write()
            .expect("lock poisoned")
            .push((severity, message.to_string()));
    }
}

impl GuidanceSink for RecordingSink {
    fn error(&self, message: &str) {
        self.push(Severity::Error, message);
    }
    fn warning(&self, message: &str) {
        self.push(Severity::Warning, message);
    }
    fn notice(&self, message: &str) {
        self.push(Severity::Notice, message);
    }
    fn info(&self, message: &str) {
        self.push(Severity::Info, message);
    }
}
