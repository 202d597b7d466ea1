use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::expiry::DEFAULT_BUFFER_MINUTES;
use crate::guidance::{AdvicePolicy, DEFAULT_NOTICE_HOURS, DEFAULT_WARN_HOURS};

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Setting keys (e.g. "expiry.buffer_minutes") mapped to the env var that set them.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub expiry: ExpiryConfig,
    #[serde(default)]
    pub advice: AdviceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
    /// The file the settings were read from; `None` when defaults were used.
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExpiryConfig {
    /// Minutes before the literal expiry at which a token counts as expired.
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: u32,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            buffer_minutes: default_buffer_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdviceConfig {
    /// Below this many hours left, a warning is emitted.
    #[serde(default = "default_warn_hours")]
    pub warn_hours: f64,
    /// Below this many hours left, an informational notice is emitted.
    #[serde(default = "default_notice_hours")]
    pub notice_hours: f64,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            warn_hours: default_warn_hours(),
            notice_hours: default_notice_hours(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Where operator guidance is written.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Workflow commands under GitHub Actions, log lines elsewhere.
    #[default]
    Auto,
    /// GitHub Actions workflow commands on stdout.
    Actions,
    /// `tracing` log lines on stderr.
    Plain,
}

impl OutputFormat {
    /// Resolve `Auto` given whether the process runs under GitHub Actions.
    pub fn resolve(self, in_github_actions: bool) -> Self {
        match self {
            Self::Auto if in_github_actions => Self::Actions,
            Self::Auto => Self::Plain,
            other => other,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Actions => write!(f, "actions"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "actions" | "github" | "github_actions" => Ok(Self::Actions),
            "plain" | "log" => Ok(Self::Plain),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_buffer_minutes() -> u32 {
    DEFAULT_BUFFER_MINUTES
}
const fn default_warn_hours() -> f64 {
    DEFAULT_WARN_HOURS
}
const fn default_notice_hours() -> f64 {
    DEFAULT_NOTICE_HOURS
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Loading, env overrides, validation
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply `OAUTH_GUARD_*`
    /// environment overrides.
    ///
    /// A missing file yields the defaults with `loaded_from` unset; this runs
    /// before logging is set up, so the caller reports it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.loaded_from = Some(path.to_path_buf());
            config
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds that cannot be ordered into tiers.
    pub fn validate(&self) -> anyhow::Result<()> {
        let advice = &self.advice;
        if !advice.warn_hours.is_finite() || advice.warn_hours < 0.0 {
            anyhow::bail!("advice.warn_hours must be a non-negative number, got {}", advice.warn_hours);
        }
        if !advice.notice_hours.is_finite() || advice.notice_hours < advice.warn_hours {
            anyhow::bail!(
                "advice.notice_hours ({}) must be at least advice.warn_hours ({})",
                advice.notice_hours,
                advice.warn_hours
            );
        }
        Ok(())
    }

    /// Thresholds for the validator.
    pub fn advice_policy(&self) -> AdvicePolicy {
        AdvicePolicy {
            buffer_minutes: self.expiry.buffer_minutes,
            warn_hours: self.advice.warn_hours,
            notice_hours: self.advice.notice_hours,
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    match val.trim().parse() {
                        Ok(parsed) => {
                            $field = parsed;
                            ov.record($key, $env);
                        }
                        Err(_) => {
                            tracing::warn!(var = $env, value = %val, "Ignoring unparseable override");
                        }
                    }
                }
            };
        }

        env_parse!("expiry.buffer_minutes", "OAUTH_GUARD_BUFFER_MINUTES", self.expiry.buffer_minutes);
        env_parse!("advice.warn_hours", "OAUTH_GUARD_WARN_HOURS", self.advice.warn_hours);
        env_parse!("advice.notice_hours", "OAUTH_GUARD_NOTICE_HOURS", self.advice.notice_hours);
        env_parse!("output.format", "OAUTH_GUARD_OUTPUT", self.output.format);
        env_str!("logging.level", "OAUTH_GUARD_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "OAUTH_GUARD_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
