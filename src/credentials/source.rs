//! Read-only credential sources.

use std::collections::HashMap;
use std::sync::Arc;

/// Read-only lookup of credential values by name.
///
/// The controller reads credentials only through this trait, so tests can
/// supply a fixed snapshot instead of mutating the process environment.
pub trait CredentialSource: Send + Sync {
    /// Value for `name`, or `None` when unset.
    fn get(&self, name: &str) -> Option<String>;

    /// Get the name of this source.
    fn name(&self) -> &str;
}

impl<T: CredentialSource + ?Sized> CredentialSource for Arc<T> {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: CredentialSource + ?Sized> CredentialSource for Box<T> {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Credentials from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialSource;

impl CredentialSource for EnvCredentialSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn name(&self) -> &str {
        "env"
    }
}

/// Credentials from an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialSource {
    values: HashMap<String, String>,
}

impl MemoryCredentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

impl CredentialSource for MemoryCredentialSource {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_lookup() {
        let mut source = MemoryCredentialSource::new().with("A", "1");
        source.insert("B", "2");
        assert_eq!(source.get("A").as_deref(), Some("1"));
        assert_eq!(source.get("B").as_deref(), Some("2"));
        assert!(source.get("C").is_none());
        assert_eq!(source.name(), "memory");
    }

    #[test]
    fn test_env_source_reads_process_env() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("OAUTH_GUARD_TEST_ENV_SOURCE", "value"); }
        let source = EnvCredentialSource;
        assert_eq!(source.get("OAUTH_GUARD_TEST_ENV_SOURCE").as_deref(), Some("value"));
        assert!(source.get("OAUTH_GUARD_TEST_ENV_SOURCE_UNSET").is_none());
        unsafe { std::env::remove_var("OAUTH_GUARD_TEST_ENV_SOURCE"); }
    }

    #[test]
    fn test_boxed_source_delegates() {
        let source: Box<dyn CredentialSource> = Box::new(MemoryCredentialSource::new().with("K", "v"));
        assert_eq!(source.get("K").as_deref(), Some("v"));
        assert_eq!(source.name(), "memory");
    }
}
