//! # Configuration Lookup
//!
//! Components read tunables through [`ConfigSource`] using dotted keys that
//! are namespaced to the component (for example `lf_pool.thread_pool_size`).
//! Values are raw strings; parsing and fallback belong to the caller.

use std::collections::HashMap;
use std::fmt;

/// Read-only, string-valued configuration lookup.
pub trait ConfigSource: Send + Sync {
    /// Returns the raw value for `key`, or `None` if it is not set.
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> ConfigSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Looks keys up in the process environment.
///
/// A dotted key is mapped to an environment variable name by upper-casing it
/// and replacing `.` and `-` with `_`, so `lf_pool.thread_pool_size` is read
/// from `LF_POOL_THREAD_POOL_SIZE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl EnvConfig {
    /// Environment variable name consulted for `key`.
    pub fn var_name(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok()
    }
}

/// In-memory configuration, handy when embedding or testing.
#[derive(Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl fmt::Debug for MapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapConfig")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// A source with nothing set; every lookup falls back to the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConfig;

impl ConfigSource for NoConfig {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}
