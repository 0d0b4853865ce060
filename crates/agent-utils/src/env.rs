//! Environment lookup helpers
//!
//! Configuration structs across the workspace are loaded once at process
//! start through an [`EnvSource`]. Production code reads the process
//! environment; tests hand in a map so nothing global is mutated.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// A source of configuration variables
pub trait EnvSource {
    /// Look up a variable, returning `None` when unset
    fn var(&self, key: &str) -> Option<String>;

    /// Look up a variable, treating blank values as unset
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Parse a variable into `T`
    ///
    /// Returns `Ok(None)` when unset and an error message naming the key
    /// when the value does not parse.
    fn parse<T>(&self, key: &str) -> Result<Option<T>, String>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.non_empty(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| format!("{key}={raw:?} is invalid: {e}")),
        }
    }

    /// Parse a whole number of seconds
    fn duration_secs(&self, key: &str) -> Result<Option<Duration>, String> {
        Ok(self.parse::<u64>(key)?.map(Duration::from_secs))
    }

    /// Parse a whole number of milliseconds
    fn duration_millis(&self, key: &str) -> Result<Option<Duration>, String> {
        Ok(self.parse::<u64>(key)?.map(Duration::from_millis))
    }
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| (*v).to_string())
    }
}
