//! Runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, command-line flags, then the
//! editor's `initializationOptions`. Every field is optional on the wire;
//! anything left out keeps the value from the layer below.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid initialization options: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("initialization options must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// An external program and its fixed arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Quiet period after an edit before the dialect compile runs.
    pub compile_debounce_ms: u64,
    /// Quiet period after a successful compile before verification runs.
    pub verify_debounce_ms: u64,
    /// Lifetime of compile and verify cache entries.
    pub cache_ttl_secs: u64,
    /// Upper bound on a single request to the host language server.
    pub host_timeout_ms: u64,
    /// Upper bound on one verifier run.
    pub verify_timeout_ms: u64,
    /// Run the host verifier at all.
    pub verify: bool,
    pub compiler: CommandConfig,
    pub verifier: CommandConfig,
    pub host_server: CommandConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compile_debounce_ms: 500,
            verify_debounce_ms: 300,
            cache_ttl_secs: 180,
            host_timeout_ms: 5000,
            verify_timeout_ms: 30_000,
            verify: true,
            compiler: CommandConfig::new(
                "coffee",
                &["--bare", "--compile", "--inline-map", "--stdio"],
            ),
            verifier: CommandConfig::new(
                "tsc",
                &[
                    "--noEmit",
                    "--pretty",
                    "false",
                    "--allowJs",
                    "--alwaysStrict",
                    "--strictNullChecks",
                    "--target",
                    "esnext",
                ],
            ),
            host_server: CommandConfig::new("typescript-language-server", &["--stdio"]),
        }
    }
}

impl Config {
    pub fn compile_debounce(&self) -> Duration {
        Duration::from_millis(self.compile_debounce_ms)
    }

    pub fn verify_debounce(&self) -> Duration {
        Duration::from_millis(self.verify_debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn host_timeout(&self) -> Duration {
        Duration::from_millis(self.host_timeout_ms)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    /// Overlay `options` (the editor's `initializationOptions`) on top of
    /// this configuration. `null` leaves it unchanged.
    pub fn merge_json(&self, options: &Value) -> Result<Config, ConfigError> {
        match options {
            Value::Null => return Ok(self.clone()),
            Value::Object(_) => {}
            Value::Bool(_) => return Err(ConfigError::NotAnObject("a boolean")),
            Value::Number(_) => return Err(ConfigError::NotAnObject("a number")),
            Value::String(_) => return Err(ConfigError::NotAnObject("a string")),
            Value::Array(_) => return Err(ConfigError::NotAnObject("an array")),
        }
        let mut base = serde_json::to_value(self)?;
        merge_values(&mut base, options);
        Ok(serde_json::from_value(base)?)
    }
}

/// Recursive object merge: objects merge key by key, anything else replaces.
fn merge_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
