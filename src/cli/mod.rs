pub mod check;
pub mod compile;
pub mod probe;

use std::path::{Path, PathBuf};

use anyhow::Context;
use brewline::Config;
use clap::Args;

/// Configuration flags shared by every subcommand.
///
/// Layering: built-in defaults, then `--config`, then the individual flags.
/// In server mode the editor's `initializationOptions` go on top of all of
/// these.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON file with configuration (same keys as initializationOptions)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Dialect compiler executable
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub coffee: Option<String>,
    /// Verifier executable
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub tsc: Option<String>,
    /// Host language server executable (spoken to over --stdio)
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub host_server: Option<String>,
    /// Quiet period before compiling after an edit
    #[arg(long, global = true, value_name = "MS")]
    pub compile_debounce_ms: Option<u64>,
    /// Quiet period before verifying after a successful compile
    #[arg(long, global = true, value_name = "MS")]
    pub verify_debounce_ms: Option<u64>,
    /// Lifetime of cached compile and verify results
    #[arg(long, global = true, value_name = "SECS")]
    pub cache_ttl_secs: Option<u64>,
}

impl ConfigArgs {
    pub fn resolve(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => Config::default(),
        };
        if let Some(program) = &self.coffee {
            config.compiler.program = program.clone();
        }
        if let Some(program) = &self.tsc {
            config.verifier.program = program.clone();
        }
        if let Some(program) = &self.host_server {
            config.host_server.program = program.clone();
        }
        if let Some(ms) = self.compile_debounce_ms {
            config.compile_debounce_ms = ms;
        }
        if let Some(ms) = self.verify_debounce_ms {
            config.verify_debounce_ms = ms;
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.cache_ttl_secs = secs;
        }
        Ok(config)
    }
}

fn load_config_file(path: &Path) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file '{}'", path.display()))?;
    let options: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not valid JSON", path.display()))?;
    Config::default()
        .merge_json(&options)
        .with_context(|| format!("invalid config file '{}'", path.display()))
}

/// Read a dialect source file.
pub fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = ConfigArgs {
            coffee: Some("/opt/coffee".to_string()),
            compile_debounce_ms: Some(20),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.compiler.program, "/opt/coffee");
        assert_eq!(config.compile_debounce_ms, 20);
        assert_eq!(config.verify_debounce_ms, 300);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brewline.json");
        std::fs::write(&path, r#"{ "cacheTtlSecs": 60, "compileDebounceMs": 100 }"#).unwrap();
        let args = ConfigArgs {
            config: Some(path),
            compile_debounce_ms: Some(5),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.compile_debounce_ms, 5);
    }
}
