//! Engine configuration file (`arena.toml`)
//!
//! ```toml
//! [engines.stockfish]
//! path = "/usr/bin/stockfish"
//! options = { Threads = 2, Hash = 256 }
//!
//! [engines.dev]
//! path = "./build/chess_engine"
//! args = ["--uci"]
//! handshake_timeout_ms = 20000
//! ```

use anyhow::{Context, Result};
use arena_runner::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaConfig {
    #[serde(default)]
    pub engines: BTreeMap<String, EngineEntry>,
}

/// One named engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// UCI options; numbers and booleans are sent as written
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
    pub handshake_timeout_ms: Option<u64>,
    pub grace_ms: Option<u64>,
    pub depth_budget_ms: Option<u64>,
    pub quit_grace_ms: Option<u64>,
}

impl ArenaConfig {
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid engine configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("in {}", path.display()))
    }

    /// Engine settings for `spec`: a configured name, or else a path to an
    /// executable. `extra` options are applied last.
    pub fn resolve(&self, spec: &str, extra: &[(String, String)]) -> EngineConfig {
        let mut config = match self.engines.get(spec) {
            Some(entry) => entry.to_engine_config(spec),
            None => EngineConfig::new(label_for_path(spec), spec),
        };
        for (name, value) in extra {
            config.options.insert(name.clone(), value.clone());
        }
        config
    }
}

impl EngineEntry {
    fn to_engine_config(&self, name: &str) -> EngineConfig {
        let mut config = EngineConfig::new(name, self.path.clone()).with_args(self.args.clone());
        for (option, value) in &self.options {
            let value = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            config = config.with_option(option.clone(), value);
        }
        let ms = Duration::from_millis;
        if let Some(t) = self.handshake_timeout_ms {
            config.handshake_timeout = ms(t);
        }
        if let Some(t) = self.grace_ms {
            config.grace = ms(t);
        }
        if let Some(t) = self.depth_budget_ms {
            config.depth_budget = ms(t);
        }
        if let Some(t) = self.quit_grace_ms {
            config.quit_grace = ms(t);
        }
        config
    }
}

/// File name of an executable path, used as the engine's label.
fn label_for_path(spec: &str) -> String {
    Path::new(spec)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| spec.to_string())
}

/// Parse a `Name=Value` UCI option argument.
pub fn parse_option(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected Name=Value, got `{arg}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing option name in `{arg}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
