//! Configuration management for Converse
//!
//! Loads the TOML configuration file (model, API key, proxy, named
//! contexts, pricing overrides), resolves the API key against the
//! environment, and exposes the read-only context and pricing tables the
//! session loop consumes. Configuration is loaded once before the loop
//! starts and immutable thereafter.

use crate::error::{ConverseError, Result};
use crate::session::PricingRate;
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Config file name probed under the home and XDG config directories
pub const CONFIG_FILENAME: &str = "converse.toml";

/// Environment variable that overrides the config file's `api_key`
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main configuration structure for Converse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default model used when the CLI does not override it
    pub model: String,

    /// API key; the `OPENAI_API_KEY` environment variable takes priority
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint base URL override
    #[serde(default)]
    pub api_base: Option<String>,

    /// Proxy URL applied to all provider requests
    #[serde(default)]
    pub proxy: Option<String>,

    /// Use vi editing bindings at the prompt
    #[serde(default)]
    pub vi_mode: bool,

    /// Named contexts: context name to system-prompt text.
    /// Absent when the config has no `[contexts]` section.
    #[serde(default)]
    pub contexts: Option<HashMap<String, String>>,

    /// Per-model pricing overrides merged over the built-in table
    #[serde(default)]
    pub pricing: HashMap<String, PricingRate>,
}

impl Config {
    /// Load configuration from an explicit path, or discover it.
    ///
    /// Discovery probes `~/.converse.toml` then the XDG config directory,
    /// dotfile first.
    ///
    /// # Errors
    ///
    /// Returns `ConverseError::Config` when no file is found or the file
    /// fails to parse.
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => PathBuf::from(p),
            None => Self::discover().ok_or_else(|| {
                ConverseError::Config(format!(
                    "config file not found; create ~/.{CONFIG_FILENAME} or put {CONFIG_FILENAME} in your config directory"
                ))
            })?,
        };
        Self::from_file(&path)
    }

    fn discover() -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(base) = BaseDirs::new() {
            candidates.push(base.home_dir().join(format!(".{CONFIG_FILENAME}")));
            candidates.push(base.config_dir().join(CONFIG_FILENAME));
        }
        candidates.into_iter().find(|p| p.is_file())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConverseError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&contents).map_err(|e| {
            ConverseError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    /// Resolve the API key: environment first, then the config file.
    ///
    /// # Errors
    ///
    /// Returns `ConverseError::Config` when no key is available or the
    /// key does not carry the `sk-` prefix.
    pub fn resolve_api_key(&self) -> Result<String> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone());

        let key = key.ok_or_else(|| {
            ConverseError::Config(format!(
                "API key not found; set it in the config file or via the {API_KEY_ENV} environment variable"
            ))
        })?;

        if !key.starts_with("sk-") {
            return Err(ConverseError::Config(
                "API key looks incorrect; expected it to start with \"sk-\"".to_string(),
            )
            .into());
        }
        Ok(key)
    }

    /// Pricing for a model: config override first, then the built-in
    /// table. Unknown models have no price and display as such.
    pub fn pricing_for(&self, model: &str) -> Option<PricingRate> {
        self.pricing
            .get(model)
            .copied()
            .or_else(|| default_pricing(model))
    }

    /// Path of the persistent prompt history file.
    pub fn history_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "converse").map(|dirs| dirs.data_dir().join("history"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            api_base: None,
            proxy: None,
            vi_mode: false,
            contexts: None,
            pricing: HashMap::new(),
        }
    }
}

/// Built-in per-1000-token pricing for the common model families.
fn default_pricing(model: &str) -> Option<PricingRate> {
    let (prompt, completion) = match model {
        "gpt-3.5-turbo" => (0.0015, 0.002),
        "gpt-3.5-turbo-16k" => (0.003, 0.004),
        "gpt-4" => (0.03, 0.06),
        "gpt-4-32k" => (0.06, 0.12),
        _ => return None,
    };
    Some(PricingRate { prompt, completion })
}
