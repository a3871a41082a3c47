use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::repository::graphql::DEFAULT_ENDPOINT;
use crate::sync::engine::DEFAULT_BATCH_SIZE;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub github: GitHubSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSettings {
    pub token: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    pub batch_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl AppConfig {
    /// Token from the environment, falling back to the config file.
    pub fn token(&self) -> Result<String> {
        resolve_token(std::env::var(TOKEN_ENV).ok(), self.github.token.as_deref())
    }

    fn validate(&self) -> Result<()> {
        if self.sync.batch_size == 0 {
            bail!("sync.batch_size must be at least 1");
        }
        if self.github.api_url.trim().is_empty() {
            bail!("github.api_url must not be empty");
        }
        Ok(())
    }
}

fn resolve_token(from_env: Option<String>, from_file: Option<&str>) -> Result<String> {
    from_env
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            from_file
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
        })
        .with_context(|| {
            format!("No GitHub token. Set {TOKEN_ENV} or github.token in the config file")
        })
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("project-sync")
        .join("config.toml")
}

/// Load the config file. A missing default file yields defaults, a missing
/// explicit `path` is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (default_config_path(), false),
    };
    if !path.exists() {
        if explicit {
            bail!("Config file {} does not exist", path.display());
        }
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config = parse_config(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}
