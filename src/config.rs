//! Configuration for fauxpost.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FAUXPOST_HOME, FAUXPOST_STORE)
//! 2. Config file (.fauxpost/config.yaml)
//! 3. Defaults (~/.fauxpost)
//!
//! Config file discovery:
//! - Searches current directory and parents for .fauxpost/config.yaml
//! - `paths.home` is relative to the .fauxpost/ directory, `paths.store`
//!   is relative to home

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{LinkSettings, SessionSettings};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".fauxpost";
const DEFAULT_STORE_FILE: &str = "store.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub links: Option<LinkSettings>,
    #[serde(default)]
    pub enabled_by_default: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .fauxpost/)
    pub home: Option<String>,
    /// Store file (relative to home)
    pub store: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the fauxpost home directory
    pub home: PathBuf,
    /// Path to the JSON record store
    pub store: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// URL bases for share links and hashtags
    pub links: LinkSettings,
    /// Toggle value used before one is stored
    pub enabled_by_default: bool,
}

impl ResolvedConfig {
    /// Settings to start a session with
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            links: self.links.clone(),
            enabled_by_default: self.enabled_by_default,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine a parsed config file (if any) with env overrides and defaults
fn resolve(
    config_file: Option<PathBuf>,
    file: Option<ConfigFile>,
    env_home: Option<String>,
    env_store: Option<String>,
) -> Result<ResolvedConfig> {
    let file = file.unwrap_or(ConfigFile {
        version: "1.0".to_string(),
        paths: PathsConfig::default(),
        links: None,
        enabled_by_default: None,
    });

    let home = if let Some(env_home) = env_home {
        PathBuf::from(env_home)
    } else if let (Some(home_path), Some(config_path)) = (&file.paths.home, &config_file) {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        resolve_path(config_dir, home_path)
    } else {
        dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(CONFIG_DIR)
    };

    let store = if let Some(env_store) = env_store {
        PathBuf::from(env_store)
    } else if let Some(ref store_path) = file.paths.store {
        resolve_path(&home, store_path)
    } else {
        home.join(DEFAULT_STORE_FILE)
    };

    Ok(ResolvedConfig {
        home,
        store,
        config_file,
        links: file.links.unwrap_or_default(),
        enabled_by_default: file.enabled_by_default.unwrap_or(true),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = config_file
        .as_deref()
        .map(load_config_file)
        .transpose()?;

    resolve(
        config_file,
        file,
        std::env::var("FAUXPOST_HOME").ok(),
        std::env::var("FAUXPOST_STORE").ok(),
    )
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
