use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub browse: BrowseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Fixed API base such as `https://de1.api.radio-browser.info`.
    /// When unset, a mirror is picked through server discovery.
    pub base_url: Option<String>,
    /// Where the mirror list is fetched from.
    pub discovery_url: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub station_timeout_secs: u64,
    pub reference_timeout_secs: u64,
    pub max_attempts: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            discovery_url: "https://all.api.radio-browser.info".to_string(),
            user_agent: "RadioHub/0.1 (+https://www.radio-browser.info)".to_string(),
            connect_timeout_secs: 5,
            station_timeout_secs: 15,
            reference_timeout_secs: 10,
            max_attempts: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub top_ttl_secs: u64,
    pub reference_ttl_secs: u64,
    pub search_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            top_ttl_secs: 30 * 60,
            reference_ttl_secs: 60 * 60,
            search_ttl_secs: 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn top_ttl(&self) -> Duration {
        Duration::from_secs(self.top_ttl_secs)
    }

    pub fn reference_ttl(&self) -> Duration {
        Duration::from_secs(self.reference_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    pub top_limit: u32,
    pub search_limit: u32,
    pub reference_list_limit: usize,
    pub recent_history: usize,
    pub default_min_bitrate_kbps: u32,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            top_limit: 300,
            search_limit: 200,
            reference_list_limit: 250,
            recent_history: 10,
            default_min_bitrate_kbps: 64,
        }
    }
}

impl AppConfig {
    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read config: {path:?}")),
        };
        let text = String::from_utf8_lossy(&bytes);
        Self::parse(&text).with_context(|| format!("Invalid config TOML: {path:?}"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

pub fn config_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os("RADIOHUB_CONFIG") {
        return Ok(PathBuf::from(p));
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config"))
        })
        .context("Could not determine XDG config directory")?;
    Ok(base.join("radiohub").join("config.toml"))
}
