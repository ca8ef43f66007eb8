use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backends: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Backend endpoints, overridable because these free services change hosts
/// often. The defaults are the currently working URLs; the adapter contract
/// does not change when an endpoint moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_instagram")]
    pub instagram: String,
    #[serde(default = "default_instasocial")]
    pub instasocial: String,
    #[serde(default = "default_dlpanda")]
    pub dlpanda: String,
    #[serde(default = "default_instavery")]
    pub instavery: String,
    #[serde(default = "default_imgdownloader")]
    pub imgdownloader: String,
    #[serde(default = "default_igram")]
    pub igram: String,
    #[serde(default = "default_storiesig")]
    pub storiesig: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_instagram() -> String {
    "https://www.instagram.com".to_string()
}

fn default_instasocial() -> String {
    "https://www.instasocial.app/api/instagram/download".to_string()
}

fn default_dlpanda() -> String {
    "https://www.dlpanda.com/api/download".to_string()
}

fn default_instavery() -> String {
    "https://instavery.com/api/download".to_string()
}

fn default_imgdownloader() -> String {
    "https://www.imgdownloader.com/api/instagram/download".to_string()
}

fn default_igram() -> String {
    "https://igram.world/api/igram".to_string()
}

fn default_storiesig() -> String {
    "https://storiesig.com/api/ig/story".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            instagram: default_instagram(),
            instasocial: default_instasocial(),
            dlpanda: default_dlpanda(),
            instavery: default_instavery(),
            imgdownloader: default_imgdownloader(),
            igram: default_igram(),
            storiesig: default_storiesig(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging.format
    }

    /// Referer sent on relay fetches; the CDN checks it against the origin
    /// site's homepage.
    pub fn referer(&self) -> String {
        format!("{}/", self.backends.instagram.trim_end_matches('/'))
    }
}
