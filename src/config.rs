use anyhow::{format_err, Error};
use serde::Deserialize;
use std::env::var;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Deserialize, Debug)]
pub struct ConfigInner {
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    pub client_secret: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_dir().join(".config"))
        .join("vkasync")
}

fn default_save_path() -> PathBuf {
    home_dir().join("vkasync")
}

fn default_api_url() -> String {
    "https://api.vk.com/method/".into()
}

fn default_oauth_url() -> String {
    "https://oauth.vk.com/token".into()
}

fn default_api_version() -> String {
    "5.131".into()
}

fn default_client_id() -> String {
    "2274003".into()
}

fn default_scope() -> String {
    "audio,offline".into()
}

fn default_log_level() -> String {
    "error".into()
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            save_path: default_save_path(),
            api_url: default_api_url(),
            oauth_url: default_oauth_url(),
            api_version: default_api_version(),
            client_id: default_client_id(),
            client_secret: None,
            scope: default_scope(),
            log_level: default_log_level(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ConfigInner {
    pub fn from_env() -> Result<Self, Error> {
        envy::prefixed("VKASYNC_")
            .from_env()
            .map_err(|e| format_err!("Invalid configuration {}", e))
    }

    pub fn db_path(&self) -> PathBuf {
        self.config_dir.join("db.sqlite")
    }

    pub fn log_path(&self) -> PathBuf {
        self.config_dir.join("vkasync.log")
    }
}

#[derive(Default, Debug, Clone)]
pub struct Config(Arc<ConfigInner>);

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_inner(inner: ConfigInner) -> Self {
        Self(Arc::new(inner))
    }

    /// Load `.env`, then `config.env` from the config directory (or the
    /// current directory), then read the `VKASYNC_*` variables.
    pub fn init_config() -> Result<Self, Error> {
        dotenvy::dotenv().ok();
        Self::from_loaded_env()
    }

    fn from_loaded_env() -> Result<Self, Error> {
        let config_dir = var("VKASYNC_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_dir());
        let env_file = config_dir.join("config.env");

        if env_file.exists() {
            dotenvy::from_path(&env_file).ok();
        } else if Path::new("config.env").exists() {
            dotenvy::from_filename("config.env").ok();
        }

        let config = ConfigInner::from_env()?;

        Ok(Self(Arc::new(config)))
    }
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
