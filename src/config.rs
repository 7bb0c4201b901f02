//! Persistent application configuration model and defaults.

use std::path::PathBuf;

use log::{error, info};

/// Root configuration persisted to `tubelist.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Local state storage location.
    pub store: StoreConfig,
    #[serde(default)]
    /// Title lookup service settings.
    pub lookup: LookupConfig,
    #[serde(default)]
    /// Playback display behavior.
    pub playback: PlaybackConfig,
    #[serde(default)]
    /// Backend service stub settings.
    pub service: ServiceConfig,
}

/// Storage location override; the platform data directory is used when unset.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Title lookup endpoint and limits.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LookupConfig {
    #[serde(default = "default_lookup_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_connect_timeout_s")]
    pub connect_timeout_s: u64,
    #[serde(default = "default_read_timeout_s")]
    pub read_timeout_s: u64,
    #[serde(default = "default_title_limit")]
    pub title_limit: usize,
}

/// Progress display behavior.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub progress_poll_interval_ms: u64,
}

/// Backend service stub bind address.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_lookup_endpoint() -> String {
    "https://noembed.com/embed".to_string()
}

fn default_connect_timeout_s() -> u64 {
    5
}

fn default_read_timeout_s() -> u64 {
    15
}

fn default_title_limit() -> usize {
    30
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_bind_addr() -> String {
    "127.0.0.1:4600".to_string()
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_lookup_endpoint(),
            connect_timeout_s: default_connect_timeout_s(),
            read_timeout_s: default_read_timeout_s(),
            title_limit: default_title_limit(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Loads the configuration file, writing one with defaults on first run.
/// Any read or parse problem falls back to defaults rather than aborting.
pub fn load_or_create() -> Config {
    let Some(config_dir) = dirs::config_dir() else {
        error!("Config: no config directory available, using defaults");
        return Config::default();
    };
    let config_file = config_dir.join("tubelist.toml");

    if !config_file.exists() {
        let default_config = Config::default();
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        if let Err(err) = std::fs::write(
            &config_file,
            toml::to_string(&default_config).expect("default config serializes"),
        ) {
            error!("Config: failed to write default config: {}", err);
        }
        return default_config;
    }

    match std::fs::read_to_string(&config_file) {
        Ok(content) => match toml::from_str::<Config>(&content) {
            Ok(config) => config,
            Err(err) => {
                error!("Config: failed to parse {}: {}", config_file.display(), err);
                Config::default()
            }
        },
        Err(err) => {
            error!("Config: failed to read {}: {}", config_file.display(), err);
            Config::default()
        }
    }
}
