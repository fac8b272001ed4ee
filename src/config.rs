use crate::error::{Result, TrackerError};
use crate::http_client::{EnhancedHttpClient, HttpClientConfig};
use crate::pager::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub database_path: String,
    pub bind_address: String,
    pub port: u16,
    pub paging: PagingConfig,
    pub scheduler: SchedulerConfig,
    pub http: HttpConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PagingConfig {
    /// Chapters per page for `list_chapters` and the API
    pub page_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Seconds between two full update checks
    pub check_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    /// Maximum number of retry attempts for failed requests
    pub max_retries: usize,

    /// Initial retry delay in milliseconds
    pub initial_retry_delay_ms: u64,

    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,

    /// Timeout for HTTP requests in seconds
    pub timeout_secs: u64,

    pub enable_cookies: bool,

    /// Enable gzip/brotli compression
    pub enable_compression: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdaptersConfig {
    /// Adapter names in registration order. Earlier entries win URL routing.
    pub enabled: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "manga.db".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            paging: PagingConfig::default(),
            scheduler: SchedulerConfig::default(),
            http: HttpConfig::default(),
            adapters: AdaptersConfig::default(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 600,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            timeout_secs: 30,
            enable_cookies: true,
            enable_compression: true,
        }
    }
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["manhuafast".to_string(), "omegascans".to_string()],
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults.
    pub fn load() -> Self {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Ignoring {}: {}", CONFIG_FILE, e);
                Self::default()
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(content).map_err(|e| TrackerError::Config(e.to_string()))?;
        if cfg.paging.page_size == 0 {
            return Err(TrackerError::Config("paging.page_size must be at least 1".to_string()));
        }
        Ok(cfg)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.check_interval_secs.max(1))
    }
}

impl HttpConfig {
    pub fn create_http_client(&self) -> std::result::Result<EnhancedHttpClient, reqwest::Error> {
        let config = HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            initial_retry_delay_ms: self.initial_retry_delay_ms,
            max_retry_delay_ms: self.max_retry_delay_ms,
            enable_cookies: self.enable_cookies,
            enable_gzip: self.enable_compression,
        };

        EnhancedHttpClient::with_config(config)
    }
}
