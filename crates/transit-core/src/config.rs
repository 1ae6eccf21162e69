use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    BADGE_POLL_INTERVAL_SECS, DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE, REQUEST_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL including the version prefix, e.g. `http://host/api/v1`
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub page_size: u32,
    pub badge_poll_interval: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new<P: AsRef<Path>>(api_base_url: impl Into<String>, data_dir: P) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `TRANSIT_API_URL` and `TRANSIT_DATA_DIR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TRANSIT_API_URL") {
            if !url.trim().is_empty() {
                config.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var("TRANSIT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir.trim());
            }
        }
        config
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("transit"))
            .unwrap_or_else(|| PathBuf::from("transit_data"))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_dir: Self::default_data_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            badge_poll_interval: Duration::from_secs(BADGE_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}
