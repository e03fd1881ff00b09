use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::net::{ApiClientOptions, RetryOptions};
use crate::session::DEFAULT_STORAGE_KEY;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory holding the session database
    pub data_dir: PathBuf,

    /// Storage key the session snapshot is saved under
    pub storage_key: String,

    /// Base URL of the collaborator API (feedback, sharing, settings)
    pub api_base_url: String,

    /// Bearer token for the collaborator API
    pub api_token: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Retry policy for collaborator calls
    pub retry: RetryOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            api_base_url: "http://localhost:8080/api".to_string(),
            api_token: None,
            timeout_seconds: 30,
            retry: RetryOptions::default(),
        }
    }
}

impl Config {
    /// Initialize configuration from files, the environment and an optional
    /// data directory override from the command line
    pub async fn init(data_dir_override: Option<PathBuf>) -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = Self::default();

        // Files first, so the environment can override them
        if let Some(file_config) = Self::load_from_file().await? {
            config = file_config;
        }

        config.load_from_env();

        if let Some(data_dir) = data_dir_override {
            config.data_dir = data_dir;
        }

        if !config.data_dir.exists() {
            std::fs::create_dir_all(&config.data_dir)?;
        }

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = lookup("CONVO_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Some(key) = lookup("CONVO_STORAGE_KEY") {
            self.storage_key = key;
        }

        if let Some(url) = lookup("CONVO_API_BASE_URL") {
            self.api_base_url = url;
        }

        if let Some(token) = lookup("CONVO_API_TOKEN") {
            self.api_token = Some(token);
        }

        if let Some(retries) = lookup("CONVO_RETRIES").and_then(|s| s.parse().ok()) {
            self.retry.retries = retries;
        }

        if let Some(delay) = lookup("CONVO_RETRY_DELAY_MS").and_then(|s| s.parse().ok()) {
            self.retry.initial_delay_ms = delay;
        }

        if let Some(timeout) = lookup("CONVO_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeout_seconds = timeout;
        }
    }

    /// Load configuration from the first convo.json found
    pub async fn load_from_file() -> Result<Option<Self>> {
        // 1. ./.convo.json
        // 2. ./convo.json
        // 3. $CONFIG_DIR/convo/convo.json
        let mut config_paths = vec![PathBuf::from("./.convo.json"), PathBuf::from("./convo.json")];

        if let Some(config_dir) = dirs::config_dir() {
            config_paths.push(config_dir.join("convo").join("convo.json"));
        }

        for path in config_paths {
            if path.exists() {
                debug!("Loading configuration from: {}", path.display());
                let content = tokio::fs::read_to_string(&path).await?;
                let config = Self::from_json(&content).map_err(|e| {
                    anyhow::anyhow!("Invalid configuration in {}: {}", path.display(), e)
                })?;
                return Ok(Some(config));
            }
        }

        Ok(None)
    }

    /// Parse configuration JSON; missing fields keep their defaults
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Path of the SQLite database holding persisted sessions
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("sessions.db")
    }

    /// Options for the collaborator API client
    pub fn api_client_options(&self) -> ApiClientOptions {
        ApiClientOptions {
            base_url: self.api_base_url.clone(),
            api_token: self.api_token.clone(),
            timeout_seconds: self.timeout_seconds,
            retry: self.retry,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(anyhow::anyhow!("storage_key must not be empty"));
        }

        if self.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("timeout_seconds must be greater than 0"));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "api_base_url must start with http:// or https://, got {}",
                self.api_base_url
            ));
        }

        Ok(())
    }
}
