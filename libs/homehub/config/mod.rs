//! Bridge configuration: YAML file plus secrets from `.env`

use crate::alerts::AlertRule;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_ID_PREFIX: &str = "hass_bridge_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub hub: HubConfig,
    #[serde(default)]
    pub automations: AutomationsConfig,
    #[serde(default)]
    pub access: AccessConfig,
    /// State-change notifications pushed to the front-ends
    #[serde(default)]
    pub alerts: Vec<AlertRule>,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Long-lived access token from .env (not in YAML)
    #[serde(skip)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// WebSocket endpoint, e.g. `ws://homeassistant.local:8123/api/websocket`
    pub url: String,
    /// Base URL of the REST API; derived from `url` when absent
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_event_type")]
    pub event_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationsConfig {
    /// Reserved prefix marking automations owned by the bridge
    pub id_prefix: String,
}

impl Default for AutomationsConfig {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Identities allowed to query the hub; admins are implicitly included
    #[serde(default)]
    pub users: Vec<String>,
    /// Identities allowed to issue control actions
    #[serde(default)]
    pub admins: Vec<String>,
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_event_type() -> String {
    hubsockets::codec::STATE_CHANGED.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BridgeConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml_str(&yaml_content)?;

        // Don't fail if .env doesn't exist
        dotenv::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from environment variables alone
    ///
    /// `HA_URL` and `HA_TOKEN` are required; everything else takes its default.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("HA_URL").ok_or_else(|| ConfigError::EnvVarMissing("HA_URL".into()))?;

        let mut config = Self {
            hub: HubConfig {
                url,
                rest_url: None,
                reconnect_delay_secs: default_reconnect_delay(),
                event_type: default_event_type(),
            },
            automations: AutomationsConfig::default(),
            access: AccessConfig::default(),
            alerts: Vec::new(),
            log_level: default_log_level(),
            token: String::new(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Parse the YAML part only; secrets are filled in by [`apply_env`](Self::apply_env)
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Fill in the token and apply environment overrides
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        self.token = lookup("HA_TOKEN").ok_or_else(|| ConfigError::EnvVarMissing("HA_TOKEN".into()))?;

        if let Some(url) = lookup("HA_URL") {
            info!("Overriding hub URL from environment variable");
            self.hub.url = url;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.hub.url.starts_with("ws://") || self.hub.url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "hub.url must start with ws:// or wss://, got {}",
                self.hub.url
            )));
        }

        if let Some(rest_url) = &self.hub.rest_url {
            if !(rest_url.starts_with("http://") || rest_url.starts_with("https://")) {
                return Err(ConfigError::ValidationError(
                    "hub.rest_url must start with http:// or https://".to_string(),
                ));
            }
        }

        if self.token.trim().is_empty() {
            return Err(ConfigError::ValidationError("HA_TOKEN cannot be empty".to_string()));
        }

        if self.hub.reconnect_delay_secs == 0 {
            return Err(ConfigError::ValidationError(
                "hub.reconnect_delay_secs must be greater than 0".to_string(),
            ));
        }

        if self.hub.event_type.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "hub.event_type cannot be empty".to_string(),
            ));
        }

        if self.automations.id_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "automations.id_prefix cannot be empty".to_string(),
            ));
        }

        for rule in &self.alerts {
            rule.validate().map_err(ConfigError::ValidationError)?;
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.hub.reconnect_delay_secs)
    }

    /// REST base URL: `hub.rest_url`, or the WebSocket endpoint's origin
    pub fn rest_base_url(&self) -> String {
        if let Some(rest_url) = &self.hub.rest_url {
            return rest_url.trim_end_matches('/').to_string();
        }

        let origin = if let Some(rest) = self.hub.url.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if let Some(rest) = self.hub.url.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else {
            self.hub.url.clone()
        };

        origin
            .trim_end_matches('/')
            .trim_end_matches("/api/websocket")
            .to_string()
    }

    /// Log configuration summary (the token is never logged)
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Hub URL: {}", self.hub.url);
        info!("  REST URL: {}", self.rest_base_url());
        info!("  Reconnect delay: {} seconds", self.hub.reconnect_delay_secs);
        info!("  Event type: {}", self.hub.event_type);
        info!("  Automation prefix: {}", self.automations.id_prefix);
        info!(
            "  Access: {} users, {} admins",
            self.access.users.len(),
            self.access.admins.len()
        );
        info!("  Alert rules: {}", self.alerts.len());
        info!("  Log level: {}", self.log_level);
    }
}
