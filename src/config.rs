//! Dashboard configuration
//!
//! Loaded from TOML. Every field has a default, so an absent config file
//! gives a dashboard for the three IMS bearing test sets against a local
//! detection service.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

use crate::channel::{ClientSettings, ReconnectPolicy, RetentionPolicy};
use crate::dashboard::{DatasetSpec, Registry};
use crate::error::ConfigError;

/// Environment variable overriding the endpoint
pub const ENDPOINT_ENV: &str = "SOD_MONITOR_ENDPOINT";

const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws";

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base WebSocket endpoint, `ws://` or `wss://`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Dataset shown at startup (default: first configured)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_dataset: Option<String>,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Sample retention per channel (default: unbounded)
    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Dataset registry, in tab order
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay between a disconnect and the next attempt (default: 5000)
    #[serde(default = "default_reconnect_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub id: String,

    /// Tab title (default: the id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub channels: Vec<String>,
}

/// Validated settings the dashboard is built from
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub endpoint: Url,
    pub registry: Registry,
    pub initial_dataset: String,
    pub client: ClientSettings,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn dataset(id: &str, label: &str, channels: &[&str]) -> DatasetConfig {
    DatasetConfig {
        id: id.to_string(),
        label: Some(label.to_string()),
        channels: channels.iter().map(|c| c.to_string()).collect(),
    }
}

fn default_datasets() -> Vec<DatasetConfig> {
    vec![
        dataset(
            "1st_test",
            "Test Set 1",
            &[
                "B1-Ch1 (Healthy)",
                "B1-Ch2 (Healthy)",
                "B2-Ch1 (Healthy)",
                "B2-Ch2 (Healthy)",
                "B3-Ch1 (Fail-Inner)",
                "B3-Ch2 (Fail-Inner)",
                "B4-Ch1 (Fail-Roller)",
                "B4-Ch2 (Fail-Roller)",
            ],
        ),
        dataset(
            "2nd_test",
            "Test Set 2",
            &[
                "B1-Ch1 (Fail-Outer)",
                "B2-Ch1 (Healthy)",
                "B3-Ch1 (Healthy)",
                "B4-Ch1 (Healthy)",
            ],
        ),
        dataset(
            "3rd_test",
            "Test Set 3",
            &[
                "B1-Ch1 (Healthy)",
                "B2-Ch1 (Healthy)",
                "B3-Ch1 (Fail-Outer)",
                "B4-Ch1 (Healthy)",
            ],
        ),
    ]
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            let home = dirs::home_dir()?;
            let default_path = home.join(".config/sod-monitor/viewer.toml");
            if default_path.exists() {
                Some(default_path)
            } else {
                None
            }
        });

        if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        trace!("loaded config: {config:?}");
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Apply `SOD_MONITOR_ENDPOINT` if set
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV)
            && !endpoint.trim().is_empty()
        {
            self.endpoint = endpoint.trim().to_string();
        }
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url =
            Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint(e.to_string()))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        if self.reconnect.delay_ms == 0 {
            return Err(ConfigError::ZeroReconnectDelay);
        }

        match self.retention {
            RetentionPolicy::Capacity { max_samples: 0 } | RetentionPolicy::Window { seconds: 0 } => {
                return Err(ConfigError::ZeroRetention);
            }
            _ => {}
        }

        Ok(ClientSettings {
            reconnect: ReconnectPolicy {
                delay: Duration::from_millis(self.reconnect.delay_ms),
            },
            retention: self.retention,
        })
    }

    pub fn registry(&self) -> Result<Registry, ConfigError> {
        Registry::new(
            self.datasets
                .iter()
                .map(|dataset| DatasetSpec {
                    id: dataset.id.clone(),
                    label: dataset.label.clone().unwrap_or_else(|| dataset.id.clone()),
                    channels: dataset.channels.clone(),
                })
                .collect(),
        )
    }

    /// Validate everything and produce the dashboard's settings
    pub fn dashboard_settings(&self) -> Result<DashboardSettings, ConfigError> {
        let endpoint = self.endpoint_url()?;
        let client = self.client_settings()?;
        let registry = self.registry()?;

        let initial_dataset = match &self.initial_dataset {
            Some(id) if registry.get(id).is_some() => id.clone(),
            Some(id) => return Err(ConfigError::UnknownInitialDataset(id.clone())),
            // a validated registry is never empty
            None => registry
                .datasets()
                .first()
                .map(|dataset| dataset.id.clone())
                .ok_or(ConfigError::EmptyRegistry)?,
        };

        Ok(DashboardSettings {
            endpoint,
            registry,
            initial_dataset,
            client,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            initial_dataset: None,
            reconnect: ReconnectConfig::default(),
            retention: RetentionPolicy::default(),
            datasets: default_datasets(),
        }
    }
}
