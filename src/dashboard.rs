//! Dashboard orchestration
//!
//! Owns the dataset registry and the channel clients of the active dataset.
//! Inactive datasets have no clients at all; switching datasets tears every
//! old client down before the new ones are spawned.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument, warn};
use url::Url;

use crate::channel::{ChannelHandle, ChannelKey, ClientSettings};
use crate::config::DashboardSettings;
use crate::error::{ConfigError, DashboardError};
use crate::transport::{Transport, channel_url};
use crate::view::ChannelView;

/// One dataset (test set) and its channels, in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub id: String,
    pub label: String,
    pub channels: Vec<String>,
}

/// Immutable dataset → channels registry
#[derive(Debug, Clone)]
pub struct Registry {
    datasets: Arc<[DatasetSpec]>,
}

impl Registry {
    pub fn new(datasets: Vec<DatasetSpec>) -> Result<Self, ConfigError> {
        if datasets.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        let mut ids = HashSet::new();
        for dataset in &datasets {
            if !ids.insert(dataset.id.as_str()) {
                return Err(ConfigError::DuplicateDataset(dataset.id.clone()));
            }
            if dataset.channels.is_empty() {
                return Err(ConfigError::EmptyDataset(dataset.id.clone()));
            }

            let mut channels = HashSet::new();
            for channel in &dataset.channels {
                if !channels.insert(channel.as_str()) {
                    return Err(ConfigError::DuplicateChannel {
                        dataset: dataset.id.clone(),
                        channel: channel.clone(),
                    });
                }
            }
        }

        Ok(Self {
            datasets: datasets.into(),
        })
    }

    pub fn datasets(&self) -> &[DatasetSpec] {
        &self.datasets
    }

    pub fn get(&self, id: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|dataset| dataset.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.datasets.iter().position(|dataset| dataset.id == id)
    }
}

/// Runs the channel clients of the active dataset
pub struct Dashboard {
    registry: Registry,
    endpoint: Url,
    transport: Arc<dyn Transport>,
    client_settings: ClientSettings,
    initial_dataset: String,
    active: Option<String>,
    clients: Vec<ChannelHandle>,
}

impl Dashboard {
    /// Create a dashboard without connecting anything yet
    pub fn new(settings: DashboardSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: settings.registry,
            endpoint: settings.endpoint,
            transport,
            client_settings: settings.client,
            initial_dataset: settings.initial_dataset,
            active: None,
            clients: Vec::new(),
        }
    }

    /// Create a dashboard and activate its initial dataset
    pub async fn start(
        settings: DashboardSettings,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DashboardError> {
        let mut dashboard = Self::new(settings, transport);
        let initial = dashboard.initial_dataset.clone();
        dashboard.activate(&initial).await?;
        Ok(dashboard)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&DatasetSpec> {
        self.active.as_deref().and_then(|id| self.registry.get(id))
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
            .as_deref()
            .and_then(|id| self.registry.position(id))
    }

    /// Clients of the active dataset, in registry order
    pub fn clients(&self) -> &[ChannelHandle] {
        &self.clients
    }

    pub fn views(&self) -> Vec<ChannelView> {
        self.clients.iter().map(ChannelHandle::view).collect()
    }

    /// Make `id` the active dataset
    ///
    /// Activating the already-active dataset keeps its clients running. An
    /// unknown id leaves the current clients untouched.
    #[instrument(skip(self))]
    pub async fn activate(&mut self, id: &str) -> Result<(), DashboardError> {
        if self.active.as_deref() == Some(id) {
            return Ok(());
        }

        let dataset = self
            .registry
            .get(id)
            .ok_or_else(|| DashboardError::UnknownDataset(id.to_string()))?
            .clone();

        let mut targets = Vec::with_capacity(dataset.channels.len());
        for channel in &dataset.channels {
            let url = channel_url(&self.endpoint, &dataset.id, channel)
                .map_err(|e| DashboardError::InvalidChannelUrl(e.to_string()))?;
            targets.push((ChannelKey::new(&dataset.id, channel), url));
        }

        self.teardown().await;

        info!(
            "activating dataset {} with {} channels",
            dataset.id,
            targets.len()
        );

        self.clients = targets
            .into_iter()
            .map(|(key, url)| {
                ChannelHandle::spawn(key, url, self.transport.clone(), self.client_settings)
            })
            .collect();
        self.active = Some(dataset.id);

        Ok(())
    }

    /// Activate the dataset at `index` in registry order
    pub async fn activate_index(&mut self, index: usize) -> Result<(), DashboardError> {
        let id = self
            .registry
            .datasets()
            .get(index)
            .map(|dataset| dataset.id.clone())
            .ok_or_else(|| DashboardError::UnknownDataset(format!("#{}", index + 1)))?;

        self.activate(&id).await
    }

    pub async fn activate_next(&mut self) -> Result<(), DashboardError> {
        let count = self.registry.datasets().len();
        let next = self.active_index().map_or(0, |index| (index + 1) % count);
        self.activate_index(next).await
    }

    pub async fn activate_previous(&mut self) -> Result<(), DashboardError> {
        let count = self.registry.datasets().len();
        let previous = self
            .active_index()
            .map_or(0, |index| (index + count - 1) % count);
        self.activate_index(previous).await
    }

    /// Tear down every client; the dashboard can be activated again later
    pub async fn shutdown(&mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            info!("deactivating dataset {}", active);
        }

        let results = join_all(self.clients.drain(..).map(ChannelHandle::shutdown)).await;
        for result in results {
            if let Err(e) = result {
                warn!("{:#}", e);
            }
        }
    }
}
