//! Application state management

use crate::dashboard::Dashboard;
use crate::view::{ChannelView, HealthStatus};

/// Everything one frame of the dashboard renders
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Tab titles in registry order
    pub tabs: Vec<String>,

    /// Index of the active tab
    pub selected: usize,

    pub endpoint: String,

    /// Cards of the active dataset, in registry order
    pub views: Vec<ChannelView>,

    /// Last dataset switch error, cleared by the next successful switch
    pub error_message: Option<String>,
}

impl AppState {
    pub fn new(dashboard: &Dashboard) -> Self {
        let mut state = Self {
            tabs: dashboard
                .registry()
                .datasets()
                .iter()
                .map(|dataset| dataset.label.clone())
                .collect(),
            endpoint: dashboard.endpoint().to_string(),
            ..Self::default()
        };
        state.refresh(dashboard);
        state
    }

    /// Pull the current channel states out of the dashboard
    pub fn refresh(&mut self, dashboard: &Dashboard) {
        self.selected = dashboard.active_index().unwrap_or(0);
        self.views = dashboard.views();
    }

    pub fn live_count(&self) -> usize {
        self.views.iter().filter(|view| view.is_live()).count()
    }

    pub fn degraded_count(&self) -> usize {
        self.views
            .iter()
            .filter(|view| view.health == HealthStatus::Degraded)
            .count()
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }
}
