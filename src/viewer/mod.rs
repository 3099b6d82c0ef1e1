//! Terminal dashboard
//!
//! One tab per dataset, one card per channel of the active dataset.

mod app;
mod state;
mod ui;

pub use app::{Action, App};
pub use state::AppState;
