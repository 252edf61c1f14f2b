//! Subscription Gateway
//!
//! HTTP service managing the lifecycle of time-bounded subscription keys:
//! - Issue keys with an expiry horizon or permanent keys without one
//! - Validate keys, deactivating lapsed ones at read time
//! - Retire expired keys eagerly with a periodic background sweep
//! - Administer records through a credential-checked management API

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::{InMemorySubscriptionRepository, SubscriptionService};

/// Build application state backed by the in-memory store
pub fn create_app_state(config: &AppConfig) -> AppState {
    let repository = Arc::new(InMemorySubscriptionRepository::new());
    let service = Arc::new(SubscriptionService::new(repository));

    AppState::new(service, config.auth.service_key.clone())
}
