//! Consent Example Server Library
//!
//! This module exports the core building blocks (user store, authorization
//! flow, retrieval poller, push dispatcher) for testing and reuse.

pub mod config;
pub mod constants;
pub mod error;
pub mod flow;
pub mod models;
pub mod platform;
pub mod routes;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};

use std::sync::Arc;

use flow::AuthFlow;
use platform::PlatformClient;
use store::UserStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub platform: Arc<dyn PlatformClient>,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState with the given collaborators and configuration
    pub fn new(
        store: Arc<dyn UserStore>,
        platform: Arc<dyn PlatformClient>,
        config: Config,
    ) -> Self {
        Self {
            store,
            platform,
            config,
        }
    }

    /// Authorization flow controller bound to this state's collaborators
    pub fn auth_flow(&self) -> AuthFlow {
        AuthFlow::new(
            self.store.clone(),
            self.platform.clone(),
            self.config.contract(),
            self.config.service_id,
        )
    }
}
