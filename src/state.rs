//! Shared application state for all routes.

use crate::config::{validate_entity, Settings};
use crate::dispatch::ControllerRegistry;
use crate::error::ConfigError;
use crate::models::User;
use crate::service::Executor;
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn Executor>,
    pub sessions: SessionStore,
    pub registry: Arc<ControllerRegistry>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Checks the built-in entity configurations before anything is served.
    pub fn new(
        executor: Arc<dyn Executor>,
        registry: ControllerRegistry,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        validate_entity(&User::entity())?;
        Ok(AppState {
            executor,
            sessions: SessionStore::new(),
            registry: Arc::new(registry),
            settings: Arc::new(settings),
        })
    }
}
