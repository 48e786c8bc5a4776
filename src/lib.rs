//! Andromeda MVC: a small site framework. Paths are dispatched to controller actions,
//! entities are read and written through parameterized SQL built from filter maps,
//! and submitted data is checked by per-column rule sets.

pub mod config;
pub mod controllers;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod response;
pub mod routes;
pub mod service;
pub mod session;
pub mod sql;
pub mod state;
pub mod store;
pub mod upload;

pub use config::{validate_entity, EntityConfig, Rule, Settings, SortOrder};
pub use controllers::default_registry;
pub use dispatch::{Controller, ControllerRegistry, RequestContext, Route};
pub use error::{AppError, ConfigError};
pub use response::{page, redirect, success_one_ok};
pub use routes::{app, common_routes, site_routes};
pub use service::{Executor, PgExecutor, Repository, Row, ValidationErrors};
pub use session::{Loaded, Session, SessionStore};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_schema};
