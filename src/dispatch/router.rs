//! Path-to-controller resolution.
//!
//! Segment 0 names the controller (first letter capitalized), either directly or
//! as a nested `Name/Name` unit; anything else lands on the not-found controller.
//! Segment 1 names an action only when it matches one exactly; otherwise `index`
//! runs. Segments not consumed are passed to the action in order.

use crate::dispatch::controller::{Controller, RequestContext};
use crate::error::AppError;
use crate::service::ucfirst;
use axum::response::Response;
use std::collections::HashMap;

/// Route used when the request names none.
pub const HOME: &str = "home";
/// Controller id used when no controller matches.
pub const NOT_FOUND: &str = "_404";
pub const DEFAULT_ACTION: &str = "index";

pub type ControllerFactory = fn() -> Box<dyn Controller>;

/// Outcome of resolving a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub controller: String,
    pub action: String,
    pub args: Vec<String>,
}

/// Closed table of controllers, built once at startup.
#[derive(Default)]
pub struct ControllerRegistry {
    top: HashMap<String, ControllerFactory>,
    nested: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level controller under `id` (e.g. `Signin`).
    pub fn controller(mut self, id: &str, factory: ControllerFactory) -> Self {
        self.top.insert(id.to_string(), factory);
        self
    }

    /// Register a controller living in its own directory, keyed `id/id`.
    pub fn nested(mut self, id: &str, factory: ControllerFactory) -> Self {
        self.nested.insert(format!("{}/{}", id, id), factory);
        self
    }

    fn lookup(&self, id: &str) -> Option<ControllerFactory> {
        self.top
            .get(id)
            .or_else(|| self.nested.get(&format!("{}/{}", id, id)))
            .copied()
    }

    /// Resolve `path` and instantiate its controller.
    pub fn resolve(&self, path: Option<&str>) -> Result<(Route, Box<dyn Controller>), AppError> {
        let segments = split_path(path);
        let mut remaining: Vec<Option<&str>> = segments.iter().map(|s| Some(s.as_str())).collect();

        let name = ucfirst(&segments[0]);
        let (controller_id, factory) = match self.lookup(&name) {
            Some(f) if !name.is_empty() => {
                remaining[0] = None;
                (name, f)
            }
            _ => {
                let f = self
                    .top
                    .get(NOT_FOUND)
                    .copied()
                    .ok_or_else(|| AppError::MissingController(NOT_FOUND.into()))?;
                (NOT_FOUND.to_string(), f)
            }
        };
        let controller = factory();

        let mut action = DEFAULT_ACTION.to_string();
        if let Some(candidate) = segments.get(1).filter(|s| !s.is_empty() && s.as_str() != "0") {
            if controller.has_action(candidate) {
                action = candidate.clone();
                remaining[1] = None;
            }
        }

        let args = remaining.into_iter().flatten().map(str::to_string).collect();
        let route = Route {
            controller: controller_id,
            action,
            args,
        };
        tracing::info!(controller = %route.controller, action = %route.action, args = ?route.args, "route resolved");
        Ok((route, controller))
    }

    /// Resolve `path` and run the action.
    pub async fn dispatch(&self, path: Option<&str>, ctx: &mut RequestContext) -> Result<Response, AppError> {
        let (route, controller) = self.resolve(path)?;
        controller.call(&route.action, route.args, ctx).await
    }
}

/// Trim `/` from both ends and split. Always yields at least one segment.
pub fn split_path(path: Option<&str>) -> Vec<String> {
    let path = path.unwrap_or(HOME);
    path.trim_matches('/').split('/').map(str::to_string).collect()
}
