use crate::dispatch::{Controller, RequestContext, DEFAULT_ACTION};
use crate::error::AppError;
use crate::response::page;
use crate::service::ValidationErrors;
use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Map, Value};

/// Fallback for paths naming no controller. Answers 200 with the unmatched path.
pub struct NotFound;

#[async_trait]
impl Controller for NotFound {
    fn actions(&self) -> &'static [&'static str] {
        &[]
    }

    async fn call(&self, action: &str, args: Vec<String>, ctx: &mut RequestContext) -> Result<Response, AppError> {
        if action != DEFAULT_ACTION {
            return Err(super::missing("_404", action));
        }
        let mut extra = Map::new();
        extra.insert("path".into(), Value::String(args.join("/")));
        extra.insert("detail".into(), json!("404 page not found Controller"));
        Ok(page("404", "Page Not Found", ctx, &ValidationErrors::default(), extra))
    }
}
