use crate::dispatch::{Controller, RequestContext, DEFAULT_ACTION};
use crate::error::AppError;
use crate::response::page;
use crate::service::ValidationErrors;
use async_trait::async_trait;
use axum::response::Response;
use serde_json::Map;

pub struct Home;

#[async_trait]
impl Controller for Home {
    fn actions(&self) -> &'static [&'static str] {
        &[]
    }

    async fn call(&self, action: &str, _args: Vec<String>, ctx: &mut RequestContext) -> Result<Response, AppError> {
        match action {
            DEFAULT_ACTION => Ok(page("home", "Home", ctx, &ValidationErrors::default(), Map::new())),
            other => Err(super::missing("Home", other)),
        }
    }
}
