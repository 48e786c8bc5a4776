use crate::dispatch::{Controller, RequestContext, DEFAULT_ACTION};
use crate::error::AppError;
use crate::models::User;
use crate::response::{page, redirect};
use async_trait::async_trait;
use axum::response::Response;
use serde_json::Map;

pub struct Signin;

#[async_trait]
impl Controller for Signin {
    fn actions(&self) -> &'static [&'static str] {
        &[]
    }

    async fn call(&self, action: &str, _args: Vec<String>, ctx: &mut RequestContext) -> Result<Response, AppError> {
        if action != DEFAULT_ACTION {
            return Err(super::missing("Signin", action));
        }
        let mut user = User::new(ctx.executor.clone());
        if ctx.posted() {
            if let Some(next) = user.signin(&ctx.form, &mut ctx.session).await {
                return Ok(redirect(&ctx.settings, next));
            }
        }
        Ok(page("signin", "Sign In", ctx, user.errors(), Map::new()))
    }
}
