use crate::dispatch::{Controller, RequestContext, DEFAULT_ACTION};
use crate::error::AppError;
use crate::models::User;
use crate::response::{page, redirect};
use async_trait::async_trait;
use axum::response::Response;
use serde_json::Map;

pub struct Signup;

#[async_trait]
impl Controller for Signup {
    fn actions(&self) -> &'static [&'static str] {
        &[]
    }

    async fn call(&self, action: &str, _args: Vec<String>, ctx: &mut RequestContext) -> Result<Response, AppError> {
        if action != DEFAULT_ACTION {
            return Err(super::missing("Signup", action));
        }
        let mut user = User::new(ctx.executor.clone());
        if ctx.posted() && user.signup(&ctx.form).await? {
            ctx.session.flash("Account created, please sign in");
            return Ok(redirect(&ctx.settings, "signin"));
        }
        Ok(page("signup", "Sign Up", ctx, user.errors(), Map::new()))
    }
}
