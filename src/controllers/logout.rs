use crate::dispatch::{Controller, RequestContext, DEFAULT_ACTION, HOME};
use crate::error::AppError;
use crate::response::redirect;
use async_trait::async_trait;
use axum::response::Response;

pub struct Logout;

#[async_trait]
impl Controller for Logout {
    fn actions(&self) -> &'static [&'static str] {
        &[]
    }

    async fn call(&self, action: &str, _args: Vec<String>, ctx: &mut RequestContext) -> Result<Response, AppError> {
        match action {
            DEFAULT_ACTION => {
                ctx.session.logout();
                Ok(redirect(&ctx.settings, HOME))
            }
            other => Err(super::missing("Logout", other)),
        }
    }
}
