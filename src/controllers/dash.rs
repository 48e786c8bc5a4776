//! Admin dashboard. Every action requires a signed-in admin.

use crate::dispatch::{Controller, Pagination, RequestContext, DEFAULT_ACTION};
use crate::error::AppError;
use crate::models::{User, ADMIN};
use crate::response::{page, page_with_count, redirect};
use crate::service::ValidationErrors;
use crate::upload::handle_upload;
use async_trait::async_trait;
use axum::http::Method;
use axum::response::Response;
use serde_json::{Map, Value};

pub struct Dash;

impl Dash {
    fn is_admin(ctx: &RequestContext) -> bool {
        ctx.session.user_field("usertype").and_then(Value::as_str) == Some(ADMIN)
    }

    async fn index(ctx: &mut RequestContext) -> Result<Response, AppError> {
        let users = User::new(ctx.executor.clone());
        let total = users.repo().count_all().await.unwrap_or(0);
        let mut extra = Map::new();
        extra.insert("total_users".into(), Value::from(total));
        Ok(page("dash", "Dashboard", ctx, &ValidationErrors::default(), extra))
    }

    /// One page of users; the page number comes from the path (`dash/users/2`) or `?page=`.
    async fn users(args: &[String], ctx: &mut RequestContext) -> Result<Response, AppError> {
        let pagination = match args.first().and_then(|p| p.parse().ok()) {
            Some(n) => Pagination::new(n),
            None => ctx.pagination(),
        };
        let mut users = User::new(ctx.executor.clone());
        let entity = users.repo_mut().entity_mut();
        entity.offset = pagination.offset(entity.limit);

        let rows: Vec<Value> = users
            .repo()
            .find_all()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|mut row| {
                row.remove("password");
                Value::Object(row)
            })
            .collect();
        let count = rows.len() as u64;

        let mut extra = Map::new();
        extra.insert("rows".into(), Value::Array(rows));
        extra.insert("page".into(), Value::from(pagination.page));
        extra.insert("prev_page".into(), Value::from(pagination.prev_page));
        extra.insert("next_page".into(), Value::from(pagination.next_page));
        Ok(page_with_count("dash/users", "Users", ctx, &ValidationErrors::default(), extra, count))
    }

    /// Accepts one image in the `image` field of a multipart POST.
    async fn upload(ctx: &mut RequestContext) -> Result<Response, AppError> {
        let mut errors = ValidationErrors::default();
        let mut extra = Map::new();
        if ctx.method == Method::POST {
            match ctx.files.get("image") {
                Some(file) => match handle_upload(file, &ctx.settings.upload_dir).await? {
                    Some(stored) => {
                        extra.insert("file".into(), Value::String(stored.display().to_string()));
                        ctx.session.flash("Image uploaded");
                    }
                    None => errors.set("image", UPLOAD_REJECTED),
                },
                None => errors.set("image", "Please choose an image"),
            }
        }
        Ok(page("dash/upload", "Upload Image", ctx, &errors, extra))
    }
}

const UPLOAD_REJECTED: &str = "Only jpg, jpeg or png images up to 5MB are allowed";

#[async_trait]
impl Controller for Dash {
    fn actions(&self) -> &'static [&'static str] {
        &["users", "upload"]
    }

    async fn call(&self, action: &str, args: Vec<String>, ctx: &mut RequestContext) -> Result<Response, AppError> {
        if !Self::is_admin(ctx) {
            tracing::info!(action, "dashboard access denied");
            return Ok(redirect(&ctx.settings, "signin"));
        }
        match action {
            DEFAULT_ACTION => Self::index(ctx).await,
            "users" => Self::users(&args, ctx).await,
            "upload" => Self::upload(ctx).await,
            other => Err(super::missing("Dash", other)),
        }
    }
}
