//! Standard response envelope helpers and page/redirect responses for controllers.

use crate::config::Settings;
use crate::dispatch::RequestContext;
use crate::service::ValidationErrors;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data, meta: None }))
}

pub fn success_one_with_count<T: Serialize>(data: T, count: u64) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            data,
            meta: Some(serde_json::json!(MetaCount { count })),
        }),
    )
}

/// Rendered page: view name, title, site name, validation errors, the signed-in user
/// and any pending flash message, followed by `extra` fields.
pub fn page(view: &str, title: &str, ctx: &mut RequestContext, errors: &ValidationErrors, extra: Map<String, Value>) -> Response {
    page_body(view, title, ctx, errors, extra, None)
}

/// Same as [`page`], with a row count in `meta`.
pub fn page_with_count(
    view: &str,
    title: &str,
    ctx: &mut RequestContext,
    errors: &ValidationErrors,
    extra: Map<String, Value>,
    count: u64,
) -> Response {
    page_body(view, title, ctx, errors, extra, Some(count))
}

fn page_body(
    view: &str,
    title: &str,
    ctx: &mut RequestContext,
    errors: &ValidationErrors,
    extra: Map<String, Value>,
    count: Option<u64>,
) -> Response {
    let mut data = Map::new();
    data.insert("view".into(), Value::String(view.into()));
    data.insert("page_title".into(), Value::String(title.into()));
    data.insert("app_name".into(), Value::String(ctx.settings.app_name.clone()));
    data.insert("errors".into(), serde_json::json!(errors));
    data.insert(
        "user".into(),
        ctx.session.user().cloned().map(Value::Object).unwrap_or(Value::Null),
    );
    if let Some(message) = ctx.session.take_flash() {
        data.insert("message".into(), Value::String(message));
    }
    data.extend(extra);
    match count {
        Some(c) => success_one_with_count(Value::Object(data), c).into_response(),
        None => success_one_ok(Value::Object(data)).into_response(),
    }
}

/// 302 to `<root>/<path>`.
pub fn redirect(settings: &Settings, path: &str) -> Response {
    let location = settings.url_for(path);
    tracing::debug!(%location, "redirect");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
