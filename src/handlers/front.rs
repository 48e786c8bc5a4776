//! Front controller: every site request enters here and is dispatched by its logical route.

use crate::dispatch::RequestContext;
use crate::error::AppError;
use crate::extractors::SessionId;
use crate::session::{Loaded, SESSION_COOKIE};
use crate::state::AppState;
use crate::upload::UploadedFile;
use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    Form,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Query parameter carrying the logical route.
pub const ROUTE_PARAM: &str = "url";

/// Logical route: the `url` parameter when present, else the request path. An empty
/// path means no route was given.
pub fn route_of(query: &HashMap<String, String>, path: &str) -> Option<String> {
    if let Some(url) = query.get(ROUTE_PARAM) {
        return Some(url.clone());
    }
    let path = path.trim_matches('/');
    (!path.is_empty()).then(|| path.to_string())
}

type Body = (Map<String, Value>, HashMap<String, UploadedFile>);

async fn read_body(state: &AppState, req: Request) -> Result<Body, AppError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mut form = Map::new();
    let mut files = HashMap::new();
    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }
            match field.file_name().map(str::to_string) {
                // File input left empty by the browser.
                Some(file_name) if file_name.is_empty() => continue,
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                    files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.insert(name, Value::String(text));
                }
            }
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        form.extend(pairs.into_iter().map(|(k, v)| (k, Value::String(v))));
    }
    Ok((form, files))
}

/// GET or POST on any path. Loads the session, dispatches, persists the session and
/// hands a newly stored session's id back in the `sid` cookie.
pub async fn front(
    SessionId(sid): SessionId,
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    req: Request,
) -> Response {
    let method = req.method().clone();
    let route = route_of(&query, req.uri().path());

    let Loaded { id: sid, session, known } = state.sessions.load(sid.as_deref());
    let mut ctx = RequestContext::new(state.executor.clone(), state.settings.clone());
    ctx.method = method.clone();
    ctx.query = query;
    ctx.session = session;

    if method == Method::POST {
        match read_body(&state, req).await {
            Ok((form, files)) => {
                ctx.form = form;
                ctx.files = files;
            }
            Err(e) => return e.into_response(),
        }
    }

    let mut res = match state.registry.dispatch(route.as_deref(), &mut ctx).await {
        Ok(res) => res,
        Err(e) => e.into_response(),
    };

    if !state.sessions.commit(known, &sid, ctx.session) {
        return res;
    }
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, sid);
    match HeaderValue::from_str(&cookie) {
        Ok(v) => {
            res.headers_mut().append(header::SET_COOKIE, v);
        }
        Err(e) => tracing::warn!(error = %e, "session cookie not set"),
    }
    res
}
