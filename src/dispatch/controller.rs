//! Controller contract and the per-request context handed to actions.

use crate::config::Settings;
use crate::dispatch::DEFAULT_ACTION;
use crate::error::AppError;
use crate::service::Executor;
use crate::session::Session;
use crate::upload::UploadedFile;
use async_trait::async_trait;
use axum::http::Method;
use axum::response::Response;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A unit of actions addressed by the first path segment.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Actions a path segment may name besides the default action, which every
    /// controller implements.
    fn actions(&self) -> &'static [&'static str];

    /// Run `action` with the leftover path segments. Unknown actions are an error.
    async fn call(&self, action: &str, args: Vec<String>, ctx: &mut RequestContext) -> Result<Response, AppError>;

    fn has_action(&self, name: &str) -> bool {
        name == DEFAULT_ACTION || self.actions().contains(&name)
    }
}

/// Everything an action may read or change for the current request.
pub struct RequestContext {
    pub method: Method,
    pub query: HashMap<String, String>,
    pub form: Map<String, Value>,
    pub files: HashMap<String, UploadedFile>,
    pub session: Session,
    pub executor: Arc<dyn Executor>,
    pub settings: Arc<Settings>,
}

impl RequestContext {
    pub fn new(executor: Arc<dyn Executor>, settings: Arc<Settings>) -> Self {
        RequestContext {
            method: Method::GET,
            query: HashMap::new(),
            form: Map::new(),
            files: HashMap::new(),
            session: Session::default(),
            executor,
            settings,
        }
    }

    /// POST carrying at least one form field.
    pub fn posted(&self) -> bool {
        self.method == Method::POST && !self.form.is_empty()
    }

    pub fn input(&self, key: &str) -> Option<&Value> {
        self.form.get(key)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(&self.query)
    }
}

/// Page numbers read from `?page=`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub prev_page: u32,
    pub next_page: u32,
}

impl Pagination {
    pub fn new(page: u32) -> Self {
        let page = page.max(1);
        Pagination {
            page,
            prev_page: if page <= 1 { 1 } else { page - 1 },
            next_page: page.saturating_add(1),
        }
    }

    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let page = query.get("page").and_then(|p| p.trim().parse().ok()).unwrap_or(1);
        Self::new(page)
    }

    /// Row offset of this page for `limit` rows per page.
    pub fn offset(&self, limit: u32) -> u32 {
        (self.page - 1).saturating_mul(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_from_query() {
        let q: HashMap<String, String> = [("page".to_string(), "3".to_string())].into();
        let p = Pagination::from_query(&q);
        assert_eq!((p.page, p.prev_page, p.next_page), (3, 2, 4));
        assert_eq!(p.offset(10), 20);

        let p = Pagination::from_query(&HashMap::new());
        assert_eq!((p.page, p.prev_page, p.next_page), (1, 1, 2));
        assert_eq!(p.offset(10), 0);

        let q: HashMap<String, String> = [("page".to_string(), "nope".to_string())].into();
        assert_eq!(Pagination::from_query(&q).page, 1);
    }

    #[test]
    fn last_page_number_does_not_overflow() {
        let p = Pagination::new(u32::MAX);
        assert_eq!((p.page, p.prev_page, p.next_page), (u32::MAX, u32::MAX - 1, u32::MAX));

        let q: HashMap<String, String> = [("page".to_string(), "4294967295".to_string())].into();
        let p = Pagination::from_query(&q);
        assert_eq!(p.next_page, u32::MAX);
        assert_eq!(p.offset(10), u32::MAX);
    }
}
