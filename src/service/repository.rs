//! Generic data access bound to one entity configuration.
//!
//! Reads collapse "statement failed" and "no rows" into `None`; the failure is
//! logged and callers must check before use. Writes report a real result.

use crate::config::EntityConfig;
use crate::error::AppError;
use crate::service::executor::{Executor, Row};
use crate::service::validation::ValidationErrors;
use crate::sql::{self, Filter, QueryBuf};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct Repository {
    executor: Arc<dyn Executor>,
    entity: EntityConfig,
    pub(crate) errors: ValidationErrors,
}

impl Repository {
    pub fn new(executor: Arc<dyn Executor>, entity: EntityConfig) -> Self {
        Repository {
            executor,
            entity,
            errors: ValidationErrors::default(),
        }
    }

    pub fn entity(&self) -> &EntityConfig {
        &self.entity
    }

    /// Adjust paging or ordering for the following reads.
    pub fn entity_mut(&mut self) -> &mut EntityConfig {
        &mut self.entity
    }

    pub(crate) fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Rows ordered and paged by the entity settings.
    pub async fn find_all(&self) -> Option<Vec<Row>> {
        self.fetch_rows(sql::select_all(&self.entity)).await
    }

    /// Rows matching every equals and not-equals condition. At least one condition is
    /// required: with none the statement has a bare WHERE and yields `None`.
    pub async fn where_(&self, equals: &Filter, not_equals: &Filter) -> Option<Vec<Row>> {
        self.fetch_rows(sql::select_where(&self.entity, equals, not_equals)).await
    }

    /// First matching row. Same precondition as [`Repository::where_`].
    pub async fn first(&self, equals: &Filter, not_equals: &Filter) -> Option<Row> {
        self.fetch_rows(sql::select_first(&self.entity, equals, not_equals))
            .await
            .and_then(|rows| rows.into_iter().next())
    }

    /// Insert the allowed subset of `data`. Returns affected rows.
    pub async fn insert(&self, data: &Map<String, Value>) -> Result<u64, AppError> {
        let q = sql::insert(&self.entity, data);
        self.executor.execute(&q).await
    }

    /// Update the row whose `id` column equals `id`.
    pub async fn update(&self, id: &Value, data: &Map<String, Value>) -> Result<u64, AppError> {
        self.update_by(id, data, "id").await
    }

    pub async fn update_by(&self, id: &Value, data: &Map<String, Value>, id_column: &str) -> Result<u64, AppError> {
        let q = sql::update(&self.entity, id, data, id_column);
        self.executor.execute(&q).await
    }

    pub async fn delete(&self, id: &Value) -> Result<u64, AppError> {
        self.delete_by(id, "id").await
    }

    pub async fn delete_by(&self, id: &Value, id_column: &str) -> Result<u64, AppError> {
        let q = sql::delete(&self.entity, id, id_column);
        self.executor.execute(&q).await
    }

    pub async fn count_all(&self) -> Option<i64> {
        self.fetch_total(sql::count_all(&self.entity))
            .await
            .and_then(|v| v.as_i64())
    }

    /// Count of matching rows. With no conditions the statement is invalid and this
    /// yields `None`, unlike [`Repository::sum_column`].
    pub async fn count_where(&self, equals: &Filter, not_equals: &Filter) -> Option<i64> {
        self.fetch_total(sql::count_where(&self.entity, equals, not_equals))
            .await
            .and_then(|v| v.as_i64())
    }

    /// Sum of `column` over matching rows, or over the whole table when unfiltered.
    pub async fn sum_column(&self, column: &str, equals: &Filter, not_equals: &Filter) -> Option<f64> {
        self.fetch_total(sql::sum_column(&self.entity, column, equals, not_equals))
            .await
            .and_then(|v| v.as_f64())
    }

    /// Validation message recorded for `column`, empty when none.
    pub fn error(&self, column: &str) -> &str {
        self.errors.get(column)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    async fn fetch_rows(&self, q: QueryBuf) -> Option<Vec<Row>> {
        match self.executor.fetch(&q).await {
            Ok(rows) if !rows.is_empty() => Some(rows),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(table = %self.entity.table, sql = %q.sql, error = %e, "read failed");
                None
            }
        }
    }

    async fn fetch_total(&self, q: QueryBuf) -> Option<Value> {
        self.fetch_rows(q)
            .await
            .and_then(|rows| rows.into_iter().next())
            .and_then(|mut row| row.remove("total"))
    }
}
