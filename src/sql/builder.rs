//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and aggregates for an entity.
//! Placeholders are named after their column (`:email`); values never enter the SQL text.

use crate::config::EntityConfig;
use crate::sql::params::{is_identifier, Params};
use serde_json::{Map, Value};

/// Column -> value pairs, in the order conditions are emitted.
pub type Filter = [(String, Value)];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Params,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Statement without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Record a bound value and return its placeholder (with the entity's cast, if any).
    fn push_param(&mut self, entity: &EntityConfig, name: &str, v: Value) -> String {
        self.params.push((name.to_string(), v));
        placeholder(entity, name)
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

fn placeholder(entity: &EntityConfig, name: &str) -> String {
    entity
        .cast_for(name)
        .map(|t| format!(":{}::{}", name, t))
        .unwrap_or_else(|| format!(":{}", name))
}

/// Keys that cannot be a column name are dropped before they reach SQL.
fn usable(key: &str, table: &str) -> bool {
    if is_identifier(key) {
        true
    } else {
        tracing::warn!(table = %table, key = %key, "dropping non-identifier key");
        false
    }
}

fn order_clause(entity: &EntityConfig) -> String {
    format!(" ORDER BY {} {}", entity.order_column, entity.order_type.as_sql())
}

fn page_clause(entity: &EntityConfig) -> String {
    format!(" LIMIT {} OFFSET {}", entity.limit, entity.offset)
}

/// `a = :a AND b != :b`. Empty when both filters are empty; callers that always
/// emit `WHERE` then produce a dangling clause the database rejects.
fn conditions(q: &mut QueryBuf, entity: &EntityConfig, equals: &Filter, not_equals: &Filter) -> String {
    let mut parts = Vec::new();
    for (col, val) in equals {
        if usable(col, &entity.table) {
            let ph = q.push_param(entity, col, val.clone());
            parts.push(format!("{} = {}", col, ph));
        }
    }
    for (col, val) in not_equals {
        if usable(col, &entity.table) {
            let ph = q.push_param(entity, col, val.clone());
            parts.push(format!("{} != {}", col, ph));
        }
    }
    parts.join(" AND ")
}

/// Appends ` WHERE <conds>`, or a bare ` WHERE` when there are none.
fn where_clause(q: &mut QueryBuf, entity: &EntityConfig, equals: &Filter, not_equals: &Filter) -> String {
    let conds = conditions(q, entity, equals, not_equals);
    if conds.is_empty() {
        " WHERE".to_string()
    } else {
        format!(" WHERE {}", conds)
    }
}

/// Keep only keys the entity allows to be written.
fn writable(entity: &EntityConfig, data: &Map<String, Value>) -> Vec<(String, Value)> {
    data.iter()
        .filter(|(k, _)| entity.is_writable(k) && usable(k, &entity.table))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// SELECT every row, ordered and paged by the entity settings.
pub fn select_all(entity: &EntityConfig) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT * FROM {}{}{}",
        entity.table,
        order_clause(entity),
        page_clause(entity)
    );
    q
}

/// SELECT rows matching the filters, ordered and paged.
pub fn select_where(entity: &EntityConfig, equals: &Filter, not_equals: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let w = where_clause(&mut q, entity, equals, not_equals);
    q.sql = format!(
        "SELECT * FROM {}{}{}{}",
        entity.table,
        w,
        order_clause(entity),
        page_clause(entity)
    );
    q
}

/// Like [`select_where`] without ORDER BY; callers keep the first row.
pub fn select_first(entity: &EntityConfig, equals: &Filter, not_equals: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let w = where_clause(&mut q, entity, equals, not_equals);
    q.sql = format!("SELECT * FROM {}{}{}", entity.table, w, page_clause(entity));
    q
}

/// INSERT of the writable subset of `data`.
pub fn insert(entity: &EntityConfig, data: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (k, v) in writable(entity, data) {
        placeholders.push(q.push_param(entity, &k, v));
        cols.push(k);
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        entity.table,
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE of the writable subset of `data` for the row whose `id_column` equals `id`.
/// The id is bound under `id_column`, replacing any value `data` carried for it.
pub fn update(entity: &EntityConfig, id: &Value, data: &Map<String, Value>, id_column: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in writable(entity, data) {
        let ph = q.push_param(entity, &k, v);
        sets.push(format!("{} = {}", k, ph));
    }
    let id_ph = q.push_param(entity, id_column, id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        entity.table,
        sets.join(", "),
        id_column,
        id_ph
    );
    q
}

/// DELETE the row whose `id_column` equals `id`.
pub fn delete(entity: &EntityConfig, id: &Value, id_column: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_ph = q.push_param(entity, id_column, id.clone());
    q.sql = format!("DELETE FROM {} WHERE {} = {}", entity.table, id_column, id_ph);
    q
}

pub fn count_all(entity: &EntityConfig) -> QueryBuf {
    QueryBuf::raw(format!("SELECT COUNT(*) AS total FROM {}", entity.table))
}

/// COUNT with the same WHERE construction as [`select_where`] (bare WHERE when unfiltered).
pub fn count_where(entity: &EntityConfig, equals: &Filter, not_equals: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let w = where_clause(&mut q, entity, equals, not_equals);
    q.sql = format!("SELECT COUNT(*) AS total FROM {}{}", entity.table, w);
    q
}

/// SUM of `column`; WHERE is omitted entirely when both filters are empty.
pub fn sum_column(entity: &EntityConfig, column: &str, equals: &Filter, not_equals: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let conds = conditions(&mut q, entity, equals, not_equals);
    let w = if conds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conds)
    };
    q.sql = format!(
        "SELECT CAST(SUM({}) AS DOUBLE PRECISION) AS total FROM {}{}",
        column, entity.table, w
    );
    q
}
