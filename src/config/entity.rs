//! Entity configuration: table binding, writable columns, validation rule sets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One named validator applied to a column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Rule {
    Required,
    Email,
    Alpha,
    AlphaSpace,
    AlphaNumeric,
    AlphaNumericSymbol,
    AlphaSymbol,
    NotLessThan8Chars,
    Unique,
    /// Kept so the engine can report it at validation time.
    Unknown(String),
}

impl Rule {
    pub fn name(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::Email => "email",
            Rule::Alpha => "alpha",
            Rule::AlphaSpace => "alpha_space",
            Rule::AlphaNumeric => "alpha_numeric",
            Rule::AlphaNumericSymbol => "alpha_numeric_symbol",
            Rule::AlphaSymbol => "alpha_symbol",
            Rule::NotLessThan8Chars => "not_less_than_8_chars",
            Rule::Unique => "unique",
            Rule::Unknown(name) => name,
        }
    }
}

impl From<&str> for Rule {
    fn from(s: &str) -> Self {
        match s {
            "required" => Rule::Required,
            "email" => Rule::Email,
            "alpha" => Rule::Alpha,
            "alpha_space" => Rule::AlphaSpace,
            "alpha_numeric" => Rule::AlphaNumeric,
            "alpha_numeric_symbol" => Rule::AlphaNumericSymbol,
            "alpha_symbol" => Rule::AlphaSymbol,
            "not_less_than_8_chars" => Rule::NotLessThan8Chars,
            "unique" => Rule::Unique,
            other => Rule::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Rule {
    fn from(s: String) -> Self {
        Rule::from(s.as_str())
    }
}

impl From<Rule> for String {
    fn from(r: Rule) -> Self {
        r.name().to_string()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column -> ordered rules, walked in declaration order.
pub type RuleSet = IndexMap<String, Vec<Rule>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

fn default_primary_key() -> Option<String> {
    Some("id".into())
}

fn default_limit() -> u32 {
    10
}

fn default_order_column() -> String {
    "id".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: Option<String>,
    /// Empty means every submitted column is writable.
    #[serde(default)]
    pub allowed_columns: Vec<String>,
    #[serde(default)]
    pub insert_rules: RuleSet,
    #[serde(default)]
    pub update_rules: RuleSet,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_order_column")]
    pub order_column: String,
    #[serde(default)]
    pub order_type: SortOrder,
    /// SQL type casts applied to a column's placeholder (e.g. `id` -> `bigint`).
    #[serde(default)]
    pub casts: BTreeMap<String, String>,
}

impl EntityConfig {
    pub fn new(table: impl Into<String>) -> Self {
        EntityConfig {
            table: table.into(),
            primary_key: default_primary_key(),
            allowed_columns: Vec::new(),
            insert_rules: RuleSet::new(),
            update_rules: RuleSet::new(),
            limit: default_limit(),
            offset: 0,
            order_column: default_order_column(),
            order_type: SortOrder::default(),
            casts: BTreeMap::new(),
        }
    }

    /// Primary key column, `id` when none is configured.
    pub fn primary_key(&self) -> &str {
        self.primary_key.as_deref().unwrap_or("id")
    }

    pub fn is_writable(&self, column: &str) -> bool {
        self.allowed_columns.is_empty() || self.allowed_columns.iter().any(|c| c == column)
    }

    pub fn cast_for(&self, column: &str) -> Option<&str> {
        self.casts.get(column).map(String::as_str)
    }

    pub fn with_allowed_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_insert_rule(mut self, column: &str, rules: &[&str]) -> Self {
        self.insert_rules
            .insert(column.to_string(), rules.iter().map(|r| Rule::from(*r)).collect());
        self
    }

    pub fn with_update_rule(mut self, column: &str, rules: &[&str]) -> Self {
        self.update_rules
            .insert(column.to_string(), rules.iter().map(|r| Rule::from(*r)).collect());
        self
    }

    pub fn with_cast(mut self, column: &str, sql_type: &str) -> Self {
        self.casts.insert(column.to_string(), sql_type.to_string());
        self
    }
}
