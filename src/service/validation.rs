//! Rule-based validation of submitted data against an entity's rule sets.

use crate::config::Rule;
use crate::service::repository::Repository;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static ALPHA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("static pattern"));
static ALPHA_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z ]+$").expect("static pattern"));
static ALPHA_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("static pattern"));
static ALPHA_NUMERIC_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_$%*\[\]()& ]+$").expect("static pattern"));
static ALPHA_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\-_$%*\[\]()& ]+$").expect("static pattern"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("static pattern")
});

/// Address shape plus a top-level label that is not all digits (`a@b.123` fails).
fn is_email(s: &str) -> bool {
    EMAIL.is_match(s)
        && s
            .rsplit('.')
            .next()
            .is_some_and(|tld| tld.bytes().any(|b| b.is_ascii_alphabetic()))
}

/// Key under which unknown rule names are reported.
pub const UNKNOWN_RULE_KEY: &str = "rules";

/// Column -> message. Rebuilt on every validation call; one message per column.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Message for `column`, or `""`.
    pub fn get(&self, column: &str) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or("")
    }

    /// Record a message, replacing any earlier one for the same column.
    pub fn set(&mut self, column: impl Into<String>, message: impl Into<String>) {
        self.0.insert(column.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Emptiness as form handling treats it: null, false, 0, "", "0" and empty collections.
pub fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Text form of a submitted value.
pub fn as_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(true) => "1".into(),
        Value::Bool(false) => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First character uppercased, the rest untouched.
pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Repository {
    /// Run the insert or update rule set over `data`. Columns missing from `data` are
    /// skipped, even when a column carries `required`. Returns true when no rule failed;
    /// messages are readable through [`Repository::error`] until the next call.
    pub async fn validate(&mut self, data: &Map<String, Value>) -> bool {
        let updating = self
            .entity()
            .primary_key
            .as_deref()
            .and_then(|pk| data.get(pk))
            .map(|v| !is_blank(v))
            .unwrap_or(false);
        let rules = if updating {
            self.entity().update_rules.clone()
        } else {
            self.entity().insert_rules.clone()
        };

        let mut errors = ValidationErrors::default();
        for (column, column_rules) in &rules {
            let Some(value) = data.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            for rule in column_rules {
                if let Some(message) = self.check(rule, column, value, data).await {
                    match rule {
                        Rule::Unknown(_) => errors.set(UNKNOWN_RULE_KEY, message),
                        _ => errors.set(column.as_str(), message),
                    }
                }
            }
        }

        if !errors.is_empty() {
            tracing::debug!(table = %self.entity().table, errors = errors.len(), "validation failed");
        }
        let ok = errors.is_empty();
        self.errors = errors;
        ok
    }

    /// Failure message for one rule, `None` when it passes.
    async fn check(&self, rule: &Rule, column: &str, value: &Value, data: &Map<String, Value>) -> Option<String> {
        let text = as_text(value);
        let trimmed = text.trim();
        let label = ucfirst(column);
        let fails = |re: &Regex| !re.is_match(trimmed);
        match rule {
            Rule::Required => is_blank(value).then(|| format!("{} is required", label)),
            Rule::Email => (!is_email(trimmed)).then(|| "Invalid email address".to_string()),
            Rule::Alpha => fails(&ALPHA)
                .then(|| format!("{} should only contain alphabetical letters without spaces", label)),
            Rule::AlphaSpace => {
                fails(&ALPHA_SPACE).then(|| format!("{} should only contain alphabetical letters & spaces", label))
            }
            Rule::AlphaNumeric => {
                fails(&ALPHA_NUMERIC).then(|| format!("{} should only alphabetical letters & numbers", label))
            }
            Rule::AlphaNumericSymbol => fails(&ALPHA_NUMERIC_SYMBOL).then(|| {
                format!("{} should only contain alphabetical letters, numbers, & symbols", label)
            }),
            Rule::AlphaSymbol => fails(&ALPHA_SYMBOL)
                .then(|| format!("{} should only contain alphabetical letters & symbols", label)),
            // Length in bytes: "ééééé" is ten.
            Rule::NotLessThan8Chars => {
                (trimmed.len() < 8).then(|| format!("{} should be 8 or more characters", label))
            }
            Rule::Unique => {
                let equals = [(column.to_string(), value.clone())];
                let pk = self.entity().primary_key().to_string();
                let existing = match data.get(&pk).filter(|v| !is_blank(v)) {
                    Some(id) => self.first(&equals, &[(pk.clone(), id.clone())]).await,
                    None => self.first(&equals, &[]).await,
                };
                existing.map(|_| format!("{} should be unique", label))
            }
            Rule::Unknown(name) => Some(format!("The rule {} was not found", name)),
        }
    }
}
