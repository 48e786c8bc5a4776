//! Entity config validation: identifiers that reach SQL must be plain names.

use crate::config::{EntityConfig, Rule};
use crate::error::ConfigError;
use crate::sql::is_identifier;

fn check(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// Validate table, key, ordering, allow-list and rule columns. Unknown rule names
/// are only warned about; validation reports them per call.
pub fn validate_entity(entity: &EntityConfig) -> Result<(), ConfigError> {
    check("table", &entity.table)?;
    if let Some(pk) = &entity.primary_key {
        check("primary key", pk)?;
    }
    check("order column", &entity.order_column)?;
    for c in &entity.allowed_columns {
        check("allowed column", c)?;
    }
    for (col, cast) in &entity.casts {
        check("cast column", col)?;
        if !cast.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ') {
            return Err(ConfigError::Validation(format!("invalid cast '{}' for {}", cast, col)));
        }
    }
    for (col, rules) in entity.insert_rules.iter().chain(entity.update_rules.iter()) {
        check("rule column", col)?;
        for rule in rules {
            if let Rule::Unknown(name) = rule {
                tracing::warn!(table = %entity.table, column = %col, rule = %name, "unknown validation rule");
            }
        }
    }
    Ok(())
}
