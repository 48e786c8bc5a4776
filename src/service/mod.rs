//! Data access: statement execution, entity repositories, rule validation.

pub mod executor;
mod repository;
mod validation;
pub use executor::{Executor, PgExecutor, Row};
pub use repository::Repository;
pub use validation::{as_text, is_blank, ucfirst, ValidationErrors, UNKNOWN_RULE_KEY};
