//! Application models built on [`crate::service::Repository`].

mod user;

pub use user::{User, ADMIN, LOGIN_COLUMN};
