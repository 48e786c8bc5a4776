//! HTTP handlers.

pub mod front;
pub use front::*;
