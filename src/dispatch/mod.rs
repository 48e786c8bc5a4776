//! Front-controller dispatch: resolve a path to a controller action and run it.

pub mod controller;
mod router;

pub use controller::{Controller, Pagination, RequestContext};
pub use router::{split_path, ControllerFactory, ControllerRegistry, Route, DEFAULT_ACTION, HOME, NOT_FOUND};
