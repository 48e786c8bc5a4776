//! Safe SQL builder: identifiers from config or checked keys, values as named parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
