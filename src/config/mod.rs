pub mod entity;
pub mod settings;
pub mod validator;

pub use entity::*;
pub use settings::*;
pub use validator::*;
