pub mod generator;
pub mod renderer;
pub mod templates;

pub use crate::domain::model::{FieldValue, Fields, Provider, TemplateFields};
pub use crate::domain::ports::{MiddlewareProvider, Render};
pub use crate::utils::error::Result;
