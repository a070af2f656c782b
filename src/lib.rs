pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, MiddlewareKind};

pub use config::toml_config::SiteConfig;
pub use crate::core::{generator::BdiiGenerator, renderer::CloudBdii};
pub use domain::model::{ImageTemplate, Provider, ResourceTemplate};
pub use domain::ports::{MiddlewareProvider, Render};
pub use utils::error::{BdiiError, Result};
