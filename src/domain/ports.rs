use crate::domain::model::{ImageTemplate, ResourceTemplate};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Live catalog source backed by a cloud middleware API.
///
/// Returning an empty list means "nothing to publish", in which case the
/// static catalog is kept. Any error aborts generation.
#[async_trait]
pub trait MiddlewareProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn images(&self) -> Result<Vec<ImageTemplate>>;
    async fn flavors(&self) -> Result<Vec<ResourceTemplate>>;
}

/// Anything that turns provider data into LDIF text.
pub trait Render {
    fn render(&self) -> Result<String>;
}
