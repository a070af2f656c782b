use crate::core::renderer::CloudBdii;
use crate::domain::model::Provider;
use crate::domain::ports::{MiddlewareProvider, Render};
use crate::utils::error::Result;
use std::path::PathBuf;

/// Runs one generation: optional live catalog lookup, then rendering.
pub struct BdiiGenerator {
    provider: Provider,
    template_dir: PathBuf,
    middleware: Option<Box<dyn MiddlewareProvider>>,
}

impl BdiiGenerator {
    pub fn new(provider: Provider, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            template_dir: template_dir.into(),
            middleware: None,
        }
    }

    pub fn with_middleware(mut self, middleware: Box<dyn MiddlewareProvider>) -> Self {
        self.middleware = Some(middleware);
        self
    }

    /// Provider data after applying the live catalog, if a middleware is set.
    pub async fn resolve_provider(&self) -> Result<Provider> {
        let Some(middleware) = &self.middleware else {
            tracing::info!("No middleware selected, using static catalogs");
            return Ok(self.provider.clone());
        };

        tracing::info!("📡 Querying {} for images and flavors", middleware.name());
        let images = middleware.images().await?;
        tracing::info!("📡 {} returned {} image(s)", middleware.name(), images.len());
        let flavors = middleware.flavors().await?;
        tracing::info!("📡 {} returned {} flavor(s)", middleware.name(), flavors.len());

        if images.is_empty() {
            tracing::warn!("{} returned no images, keeping static os_tpl", middleware.name());
        }
        if flavors.is_empty() {
            tracing::warn!("{} returned no flavors, keeping static resource_tpl", middleware.name());
        }

        Ok(self.provider.with_live_catalog(images, flavors))
    }

    pub async fn run(&self) -> Result<String> {
        let provider = self.resolve_provider().await?;
        let bdii = CloudBdii::new(&provider, &self.template_dir)?;
        let ldif = bdii.render()?;
        tracing::info!("✅ Rendered {} bytes of LDIF for {}", ldif.len(), provider.site.site_name);
        Ok(ldif)
    }
}
