use crate::core::templates::{TemplateName, TemplateStore};
use crate::domain::model::{Fields, Provider, TemplateFields};
use crate::domain::ports::Render;
use crate::utils::error::Result;
use std::path::Path;

const STORAGE_TEMPLATES: &[TemplateName] = &[
    TemplateName::StorageService,
    TemplateName::StorageEndpoint,
    TemplateName::StorageCapacity,
];

const COMPUTE_TEMPLATES: &[TemplateName] = &[
    TemplateName::ComputeService,
    TemplateName::ComputeEndpoint,
    TemplateName::ExecutionEnvironment,
    TemplateName::ApplicationEnvironment,
];

const CLOUD_TEMPLATES: &[TemplateName] = &[TemplateName::Headers, TemplateName::Domain, TemplateName::Bdii];

/// Storage service block, one block per storage endpoint, then the capacity block.
pub struct StorageRenderer<'a> {
    provider: &'a Provider,
    base: Fields,
    store: TemplateStore,
}

impl<'a> StorageRenderer<'a> {
    pub fn new<P: AsRef<Path>>(provider: &'a Provider, template_dir: P) -> Result<Self> {
        Ok(Self {
            provider,
            base: provider.fields(),
            store: TemplateStore::load(template_dir, STORAGE_TEMPLATES)?,
        })
    }
}

impl Render for StorageRenderer<'_> {
    fn render(&self) -> Result<String> {
        let mut output = vec![self.store.format(TemplateName::StorageService, &self.base, None)?];

        for endpoint in self.provider.staas_endpoints() {
            output.push(self.store.format(
                TemplateName::StorageEndpoint,
                &self.base,
                Some(&endpoint.fields()),
            )?);
        }

        output.push(self.store.format(TemplateName::StorageCapacity, &self.base, None)?);

        tracing::debug!(
            "Rendered storage service with {} endpoint(s)",
            self.provider.staas_endpoints().len()
        );
        Ok(output.join("\n"))
    }
}

/// Compute service block, then endpoints, resource templates and image templates.
pub struct ComputeRenderer<'a> {
    provider: &'a Provider,
    base: Fields,
    store: TemplateStore,
}

impl<'a> ComputeRenderer<'a> {
    pub fn new<P: AsRef<Path>>(provider: &'a Provider, template_dir: P) -> Result<Self> {
        Ok(Self {
            provider,
            base: provider.fields(),
            store: TemplateStore::load(template_dir, COMPUTE_TEMPLATES)?,
        })
    }
}

impl Render for ComputeRenderer<'_> {
    fn render(&self) -> Result<String> {
        let mut output = vec![self.store.format(TemplateName::ComputeService, &self.base, None)?];

        for endpoint in self.provider.iaas_endpoints() {
            output.push(self.store.format(
                TemplateName::ComputeEndpoint,
                &self.base,
                Some(&endpoint.fields()),
            )?);
        }

        for resource in &self.provider.resource_tpl {
            output.push(self.store.format(
                TemplateName::ExecutionEnvironment,
                &self.base,
                Some(&resource.fields()),
            )?);
        }

        for image in &self.provider.os_tpl {
            output.push(self.store.format(
                TemplateName::ApplicationEnvironment,
                &self.base,
                Some(&image.fields()),
            )?);
        }

        tracing::debug!(
            "Rendered compute service with {} endpoint(s), {} resource template(s), {} image(s)",
            self.provider.iaas_endpoints().len(),
            self.provider.resource_tpl.len(),
            self.provider.os_tpl.len()
        );
        Ok(output.join("\n"))
    }
}

/// The whole LDIF document: headers, domain and site BDII, then each configured service.
pub struct CloudBdii<'a> {
    base: Fields,
    store: TemplateStore,
    services: Vec<Box<dyn Render + 'a>>,
}

impl<'a> CloudBdii<'a> {
    pub fn new<P: AsRef<Path>>(provider: &'a Provider, template_dir: P) -> Result<Self> {
        let template_dir = template_dir.as_ref();
        let mut services: Vec<Box<dyn Render + 'a>> = Vec::new();

        if !provider.iaas_endpoints().is_empty() {
            services.push(Box::new(ComputeRenderer::new(provider, template_dir)?));
        }

        if !provider.staas_endpoints().is_empty() {
            services.push(Box::new(StorageRenderer::new(provider, template_dir)?));
        }

        let store = TemplateStore::load(template_dir, CLOUD_TEMPLATES)?;
        tracing::debug!(
            "Loaded templates from {} for {} service(s)",
            store.dir().display(),
            services.len()
        );

        Ok(Self {
            base: provider.fields(),
            store,
            services,
        })
    }
}

impl Render for CloudBdii<'_> {
    fn render(&self) -> Result<String> {
        let mut output = Vec::with_capacity(CLOUD_TEMPLATES.len() + self.services.len());
        for name in CLOUD_TEMPLATES {
            output.push(self.store.format(*name, &self.base, None)?);
        }
        for service in &self.services {
            output.push(service.render()?);
        }
        Ok(output.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ComputeService, Endpoint, Interface, Middleware, ResourceTemplate, Site};
    use tempfile::TempDir;

    fn provider() -> Provider {
        let middleware = Middleware {
            name: "OpenStack Nova".to_string(),
            version: "havana".to_string(),
            developer: "OpenStack".to_string(),
        };
        Provider {
            site: Site {
                site_name: "TEST-SITE".to_string(),
                www: "http://example.org/".to_string(),
                country: "IT".to_string(),
                site_longitude: 16.88,
                site_latitude: 41.11,
                affiliated_ngi: "NGI_IT".to_string(),
                user_support_contact: "support@example.org".to_string(),
                general_contact: "support@example.org".to_string(),
                sysadmin_contact: "support@example.org".to_string(),
                security_contact: "support@example.org".to_string(),
                production_level: "production".to_string(),
                site_bdii_host: "bdii.example.org".to_string(),
                site_bdii_port: 2170,
                site_total_cpu_cores: 300,
                site_total_ram_gb: 600,
                site_total_storage_gb: 51200,
            },
            compute: Some(ComputeService {
                endpoints: vec![Endpoint::new("https://nova.example.org:8787", &Interface::occi(), &middleware)],
                middleware,
                hypervisor: "KVM".to_string(),
                hypervisor_version: "1.5.0".to_string(),
                capabilities: vec!["cloud.managementSystem".to_string()],
            }),
            storage: None,
            os_tpl: vec![],
            resource_tpl: vec![ResourceTemplate {
                occi_id: "resource#small".to_string(),
                memory: 1024,
                cpu: 1,
                platform: "amd64".to_string(),
                network: "public".to_string(),
            }],
        }
    }

    fn write_templates(dir: &Path, names: &[TemplateName]) {
        for name in names {
            std::fs::write(dir.join(name.file_name()), format!("[{}]", name)).unwrap();
        }
    }

    #[test]
    fn test_compute_renderer_block_order() {
        let dir = TempDir::new().unwrap();
        write_templates(dir.path(), COMPUTE_TEMPLATES);
        let provider = provider();

        let out = ComputeRenderer::new(&provider, dir.path()).unwrap().render().unwrap();
        assert_eq!(
            out,
            "[compute_service]\n[compute_endpoint]\n[execution_environment]"
        );
    }

    #[test]
    fn test_storage_renderer_is_skipped_without_endpoints() {
        let dir = TempDir::new().unwrap();
        // Storage templates are absent: loading them would fail.
        write_templates(dir.path(), CLOUD_TEMPLATES);
        write_templates(dir.path(), COMPUTE_TEMPLATES);
        let provider = provider();

        let out = CloudBdii::new(&provider, dir.path()).unwrap().render().unwrap();
        assert!(out.starts_with("[headers]\n[domain]\n[bdii]\n[compute_service]"));
        assert!(!out.contains("storage"));
    }
}
