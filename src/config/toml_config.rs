use crate::domain::model::{
    ComputeService, Endpoint, ImageTemplate, Interface, Middleware, Provider, ResourceTemplate, Site,
    StorageService,
};
use crate::utils::error::{BdiiError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Static site description, as written by the site administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub site: Site,
    #[serde(default)]
    pub interface: InterfaceConfig,
    pub compute: Option<ComputeConfig>,
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub os_tpl: Vec<ImageTemplate>,
    #[serde(default)]
    pub resource_tpl: Vec<ResourceTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default = "Interface::occi")]
    pub compute: Interface,
    #[serde(default = "Interface::cdmi")]
    pub storage: Interface,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            compute: Interface::occi(),
            storage: Interface::cdmi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    pub middleware: String,
    pub middleware_version: String,
    pub middleware_developer: String,
    pub hypervisor: String,
    pub hypervisor_version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub middleware: String,
    pub middleware_version: String,
    pub middleware_developer: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
}

impl SiteConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| BdiiError::ConfigValidationError {
            field: "config".to_string(),
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Checks ranges, URLs and that every published value fits on one LDIF line.
    pub fn validate_config(&self) -> Result<()> {
        let site = &self.site;
        for (field, value) in [
            ("site.site_name", &site.site_name),
            ("site.country", &site.country),
            ("site.affiliated_ngi", &site.affiliated_ngi),
            ("site.user_support_contact", &site.user_support_contact),
            ("site.general_contact", &site.general_contact),
            ("site.sysadmin_contact", &site.sysadmin_contact),
            ("site.security_contact", &site.security_contact),
            ("site.production_level", &site.production_level),
            ("site.site_bdii_host", &site.site_bdii_host),
        ] {
            validation::validate_attribute_value(field, value)?;
        }
        validation::validate_endpoint_url("site.www", &site.www)?;
        validation::validate_range("site.site_latitude", site.site_latitude, -90.0, 90.0)?;
        validation::validate_range("site.site_longitude", site.site_longitude, -180.0, 180.0)?;
        validation::validate_at_least("site.site_bdii_port", u64::from(site.site_bdii_port), 1)?;

        validate_interface("interface.compute", &self.interface.compute)?;
        validate_interface("interface.storage", &self.interface.storage)?;

        if let Some(compute) = &self.compute {
            validation::validate_attribute_value("compute.middleware", &compute.middleware)?;
            validation::validate_attribute_value("compute.middleware_version", &compute.middleware_version)?;
            validation::validate_attribute_value("compute.middleware_developer", &compute.middleware_developer)?;
            validation::validate_attribute_value("compute.hypervisor", &compute.hypervisor)?;
            validation::validate_attribute_value("compute.hypervisor_version", &compute.hypervisor_version)?;
            for capability in &compute.capabilities {
                validation::validate_attribute_value("compute.capabilities", capability)?;
            }
            for endpoint in &compute.endpoints {
                validation::validate_endpoint_url("compute.endpoints.url", &endpoint.url)?;
            }
        }
        if let Some(storage) = &self.storage {
            validation::validate_attribute_value("storage.middleware", &storage.middleware)?;
            validation::validate_attribute_value("storage.middleware_version", &storage.middleware_version)?;
            validation::validate_attribute_value("storage.middleware_developer", &storage.middleware_developer)?;
            for capability in &storage.capabilities {
                validation::validate_attribute_value("storage.capabilities", capability)?;
            }
            for endpoint in &storage.endpoints {
                validation::validate_endpoint_url("storage.endpoints.url", &endpoint.url)?;
            }
        }

        for image in &self.os_tpl {
            for (field, value) in [
                ("os_tpl.image_name", &image.image_name),
                ("os_tpl.image_version", &image.image_version),
                ("os_tpl.marketplace_id", &image.marketplace_id),
                ("os_tpl.occi_id", &image.occi_id),
                ("os_tpl.os_family", &image.os_family),
                ("os_tpl.os_name", &image.os_name),
                ("os_tpl.os_version", &image.os_version),
                ("os_tpl.platform", &image.platform),
            ] {
                validation::validate_attribute_value(field, value)?;
            }
            if let Some(description) = &image.image_description {
                validation::validate_attribute_value("os_tpl.image_description", description)?;
            }
        }
        for resource in &self.resource_tpl {
            validation::validate_attribute_value("resource_tpl.occi_id", &resource.occi_id)?;
            validation::validate_attribute_value("resource_tpl.platform", &resource.platform)?;
            validation::validate_attribute_value("resource_tpl.network", &resource.network)?;
            validation::validate_at_least("resource_tpl.memory", resource.memory, 1)?;
            validation::validate_at_least("resource_tpl.cpu", u64::from(resource.cpu), 1)?;
        }

        if self.compute.is_none() && self.storage.is_none() {
            return Err(BdiiError::ConfigValidationError {
                field: "compute/storage".to_string(),
                message: "at least one service section must be configured".to_string(),
            });
        }

        Ok(())
    }

    /// Builds the provider record, expanding endpoint URLs with interface and middleware metadata.
    pub fn to_provider(&self) -> Provider {
        let compute = self.compute.as_ref().map(|c| {
            let middleware = Middleware {
                name: c.middleware.clone(),
                version: c.middleware_version.clone(),
                developer: c.middleware_developer.clone(),
            };
            ComputeService {
                endpoints: c
                    .endpoints
                    .iter()
                    .map(|e| Endpoint::new(e.url.clone(), &self.interface.compute, &middleware))
                    .collect(),
                middleware,
                hypervisor: c.hypervisor.clone(),
                hypervisor_version: c.hypervisor_version.clone(),
                capabilities: c.capabilities.clone(),
            }
        });

        let storage = self.storage.as_ref().map(|s| {
            let middleware = Middleware {
                name: s.middleware.clone(),
                version: s.middleware_version.clone(),
                developer: s.middleware_developer.clone(),
            };
            StorageService {
                endpoints: s
                    .endpoints
                    .iter()
                    .map(|e| Endpoint::new(e.url.clone(), &self.interface.storage, &middleware))
                    .collect(),
                middleware,
                capabilities: s.capabilities.clone(),
            }
        });

        Provider {
            site: self.site.clone(),
            compute,
            storage,
            os_tpl: self.os_tpl.clone(),
            resource_tpl: self.resource_tpl.clone(),
        }
    }
}

fn validate_interface(prefix: &str, interface: &Interface) -> Result<()> {
    validation::validate_attribute_value(&format!("{}.api", prefix), &interface.api)?;
    validation::validate_attribute_value(&format!("{}.api_version", prefix), &interface.api_version)?;
    validation::validate_attribute_value(
        &format!("{}.endpoint_technology", prefix),
        &interface.endpoint_technology,
    )?;
    validation::validate_attribute_value(
        &format!("{}.authorization_method", prefix),
        &interface.authorization_method,
    )
}

impl Validate for SiteConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SITE: &str = r#"
[site]
site_name = "TEST-SITE"
www = "http://cloud.example.org/"
country = "IT"
site_longitude = 16.88
site_latitude = 41.11
affiliated_ngi = "NGI_IT"
user_support_contact = "support@example.org"
general_contact = "support@example.org"
sysadmin_contact = "support@example.org"
security_contact = "support@example.org"
production_level = "production"
site_bdii_host = "bdii.example.org"
site_bdii_port = 2170
site_total_cpu_cores = 300
site_total_ram_gb = 600
site_total_storage_gb = 51200
"#;

    fn with_sections(extra: &str) -> String {
        format!("{}{}", SITE, extra)
    }

    #[test]
    fn test_parse_site_with_compute_endpoints() {
        let content = with_sections(
            r#"
[compute]
middleware = "OpenStack Nova"
middleware_version = "havana"
middleware_developer = "OpenStack"
hypervisor = "KVM"
hypervisor_version = "1.5.0"
capabilities = ["cloud.managementSystem", "cloud.vm.uploadImage"]

[[compute.endpoints]]
url = "https://nova.example.org:8787"

[[resource_tpl]]
occi_id = "resource#small"
memory = 1024
cpu = 1
platform = "amd64"
network = "public"
"#,
        );

        let config = SiteConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_ok());

        let provider = config.to_provider();
        assert_eq!(provider.iaas_endpoints().len(), 1);
        assert!(provider.staas_endpoints().is_empty());
        let endpoint = &provider.iaas_endpoints()[0];
        assert_eq!(endpoint.endpoint_interface, "OCCI");
        assert_eq!(endpoint.service_type_name, "OpenStack Nova");
        assert_eq!(provider.resource_tpl[0].memory, 1024);
    }

    #[test]
    fn test_interface_override() {
        let content = with_sections(
            r#"
[interface.storage]
api = "S3"
api_version = "2006-03-01"
endpoint_technology = "REST"
authorization_method = "OAuth2"

[storage]
middleware = "Ceph RGW"
middleware_version = "17"
middleware_developer = "Ceph"

[[storage.endpoints]]
url = "https://s3.example.org"
"#,
        );

        let provider = SiteConfig::from_toml_str(&content).unwrap().to_provider();
        let endpoint = &provider.staas_endpoints()[0];
        assert_eq!(endpoint.endpoint_interface, "S3");
        assert_eq!(endpoint.auth_method, "OAuth2");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CLOUD_BDII_TEST_NOVA_URL", "https://nova.env.example.org");

        let content = with_sections(
            r#"
[compute]
middleware = "OpenStack Nova"
middleware_version = "havana"
middleware_developer = "OpenStack"
hypervisor = "KVM"
hypervisor_version = "1.5.0"

[[compute.endpoints]]
url = "${CLOUD_BDII_TEST_NOVA_URL}"
"#,
        );

        let config = SiteConfig::from_toml_str(&content).unwrap();
        assert_eq!(
            config.compute.unwrap().endpoints[0].url,
            "https://nova.env.example.org"
        );

        std::env::remove_var("CLOUD_BDII_TEST_NOVA_URL");
    }

    #[test]
    fn test_config_validation() {
        let content = with_sections(
            r#"
[storage]
middleware = "OpenStack Swift"
middleware_version = "havana"
middleware_developer = "OpenStack"

[[storage.endpoints]]
url = "swift.example.org:8080"
"#,
        );
        let config = SiteConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let no_services = SiteConfig::from_toml_str(SITE).unwrap();
        assert!(matches!(
            no_services.validate(),
            Err(BdiiError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = with_sections(
            r#"
[storage]
middleware = "OpenStack Swift"
middleware_version = "havana"
middleware_developer = "OpenStack"
"#,
        );
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = SiteConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.site.site_name, "TEST-SITE");
        assert!(config.to_provider().staas_endpoints().is_empty());
    }

    #[test]
    fn test_line_break_in_site_value_is_rejected() {
        let content = with_sections(
            r#"
[storage]
middleware = "OpenStack Swift"
middleware_version = "havana"
middleware_developer = "OpenStack"
"#,
        )
        .replace(r#"site_name = "TEST-SITE""#, r#"site_name = "TEST-SITE\nobjectClass: GLUE2Injected""#);

        let config = SiteConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.site.site_name, "TEST-SITE\nobjectClass: GLUE2Injected");
        assert!(matches!(
            config.validate(),
            Err(BdiiError::InvalidConfigValueError { ref field, .. }) if field == "site.site_name"
        ));
    }

    #[test]
    fn test_capabilities_are_checked_one_by_one() {
        let content = with_sections(
            r#"
[compute]
middleware = "OpenStack Nova"
middleware_version = "havana"
middleware_developer = "OpenStack"
hypervisor = "KVM"
hypervisor_version = "1.5.0"
capabilities = ["cloud.managementSystem", "cloud.vm.uploadImage\r\nGLUE2ServiceCapability: forged"]
"#,
        );
        let config = SiteConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(BdiiError::InvalidConfigValueError { ref field, .. }) if field == "compute.capabilities"
        ));

        let empty = with_sections(
            r#"
[compute]
middleware = "OpenStack Nova"
middleware_version = "havana"
middleware_developer = "OpenStack"
hypervisor = "KVM"
hypervisor_version = "1.5.0"
capabilities = []
"#,
        );
        assert!(SiteConfig::from_toml_str(&empty).unwrap().validate().is_ok());
    }
}
