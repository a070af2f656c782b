use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder name to rendered value.
pub type Fields = HashMap<String, FieldValue>;

/// Value bound to a template placeholder.
///
/// A multi-valued field repeats the template line it appears on once per
/// value, so an empty list drops the line entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Single(String),
    Multi(Vec<String>),
}

impl FieldValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            FieldValue::Single(value) => Some(value),
            FieldValue::Multi(_) => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Single(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::Multi(values)
    }
}

fn single(name: &str, value: impl Into<String>) -> (String, FieldValue) {
    (name.to_string(), FieldValue::Single(value.into()))
}

fn multi(name: &str, values: &[String]) -> (String, FieldValue) {
    (name.to_string(), FieldValue::Multi(values.to_vec()))
}

/// Records that can back an LDIF template.
pub trait TemplateFields {
    fn fields(&self) -> Fields;
}

/// API descriptor shared by every endpoint of one service family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub api: String,
    pub api_version: String,
    pub endpoint_technology: String,
    pub authorization_method: String,
}

impl Interface {
    pub fn occi() -> Self {
        Self {
            api: "OCCI".to_string(),
            api_version: "1.1".to_string(),
            endpoint_technology: "REST".to_string(),
            authorization_method: "X509-VOMS".to_string(),
        }
    }

    pub fn cdmi() -> Self {
        Self {
            api: "CDMI".to_string(),
            api_version: "1.0.1".to_string(),
            endpoint_technology: "REST".to_string(),
            authorization_method: "X509-VOMS".to_string(),
        }
    }
}

/// Name, version and developer of the software running a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Middleware {
    pub name: String,
    pub version: String,
    pub developer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub endpoint_url: String,
    pub endpoint_interface: String,
    pub service_type_name: String,
    pub service_type_version: String,
    pub service_type_developer: String,
    pub interface_version: String,
    pub endpoint_technology: String,
    pub auth_method: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, interface: &Interface, middleware: &Middleware) -> Self {
        Self {
            endpoint_url: url.into(),
            endpoint_interface: interface.api.clone(),
            service_type_name: middleware.name.clone(),
            service_type_version: middleware.version.clone(),
            service_type_developer: middleware.developer.clone(),
            interface_version: interface.api_version.clone(),
            endpoint_technology: interface.endpoint_technology.clone(),
            auth_method: interface.authorization_method.clone(),
        }
    }
}

impl TemplateFields for Endpoint {
    fn fields(&self) -> Fields {
        Fields::from([
            single("endpoint_url", self.endpoint_url.clone()),
            single("endpoint_interface", self.endpoint_interface.clone()),
            single("service_type_name", self.service_type_name.clone()),
            single("service_type_version", self.service_type_version.clone()),
            single("service_type_developer", self.service_type_developer.clone()),
            single("interface_version", self.interface_version.clone()),
            single("endpoint_technology", self.endpoint_technology.clone()),
            single("auth_method", self.auth_method.clone()),
        ])
    }
}

/// A VM image offered by the site (os_tpl).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTemplate {
    pub image_name: String,
    pub image_version: String,
    pub marketplace_id: String,
    pub occi_id: String,
    pub os_family: String,
    pub os_name: String,
    pub os_version: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_description: Option<String>,
}

impl ImageTemplate {
    /// The configured description, or one built from the image and OS fields.
    pub fn description(&self) -> String {
        match &self.image_description {
            Some(description) => description.clone(),
            None => format!(
                "{} version {} on {} {} {} {}",
                self.image_name,
                self.image_version,
                self.os_family,
                self.os_name,
                self.os_version,
                self.platform
            ),
        }
    }
}

impl TemplateFields for ImageTemplate {
    fn fields(&self) -> Fields {
        Fields::from([
            single("image_name", self.image_name.clone()),
            single("image_version", self.image_version.clone()),
            single("marketplace_id", self.marketplace_id.clone()),
            single("occi_id", self.occi_id.clone()),
            single("os_family", self.os_family.clone()),
            single("os_name", self.os_name.clone()),
            single("os_version", self.os_version.clone()),
            single("platform", self.platform.clone()),
            single("image_description", self.description()),
        ])
    }
}

/// A compute flavor offered by the site (resource_tpl).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    pub occi_id: String,
    /// Main memory in MB.
    pub memory: u64,
    pub cpu: u32,
    pub platform: String,
    pub network: String,
}

impl TemplateFields for ResourceTemplate {
    fn fields(&self) -> Fields {
        Fields::from([
            single("occi_id", self.occi_id.clone()),
            single("memory", self.memory.to_string()),
            single("cpu", self.cpu.to_string()),
            single("platform", self.platform.clone()),
            single("network", self.network.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub site_name: String,
    pub www: String,
    pub country: String,
    pub site_longitude: f64,
    pub site_latitude: f64,
    pub affiliated_ngi: String,
    pub user_support_contact: String,
    pub general_contact: String,
    pub sysadmin_contact: String,
    pub security_contact: String,
    pub production_level: String,
    pub site_bdii_host: String,
    pub site_bdii_port: u16,
    pub site_total_cpu_cores: u64,
    pub site_total_ram_gb: u64,
    pub site_total_storage_gb: u64,
}

impl TemplateFields for Site {
    fn fields(&self) -> Fields {
        Fields::from([
            single("site_name", self.site_name.clone()),
            single("www", self.www.clone()),
            single("country", self.country.clone()),
            single("site_longitude", self.site_longitude.to_string()),
            single("site_latitude", self.site_latitude.to_string()),
            single("affiliated_ngi", self.affiliated_ngi.clone()),
            single("user_support_contact", self.user_support_contact.clone()),
            single("general_contact", self.general_contact.clone()),
            single("sysadmin_contact", self.sysadmin_contact.clone()),
            single("security_contact", self.security_contact.clone()),
            single("production_level", self.production_level.clone()),
            single("site_bdii_host", self.site_bdii_host.clone()),
            single("site_bdii_port", self.site_bdii_port.to_string()),
            single("site_total_cpu_cores", self.site_total_cpu_cores.to_string()),
            single("site_total_ram_gb", self.site_total_ram_gb.to_string()),
            single("site_total_storage_gb", self.site_total_storage_gb.to_string()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeService {
    pub middleware: Middleware,
    pub hypervisor: String,
    pub hypervisor_version: String,
    pub capabilities: Vec<String>,
    pub endpoints: Vec<Endpoint>,
}

impl TemplateFields for ComputeService {
    fn fields(&self) -> Fields {
        Fields::from([
            single("iaas_middleware", self.middleware.name.clone()),
            single("iaas_middleware_version", self.middleware.version.clone()),
            single("iaas_middleware_developer", self.middleware.developer.clone()),
            single("iaas_hypervisor", self.hypervisor.clone()),
            single("iaas_hypervisor_version", self.hypervisor_version.clone()),
            multi("iaas_capabilities", &self.capabilities),
            single("iaas_endpoint_count", self.endpoints.len().to_string()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageService {
    pub middleware: Middleware,
    pub capabilities: Vec<String>,
    pub endpoints: Vec<Endpoint>,
}

impl TemplateFields for StorageService {
    fn fields(&self) -> Fields {
        Fields::from([
            single("staas_middleware", self.middleware.name.clone()),
            single("staas_middleware_version", self.middleware.version.clone()),
            single("staas_middleware_developer", self.middleware.developer.clone()),
            multi("staas_capabilities", &self.capabilities),
            single("staas_endpoint_count", self.endpoints.len().to_string()),
        ])
    }
}

/// Everything published about one site.
#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    pub site: Site,
    pub compute: Option<ComputeService>,
    pub storage: Option<StorageService>,
    pub os_tpl: Vec<ImageTemplate>,
    pub resource_tpl: Vec<ResourceTemplate>,
}

impl Provider {
    pub fn iaas_endpoints(&self) -> &[Endpoint] {
        self.compute.as_ref().map(|c| c.endpoints.as_slice()).unwrap_or(&[])
    }

    pub fn staas_endpoints(&self) -> &[Endpoint] {
        self.storage.as_ref().map(|s| s.endpoints.as_slice()).unwrap_or(&[])
    }

    /// Returns a provider whose catalogs are replaced by the live ones.
    ///
    /// Each list replaces the static one wholesale, but only when it is non-empty.
    pub fn with_live_catalog(
        &self,
        images: Vec<ImageTemplate>,
        flavors: Vec<ResourceTemplate>,
    ) -> Provider {
        let mut provider = self.clone();
        if !images.is_empty() {
            provider.os_tpl = images;
        }
        if !flavors.is_empty() {
            provider.resource_tpl = flavors;
        }
        provider
    }
}

impl TemplateFields for Provider {
    fn fields(&self) -> Fields {
        let mut fields = self.site.fields();
        if let Some(compute) = &self.compute {
            fields.extend(compute.fields());
        }
        if let Some(storage) = &self.storage {
            fields.extend(storage.fields());
        }
        fields
    }
}
