//! OpenStack catalog source: Keystone v2.0 authentication, then Nova
//! image and flavor listings.

use crate::domain::model::{ImageTemplate, ResourceTemplate};
use crate::domain::ports::MiddlewareProvider;
use crate::utils::error::{BdiiError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use reqwest::{Certificate, Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;

const MIDDLEWARE_NAME: &str = "openstack";
const DEFAULT_IMAGE_VERSION: &str = "1.0";
const DEFAULT_PLATFORM: &str = "amd64";
const DEFAULT_NETWORK: &str = "public";

/// Command line options contributed by the OpenStack adapter.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
#[cfg_attr(feature = "cli", command(next_help_heading = "OpenStack provider options"))]
pub struct OpenStackOptions {
    /// Keystone user name
    #[cfg_attr(feature = "cli", arg(long, env = "OS_USERNAME"))]
    pub os_username: Option<String>,

    /// Keystone password
    #[cfg_attr(feature = "cli", arg(long, env = "OS_PASSWORD", hide_env_values = true))]
    pub os_password: Option<String>,

    /// Tenant to list images and flavors for
    #[cfg_attr(feature = "cli", arg(long, env = "OS_TENANT_NAME"))]
    pub os_tenant_name: Option<String>,

    /// Keystone v2.0 endpoint, e.g. https://keystone.example.org:5000/v2.0
    #[cfg_attr(feature = "cli", arg(long, env = "OS_AUTH_URL"))]
    pub os_auth_url: Option<String>,

    /// Region to pick the compute endpoint from
    #[cfg_attr(feature = "cli", arg(long, env = "OS_REGION_NAME"))]
    pub os_region_name: Option<String>,

    /// PEM bundle used to verify the API certificates
    #[cfg_attr(feature = "cli", arg(long, env = "OS_CACERT"))]
    pub os_cacert: Option<String>,

    /// Skip TLS certificate verification
    #[cfg_attr(feature = "cli", arg(long))]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[cfg_attr(feature = "cli", arg(long))]
    pub os_timeout: Option<u64>,
}

impl Validate for OpenStackOptions {
    fn validate(&self) -> Result<()> {
        validation::require("os_username", &self.os_username)?;
        validation::require("os_password", &self.os_password)?;
        validation::require("os_tenant_name", &self.os_tenant_name)?;
        let auth_url = validation::require("os_auth_url", &self.os_auth_url)?;
        validation::validate_endpoint_url("os_auth_url", auth_url)?;
        if let Some(timeout) = self.os_timeout {
            validation::validate_at_least("os_timeout", timeout, 1)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthBody<'a> {
    #[serde(rename = "tenantName")]
    tenant_name: &'a str,
    #[serde(rename = "passwordCredentials")]
    password_credentials: PasswordCredentials<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(rename = "publicURL")]
    public_url: String,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageList {
    images: Vec<NovaImage>,
}

#[derive(Debug, Deserialize)]
struct NovaImage {
    id: String,
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct FlavorList {
    flavors: Vec<NovaFlavor>,
}

#[derive(Debug, Deserialize)]
struct NovaFlavor {
    name: String,
    ram: u64,
    vcpus: u32,
}

#[derive(Debug)]
struct Session {
    token: String,
    compute_url: String,
}

pub struct OpenStackProvider {
    options: OpenStackOptions,
    client: Client,
    session: OnceCell<Session>,
}

impl OpenStackProvider {
    pub fn new(options: OpenStackOptions) -> Result<Self> {
        options.validate()?;

        let mut builder = Client::builder();
        if options.insecure {
            tracing::warn!("TLS certificate verification disabled for OpenStack requests");
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(cacert) = &options.os_cacert {
            let pem = std::fs::read(cacert)?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }
        if let Some(timeout) = options.os_timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            options,
            client: builder.build()?,
            session: OnceCell::new(),
        })
    }

    /// Authenticates on first use; later calls reuse the token.
    async fn session(&self) -> Result<&Session> {
        self.session.get_or_try_init(|| self.authenticate()).await
    }

    async fn authenticate(&self) -> Result<Session> {
        let auth_url = validation::require("os_auth_url", &self.options.os_auth_url)?;
        let request = TokenRequest {
            auth: AuthBody {
                tenant_name: validation::require("os_tenant_name", &self.options.os_tenant_name)?,
                password_credentials: PasswordCredentials {
                    username: validation::require("os_username", &self.options.os_username)?,
                    password: validation::require("os_password", &self.options.os_password)?,
                },
            },
        };

        let url = format!("{}/tokens", auth_url.trim_end_matches('/'));
        tracing::debug!("Requesting Keystone token from {}", url);
        let response = check_status(self.client.post(&url).json(&request).send().await?, "authentication").await?;
        let token: TokenResponse = response.json().await?;

        let compute_url = self.compute_url(&token.access.service_catalog)?;
        tracing::debug!("Using compute endpoint {}", compute_url);

        Ok(Session {
            token: token.access.token.id,
            compute_url,
        })
    }

    fn compute_url(&self, catalog: &[CatalogEntry]) -> Result<String> {
        let region = self.options.os_region_name.as_deref();
        catalog
            .iter()
            .filter(|entry| entry.service_type == "compute")
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| region.is_none() || endpoint.region.as_deref() == region)
            .map(|endpoint| endpoint.public_url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                BdiiError::middleware(
                    MIDDLEWARE_NAME,
                    match region {
                        Some(region) => format!("no compute endpoint for region '{}' in the service catalog", region),
                        None => "no compute endpoint in the service catalog".to_string(),
                    },
                )
            })
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let session = self.session().await?;
        let url = format!("{}{}", session.compute_url, path);
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &session.token)
            .header("Accept", "application/json")
            .send()
            .await?;
        check_status(response, path).await
    }
}

#[async_trait]
impl MiddlewareProvider for OpenStackProvider {
    fn name(&self) -> &str {
        MIDDLEWARE_NAME
    }

    async fn images(&self) -> Result<Vec<ImageTemplate>> {
        let list: ImageList = self.get("/images/detail").await?.json().await?;
        let total = list.images.len();
        let images: Vec<ImageTemplate> = list
            .images
            .into_iter()
            .filter(|image| image.status.eq_ignore_ascii_case("active"))
            .map(image_template)
            .filter(|image| publishable(&image.occi_id, &image_values(image)))
            .collect();
        tracing::debug!("{} of {} images are active", images.len(), total);
        Ok(images)
    }

    async fn flavors(&self) -> Result<Vec<ResourceTemplate>> {
        let list: FlavorList = self.get("/flavors/detail").await?.json().await?;
        Ok(list
            .flavors
            .into_iter()
            .map(resource_template)
            .filter(|flavor| publishable(&flavor.occi_id, &[flavor.occi_id.as_str()]))
            .collect())
    }
}

async fn check_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BdiiError::middleware(
        MIDDLEWARE_NAME,
        format!("{} failed with HTTP {}: {}", operation, status, body.trim()),
    ))
}

fn image_values(image: &ImageTemplate) -> Vec<&str> {
    let mut values = vec![
        image.image_name.as_str(),
        image.image_version.as_str(),
        image.marketplace_id.as_str(),
        image.occi_id.as_str(),
        image.os_family.as_str(),
        image.os_name.as_str(),
        image.os_version.as_str(),
        image.platform.as_str(),
    ];
    values.extend(image.image_description.as_deref());
    values
}

/// Tenant-controlled names and metadata must not break the LDIF line structure.
fn publishable(id: &str, values: &[&str]) -> bool {
    if values.iter().any(|value| validation::has_control_chars(value)) {
        tracing::warn!("Skipping {}: a name or metadata value contains a line break", id.escape_debug());
        return false;
    }
    true
}

fn metadata<'a>(image: &'a NovaImage, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| image.metadata.get(*key))
        .filter_map(|value| value.as_str())
        .find(|value| !value.is_empty())
}

fn normalize_platform(architecture: &str) -> String {
    match architecture {
        "x86_64" | "amd64" => "amd64".to_string(),
        "i386" | "i686" | "x86" => "i386".to_string(),
        other => other.to_string(),
    }
}

fn image_template(image: NovaImage) -> ImageTemplate {
    let marketplace_id = metadata(&image, &["vmcatcher_event_ad_mpuri", "marketplace_id"])
        .map(str::to_string)
        .or_else(|| {
            image
                .links
                .iter()
                .find(|link| link.rel == "self")
                .map(|link| link.href.clone())
        })
        .unwrap_or_else(|| image.id.clone());

    ImageTemplate {
        image_version: metadata(&image, &["vmcatcher_event_hv_version", "image_version"])
            .unwrap_or(DEFAULT_IMAGE_VERSION)
            .to_string(),
        marketplace_id,
        occi_id: format!("os#{}", image.id),
        os_family: metadata(&image, &["os_type"]).unwrap_or("linux").to_string(),
        os_name: metadata(&image, &["os_distro"]).unwrap_or("unknown").to_string(),
        os_version: metadata(&image, &["os_version"]).unwrap_or("unknown").to_string(),
        platform: metadata(&image, &["architecture"])
            .map(normalize_platform)
            .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
        image_description: metadata(&image, &["description"]).map(str::to_string),
        image_name: image.name,
    }
}

fn resource_template(flavor: NovaFlavor) -> ResourceTemplate {
    ResourceTemplate {
        occi_id: format!("resource#{}", flavor.name),
        memory: flavor.ram,
        cpu: flavor.vcpus,
        platform: DEFAULT_PLATFORM.to_string(),
        network: DEFAULT_NETWORK.to_string(),
    }
}
