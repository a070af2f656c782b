pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, MiddlewareKind};

#[cfg(feature = "cli")]
mod cli {
    use crate::adapters::openstack::{OpenStackOptions, OpenStackProvider};
    use crate::domain::ports::MiddlewareProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::{Parser, ValueEnum};
    use std::path::Path;

    /// Middlewares that can supply a live image and flavor catalog.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    pub enum MiddlewareKind {
        #[value(name = "openstack", alias = "OpenStack")]
        OpenStack,
    }

    #[derive(Debug, Clone, Parser)]
    #[command(name = "cloud-bdii-provider")]
    #[command(about = "Publish cloud IaaS and STaaS services as GLUE2 LDIF for a BDII")]
    pub struct CliConfig {
        /// Middleware to query for images and flavors. Static values are used when omitted.
        #[arg(long, value_enum)]
        pub middleware: Option<MiddlewareKind>,

        /// Static site description (TOML)
        #[arg(long, default_value = "etc/cloud-bdii-provider.toml")]
        pub config: String,

        /// Directory holding the .ldif templates
        #[arg(long, default_value = "templates")]
        pub template_dir: String,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines on stderr")]
        pub log_json: bool,

        #[command(flatten)]
        pub openstack: OpenStackOptions,
    }

    impl CliConfig {
        /// Builds the selected middleware adapter, if any.
        pub fn middleware_provider(&self) -> Result<Option<Box<dyn MiddlewareProvider>>> {
            match self.middleware {
                None => Ok(None),
                Some(MiddlewareKind::OpenStack) => {
                    let provider = OpenStackProvider::new(self.openstack.clone())?;
                    Ok(Some(Box::new(provider)))
                }
            }
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_config_file("config", Path::new(&self.config))?;
            validation::validate_template_dir("template_dir", Path::new(&self.template_dir))?;
            match self.middleware {
                Some(MiddlewareKind::OpenStack) => self.openstack.validate(),
                None => Ok(()),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::utils::error::BdiiError;

        fn manifest_path(relative: &str) -> String {
            Path::new(env!("CARGO_MANIFEST_DIR")).join(relative).display().to_string()
        }

        fn parse(extra: &[&str]) -> CliConfig {
            let config = manifest_path("etc/cloud-bdii-provider.toml");
            let templates = manifest_path("templates");
            let mut args = vec!["cloud-bdii-provider", "--config", config.as_str(), "--template-dir", templates.as_str()];
            args.extend_from_slice(extra);
            CliConfig::try_parse_from(args).unwrap()
        }

        #[test]
        fn test_defaults_use_static_catalog() {
            let defaults = CliConfig::try_parse_from(["cloud-bdii-provider"]).unwrap();
            assert_eq!(defaults.middleware, None);
            assert_eq!(defaults.config, "etc/cloud-bdii-provider.toml");
            assert_eq!(defaults.template_dir, "templates");

            let config = parse(&[]);
            assert!(config.validate().is_ok());
            assert!(config.middleware_provider().unwrap().is_none());
        }

        #[test]
        fn test_unknown_middleware_is_rejected() {
            assert!(CliConfig::try_parse_from(["cloud-bdii-provider", "--middleware", "opennebula"]).is_err());
        }

        #[test]
        fn test_missing_paths_are_rejected() {
            let mut config = parse(&[]);
            config.config = manifest_path("etc/no-such-site.toml");
            assert!(matches!(
                config.validate(),
                Err(BdiiError::InvalidConfigValueError { ref field, .. }) if field == "config"
            ));

            let mut config = parse(&[]);
            config.template_dir = manifest_path("etc/cloud-bdii-provider.toml");
            assert!(matches!(
                config.validate(),
                Err(BdiiError::InvalidConfigValueError { ref field, .. }) if field == "template_dir"
            ));
        }

        #[test]
        fn test_openstack_requires_credentials() {
            let mut config = parse(&["--middleware", "openstack"]);
            assert_eq!(config.middleware, Some(MiddlewareKind::OpenStack));

            // Replace whatever OS_* variables the environment supplied.
            config.openstack = OpenStackOptions {
                os_auth_url: Some("https://keystone.example.org:5000/v2.0".to_string()),
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(BdiiError::MissingConfigError { ref field }) if field == "os_username"
            ));
            assert!(config.middleware_provider().is_err());

            config.middleware = None;
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_openstack_options_parse() {
            let config = parse(&[
                "--middleware",
                "OpenStack",
                "--os-username",
                "bdii",
                "--os-password",
                "secret",
                "--os-tenant-name",
                "ops",
                "--os-auth-url",
                "https://keystone.example.org:5000/v2.0",
                "--insecure",
            ]);
            assert!(config.validate().is_ok());
            assert_eq!(config.openstack.os_tenant_name.as_deref(), Some("ops"));
            assert!(config.openstack.insecure);
            assert!(config.middleware_provider().unwrap().is_some());
        }
    }
}
