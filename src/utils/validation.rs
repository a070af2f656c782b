use crate::utils::error::{BdiiError, Result};
use std::fmt::Display;
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl Display, reason: impl Into<String>) -> BdiiError {
    BdiiError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// True when `value` would break out of its LDIF attribute line.
pub fn has_control_chars(value: &str) -> bool {
    value.chars().any(char::is_control)
}

/// A value published as (part of) one LDIF attribute: non-blank, one line.
pub fn validate_attribute_value(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "value cannot be empty or whitespace-only"));
    }
    if has_control_chars(value) {
        return Err(invalid(
            field_name,
            value.escape_debug(),
            "line breaks and control characters are not allowed in LDIF attribute values",
        ));
    }
    Ok(())
}

/// Published endpoint or homepage: absolute http(s) URL with a host.
pub fn validate_endpoint_url(field_name: &str, url_str: &str) -> Result<()> {
    validate_attribute_value(field_name, url_str)?;

    let url = Url::parse(url_str).map_err(|e| invalid(field_name, url_str, format!("invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(invalid(field_name, url_str, format!("unsupported URL scheme: {}", scheme))),
    }
    if url.host_str().is_none() {
        return Err(invalid(field_name, url_str, "URL has no host"));
    }
    Ok(())
}

pub fn validate_config_file(field_name: &str, path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(invalid(field_name, path.display(), "file does not exist"));
    }
    if !path.is_file() {
        return Err(invalid(field_name, path.display(), "not a regular file"));
    }
    Ok(())
}

pub fn validate_template_dir(field_name: &str, path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(invalid(field_name, path.display(), "directory does not exist"));
    }
    if !path.is_dir() {
        return Err(invalid(field_name, path.display(), "not a directory"));
    }
    Ok(())
}

pub fn validate_at_least(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(field_name, value, format!("value must be at least {}", min_value)));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display>(field_name: &str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field_name, &value, format!("value must be between {} and {}", min, max)));
    }
    Ok(())
}

pub fn require<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| BdiiError::MissingConfigError {
        field: field_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_attribute_value_rejects_line_breaks() {
        assert!(validate_attribute_value("site.site_name", "PRISMA-INFN-BARI").is_ok());
        assert!(validate_attribute_value("site.site_name", "  ").is_err());

        let err = validate_attribute_value("site.site_name", "BARI\nobjectClass: GLUE2Injected").unwrap_err();
        match err {
            BdiiError::InvalidConfigValueError { field, value, .. } => {
                assert_eq!(field, "site.site_name");
                assert_eq!(value, "BARI\\nobjectClass: GLUE2Injected");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate_attribute_value("site.country", "IT\r").is_err());
        assert!(validate_attribute_value("site.country", "I\0T").is_err());
    }

    #[test]
    fn test_endpoint_url() {
        assert!(validate_endpoint_url("compute.endpoints.url", "https://cloud.example.org:8787").is_ok());
        assert!(validate_endpoint_url("compute.endpoints.url", "http://cloud.example.org/").is_ok());
        assert!(validate_endpoint_url("compute.endpoints.url", "").is_err());
        assert!(validate_endpoint_url("compute.endpoints.url", "ftp://cloud.example.org").is_err());
        assert!(validate_endpoint_url("compute.endpoints.url", "cloud.example.org").is_err());
        assert!(validate_endpoint_url("compute.endpoints.url", "https://cloud.example.org/\nx").is_err());
    }

    #[test]
    fn test_config_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("site.toml");
        std::fs::write(&file, "").unwrap();

        assert!(validate_config_file("config", &file).is_ok());
        assert!(validate_config_file("config", &dir.path().join("absent.toml")).is_err());
        assert!(validate_config_file("config", dir.path()).is_err());
    }

    #[test]
    fn test_template_dir_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("headers.ldif");
        std::fs::write(&file, "").unwrap();

        assert!(validate_template_dir("template_dir", dir.path()).is_ok());
        assert!(validate_template_dir("template_dir", &file).is_err());
        assert!(validate_template_dir("template_dir", &dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("site.site_latitude", 41.11, -90.0, 90.0).is_ok());
        assert!(validate_range("site.site_latitude", 91.0, -90.0, 90.0).is_err());
        assert!(validate_at_least("site.site_bdii_port", 0, 1).is_err());
    }

    #[test]
    fn test_require() {
        let value = Some("bdii".to_string());
        assert_eq!(require("os_username", &value).unwrap(), "bdii");

        let missing: Option<String> = None;
        assert!(matches!(
            require("os_username", &missing),
            Err(BdiiError::MissingConfigError { ref field }) if field == "os_username"
        ));
    }
}
