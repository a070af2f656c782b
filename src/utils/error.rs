use thiserror::Error;

#[derive(Error, Debug)]
pub enum BdiiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Response decoding error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Template '{name}' could not be read from {path}: {source}")]
    TemplateNotFound {
        name: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template '{name}' was not loaded by this renderer")]
    TemplateNotLoaded { name: String },

    #[error("Template '{template}' references field '{field}' which is not defined")]
    MissingTemplateField { template: String, field: String },

    #[error("Template '{template}' cannot render field '{field}': {reason}")]
    InvalidFieldValue {
        template: String,
        field: String,
        reason: String,
    },

    #[error("Middleware '{middleware}' error: {message}")]
    MiddlewareError { middleware: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Middleware,
    Template,
    Io,
}

impl BdiiError {
    pub fn middleware(middleware: &str, message: impl Into<String>) -> Self {
        Self::MiddlewareError {
            middleware: middleware.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TomlError(_)
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Config,
            Self::HttpError(_) | Self::SerializationError(_) | Self::MiddlewareError { .. } => {
                ErrorCategory::Middleware
            }
            Self::TemplateNotFound { .. }
            | Self::TemplateNotLoaded { .. }
            | Self::MissingTemplateField { .. }
            | Self::InvalidFieldValue { .. } => ErrorCategory::Template,
            Self::IoError(_) => ErrorCategory::Io,
        }
    }

    /// Process exit code for a run aborted by this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Config | ErrorCategory::Io => 1,
            ErrorCategory::Middleware => 2,
            ErrorCategory::Template => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::TomlError(_) => "Check the site configuration file for TOML syntax errors",
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                "Fix the reported value in the site configuration or command line options"
            }
            Self::TemplateNotFound { .. } => {
                "Make sure --template-dir points at a directory containing every .ldif template"
            }
            Self::TemplateNotLoaded { .. } => "Register the template with the renderer that uses it",
            Self::MissingTemplateField { .. } => {
                "Remove the placeholder from the template or provide the field in the site data"
            }
            Self::InvalidFieldValue { .. } => {
                "Remove line breaks and control characters from the reported value"
            }
            Self::HttpError(_) | Self::MiddlewareError { .. } => {
                "Check middleware credentials and connectivity, or run without --middleware"
            }
            Self::SerializationError(_) => "The middleware API returned an unexpected payload",
            Self::IoError(_) => "Check file permissions and paths",
        }
    }
}

pub type Result<T> = std::result::Result<T, BdiiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_category() {
        let config = BdiiError::MissingConfigError {
            field: "site.site_name".to_string(),
        };
        assert_eq!(config.category(), ErrorCategory::Config);
        assert_eq!(config.exit_code(), 1);

        let middleware = BdiiError::middleware("openstack", "no compute endpoint");
        assert_eq!(middleware.category(), ErrorCategory::Middleware);
        assert_eq!(middleware.exit_code(), 2);

        let template = BdiiError::MissingTemplateField {
            template: "compute_service".to_string(),
            field: "site_name".to_string(),
        };
        assert_eq!(template.exit_code(), 3);
        assert!(template.to_string().contains("site_name"));
    }
}
