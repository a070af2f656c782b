use crate::domain::model::{FieldValue, Fields};
use crate::utils::error::{BdiiError, Result};
use crate::utils::validation;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Every LDIF template the generator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    Headers,
    Domain,
    Bdii,
    ComputeService,
    ComputeEndpoint,
    ExecutionEnvironment,
    ApplicationEnvironment,
    StorageService,
    StorageEndpoint,
    StorageCapacity,
}

impl TemplateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Headers => "headers",
            Self::Domain => "domain",
            Self::Bdii => "bdii",
            Self::ComputeService => "compute_service",
            Self::ComputeEndpoint => "compute_endpoint",
            Self::ExecutionEnvironment => "execution_environment",
            Self::ApplicationEnvironment => "application_environment",
            Self::StorageService => "storage_service",
            Self::StorageEndpoint => "storage_endpoint",
            Self::StorageCapacity => "storage_capacity",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.ldif", self.as_str())
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw template text keyed by name, read once from a template directory.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    templates: HashMap<TemplateName, String>,
}

impl TemplateStore {
    /// Reads `<dir>/<name>.ldif` for each requested template.
    pub fn load<P: AsRef<Path>>(dir: P, names: &[TemplateName]) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut templates = HashMap::with_capacity(names.len());

        for name in names {
            let path = dir.join(name.file_name());
            let text = std::fs::read_to_string(&path).map_err(|source| BdiiError::TemplateNotFound {
                name: name.to_string(),
                path: path.display().to_string(),
                source,
            })?;
            tracing::debug!("Loaded template {} from {}", name, path.display());
            templates.insert(*name, text);
        }

        Ok(Self { dir, templates })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Substitutes `{{field}}` placeholders from `base` overlaid with `extra`.
    ///
    /// A line holding a multi-valued field is emitted once per value, and not
    /// at all for an empty list. Values must fit on one attribute line.
    pub fn format(&self, name: TemplateName, base: &Fields, extra: Option<&Fields>) -> Result<String> {
        let text = self
            .templates
            .get(&name)
            .ok_or_else(|| BdiiError::TemplateNotLoaded {
                name: name.to_string(),
            })?;

        let mut rendered = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            render_line(name, line, base, extra, &mut rendered)?;
        }
        Ok(rendered)
    }
}

fn lookup<'a>(base: &'a Fields, extra: Option<&'a Fields>, field: &str) -> Option<&'a FieldValue> {
    extra.and_then(|e| e.get(field)).or_else(|| base.get(field))
}

fn check_value(template: TemplateName, field: &str, value: &str) -> Result<()> {
    if validation::has_control_chars(value) {
        return Err(BdiiError::InvalidFieldValue {
            template: template.to_string(),
            field: field.to_string(),
            reason: format!("value '{}' contains a line break or control character", value.escape_debug()),
        });
    }
    Ok(())
}

fn render_line(
    template: TemplateName,
    line: &str,
    base: &Fields,
    extra: Option<&Fields>,
    out: &mut String,
) -> Result<()> {
    let mut repeated: Option<(&str, &[String])> = None;

    for caps in PLACEHOLDER.captures_iter(line) {
        let field = caps.get(1).map_or("", |m| m.as_str());
        let value = lookup(base, extra, field).ok_or_else(|| BdiiError::MissingTemplateField {
            template: template.to_string(),
            field: field.to_string(),
        })?;

        match value {
            FieldValue::Single(value) => check_value(template, field, value)?,
            FieldValue::Multi(values) => {
                for value in values {
                    check_value(template, field, value)?;
                }
                if let Some((other, _)) = repeated.filter(|(other, _)| *other != field) {
                    return Err(BdiiError::InvalidFieldValue {
                        template: template.to_string(),
                        field: field.to_string(),
                        reason: format!("shares a line with multi-valued field '{}'", other),
                    });
                }
                repeated = Some((field, values.as_slice()));
            }
        }
    }

    match repeated {
        None => out.push_str(&substitute(line, base, extra, None)),
        Some((field, values)) => {
            for value in values {
                out.push_str(&substitute(line, base, extra, Some((field, value))));
            }
        }
    }
    Ok(())
}

fn substitute(line: &str, base: &Fields, extra: Option<&Fields>, current: Option<(&str, &str)>) -> String {
    PLACEHOLDER
        .replace_all(line, |caps: &Captures| match current {
            Some((field, value)) if field == &caps[1] => value.to_string(),
            _ => lookup(base, extra, &caps[1])
                .and_then(FieldValue::as_single)
                .unwrap_or_default()
                .to_string(),
        })
        .into_owned()
}
