//! Typed per-component configuration.
//!
//! `[components.options]` is parsed into exactly one variant of
//! [`ComponentOptions`] chosen by the component's `type`. Unknown keys are
//! rejected; missing keys take defaults derived from the component name.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use stackforge_utils::error::ConfigError;
use stackforge_utils::types::ComponentType;

use crate::model::RawComponent;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));
static JAVA_PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$").expect("valid regex"));
static BUNDLE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*(\.[A-Za-z0-9-]+)+$").expect("valid regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("valid regex"));

pub const MIN_ANDROID_SDK: u32 = 21;
pub const MAX_ANDROID_SDK: u32 = 35;

/// Immutable description of one component for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpec {
    pub name: String,
    pub component_type: ComponentType,
    pub enabled: bool,
    pub options: ComponentOptions,
    /// Per-invocation timeout for the bootstrap tool
    pub timeout: Duration,
}

impl ComponentSpec {
    /// Spec with default options for `component_type`.
    #[must_use]
    pub fn new(component_type: ComponentType, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            options: ComponentOptions::defaults_for(component_type, &name),
            name,
            component_type,
            enabled: true,
            timeout: Duration::from_secs(crate::model::DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ComponentOptions) -> Self {
        self.options = options;
        self
    }

    /// Check name format, option/type agreement and option formats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.name)?;
        if self.options.component_type() != self.component_type {
            return Err(ConfigError::InvalidValue {
                key: "options".to_string(),
                value: format!(
                    "{} options given for a {} component",
                    self.options.component_type(),
                    self.component_type
                ),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                value: "must be at least 1 second".to_string(),
            });
        }
        self.options.validate()
    }
}

impl fmt::Display for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.component_type)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ConfigError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: "name".to_string(),
            value: format!("'{name}' must be non-empty and use only letters, digits, '-' or '_'"),
        })
    }
}

/// Name reduced to a lowercase identifier usable in package and bundle ids.
fn identifier_from(name: &str) -> String {
    let ident: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match ident.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => ident,
        Some(_) => format!("app{ident}"),
        None => "app".to_string(),
    }
}

/// Package manager used by `create-next-app`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Bun => "bun",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextjsOptions {
    pub typescript: bool,
    pub tailwind: bool,
    pub app_router: bool,
    pub package_manager: PackageManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoBackendOptions {
    pub module_path: String,
    pub go_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AndroidOptions {
    pub package_name: String,
    pub min_sdk: u32,
    pub kotlin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IosOptions {
    pub bundle_id: String,
    pub deployment_target: String,
}

/// Options for one component, one variant per component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ComponentOptions {
    Nextjs(NextjsOptions),
    GoBackend(GoBackendOptions),
    Android(AndroidOptions),
    Ios(IosOptions),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NextjsFile {
    typescript: Option<bool>,
    tailwind: Option<bool>,
    app_router: Option<bool>,
    package_manager: Option<PackageManager>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GoBackendFile {
    module_path: Option<String>,
    go_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AndroidFile {
    package_name: Option<String>,
    min_sdk: Option<u32>,
    kotlin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IosFile {
    bundle_id: Option<String>,
    deployment_target: Option<String>,
}

fn parse_table<T: for<'de> Deserialize<'de>>(
    name: &str,
    table: &toml::Table,
) -> Result<T, ConfigError> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidValue {
            key: format!("components.{name}.options"),
            value: e.message().to_string(),
        })
}

impl ComponentOptions {
    /// Defaults for `component_type`, derived from the component name.
    #[must_use]
    pub fn defaults_for(component_type: ComponentType, name: &str) -> Self {
        let ident = identifier_from(name);
        match component_type {
            ComponentType::Nextjs => Self::Nextjs(NextjsOptions {
                typescript: true,
                tailwind: true,
                app_router: true,
                package_manager: PackageManager::Npm,
            }),
            ComponentType::GoBackend => Self::GoBackend(GoBackendOptions {
                module_path: format!("example.com/{}", name.to_ascii_lowercase()),
                go_version: "1.22".to_string(),
            }),
            ComponentType::Android => Self::Android(AndroidOptions {
                package_name: format!("com.example.{ident}"),
                min_sdk: 24,
                kotlin: true,
            }),
            ComponentType::Ios => Self::Ios(IosOptions {
                bundle_id: format!("com.example.{ident}"),
                deployment_target: "16.0".to_string(),
            }),
        }
    }

    /// Parse an options table for `component_type`, filling defaults.
    pub fn from_table(
        component_type: ComponentType,
        name: &str,
        table: &toml::Table,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::defaults_for(component_type, name);
        let options = match defaults {
            Self::Nextjs(d) => {
                let f: NextjsFile = parse_table(name, table)?;
                Self::Nextjs(NextjsOptions {
                    typescript: f.typescript.unwrap_or(d.typescript),
                    tailwind: f.tailwind.unwrap_or(d.tailwind),
                    app_router: f.app_router.unwrap_or(d.app_router),
                    package_manager: f.package_manager.unwrap_or(d.package_manager),
                })
            }
            Self::GoBackend(d) => {
                let f: GoBackendFile = parse_table(name, table)?;
                Self::GoBackend(GoBackendOptions {
                    module_path: f.module_path.unwrap_or(d.module_path),
                    go_version: f.go_version.unwrap_or(d.go_version),
                })
            }
            Self::Android(d) => {
                let f: AndroidFile = parse_table(name, table)?;
                Self::Android(AndroidOptions {
                    package_name: f.package_name.unwrap_or(d.package_name),
                    min_sdk: f.min_sdk.unwrap_or(d.min_sdk),
                    kotlin: f.kotlin.unwrap_or(d.kotlin),
                })
            }
            Self::Ios(d) => {
                let f: IosFile = parse_table(name, table)?;
                Self::Ios(IosOptions {
                    bundle_id: f.bundle_id.unwrap_or(d.bundle_id),
                    deployment_target: f.deployment_target.unwrap_or(d.deployment_target),
                })
            }
        };
        Ok(options)
    }

    #[must_use]
    pub const fn component_type(&self) -> ComponentType {
        match self {
            Self::Nextjs(_) => ComponentType::Nextjs,
            Self::GoBackend(_) => ComponentType::GoBackend,
            Self::Android(_) => ComponentType::Android,
            Self::Ios(_) => ComponentType::Ios,
        }
    }

    /// Check option formats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Nextjs(_) => Ok(()),
            Self::GoBackend(o) => {
                if o.module_path.trim().is_empty() || o.module_path.contains(char::is_whitespace)
                {
                    return Err(invalid("module_path", &o.module_path));
                }
                if !VERSION_RE.is_match(&o.go_version) {
                    return Err(invalid("go_version", &o.go_version));
                }
                Ok(())
            }
            Self::Android(o) => {
                if !JAVA_PACKAGE_RE.is_match(&o.package_name) {
                    return Err(invalid("package_name", &o.package_name));
                }
                if !(MIN_ANDROID_SDK..=MAX_ANDROID_SDK).contains(&o.min_sdk) {
                    return Err(ConfigError::InvalidValue {
                        key: "min_sdk".to_string(),
                        value: format!(
                            "{} (must be between {MIN_ANDROID_SDK} and {MAX_ANDROID_SDK})",
                            o.min_sdk
                        ),
                    });
                }
                Ok(())
            }
            Self::Ios(o) => {
                if !BUNDLE_ID_RE.is_match(&o.bundle_id) {
                    return Err(invalid("bundle_id", &o.bundle_id));
                }
                if !VERSION_RE.is_match(&o.deployment_target) {
                    return Err(invalid("deployment_target", &o.deployment_target));
                }
                Ok(())
            }
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: if value.is_empty() {
            "<empty>".to_string()
        } else {
            value.to_string()
        },
    }
}

impl RawComponent {
    /// Validate and convert into a typed spec.
    ///
    /// `default_timeout` applies when the entry has no `timeout_secs`.
    pub fn into_spec(&self, default_timeout: Duration) -> Result<ComponentSpec, ConfigError> {
        validate_name(&self.name)?;
        let component_type = self.component_type.parse::<ComponentType>().map_err(|_| {
            ConfigError::UnknownComponentType {
                name: self.name.clone(),
                value: self.component_type.clone(),
            }
        })?;
        let options = ComponentOptions::from_table(component_type, &self.name, &self.options)?;
        let timeout = self
            .timeout_secs
            .map_or(default_timeout, Duration::from_secs);

        let spec = ComponentSpec {
            name: self.name.clone(),
            component_type,
            enabled: self.enabled,
            options,
            timeout,
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ty: &str, name: &str, options: &str) -> RawComponent {
        let mut raw = RawComponent::new(ty, name);
        raw.options = toml::from_str(options).unwrap();
        raw
    }

    const TIMEOUT: Duration = Duration::from_secs(300);

    #[test]
    fn test_defaults_derive_from_name() {
        let spec = raw("android", "My-App", "").into_spec(TIMEOUT).unwrap();
        match spec.options {
            ComponentOptions::Android(o) => {
                assert_eq!(o.package_name, "com.example.myapp");
                assert_eq!(o.min_sdk, 24);
            }
            other => panic!("unexpected options: {other:?}"),
        }
    }

    #[test]
    fn test_file_values_override_defaults() {
        let spec = raw(
            "go-backend",
            "api",
            "module_path = \"github.com/acme/api\"\ngo_version = \"1.23\"",
        )
        .into_spec(TIMEOUT)
        .unwrap();
        assert_eq!(
            spec.options,
            ComponentOptions::GoBackend(GoBackendOptions {
                module_path: "github.com/acme/api".to_string(),
                go_version: "1.23".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_option_key_rejected() {
        let err = raw("nextjs", "web", "typescrypt = true")
            .into_spec(TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "components.web.options"));
    }

    #[test]
    fn test_options_of_wrong_shape_rejected() {
        // bundle_id is an iOS key, not valid for android
        assert!(
            raw("android", "mobile", "bundle_id = \"com.example.App\"")
                .into_spec(TIMEOUT)
                .is_err()
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = raw("rails", "api", "").into_spec(TIMEOUT).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownComponentType {
                name: "api".to_string(),
                value: "rails".to_string(),
            }
        );
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("web_app-2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("has space").is_err());
    }

    #[test]
    fn test_min_sdk_range() {
        assert!(raw("android", "m", "min_sdk = 20").into_spec(TIMEOUT).is_err());
        assert!(raw("android", "m", "min_sdk = 21").into_spec(TIMEOUT).is_ok());
        assert!(raw("android", "m", "min_sdk = 35").into_spec(TIMEOUT).is_ok());
        assert!(raw("android", "m", "min_sdk = 36").into_spec(TIMEOUT).is_err());
    }

    #[test]
    fn test_java_package_and_bundle_id_formats() {
        assert!(
            raw("android", "m", "package_name = \"Com.Example\"")
                .into_spec(TIMEOUT)
                .is_err()
        );
        assert!(raw("ios", "i", "bundle_id = \"noDots\"").into_spec(TIMEOUT).is_err());
        assert!(
            raw("ios", "i", "bundle_id = \"com.example.My-App\"")
                .into_spec(TIMEOUT)
                .is_ok()
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut component = raw("nextjs", "web", "");
        component.timeout_secs = Some(0);
        assert!(component.into_spec(TIMEOUT).is_err());
        component.timeout_secs = Some(1);
        assert_eq!(component.into_spec(TIMEOUT).unwrap().timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_mismatched_options_fail_validation() {
        let spec = ComponentSpec::new(ComponentType::Nextjs, "web")
            .with_options(ComponentOptions::defaults_for(ComponentType::Ios, "web"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_identifier_from_numeric_name() {
        assert_eq!(identifier_from("123"), "app123");
        assert_eq!(identifier_from("--"), "app");
    }
}
