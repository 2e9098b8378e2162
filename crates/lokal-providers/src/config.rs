#![forbid(unsafe_code)]

//! Provider configuration as data.
//!
//! ```toml
//! [delimited]
//! directory = "resources"
//! base_name = "Strings"
//! extension = "csv"
//! has_header = true
//!
//! [embedded]
//! default_assembly = "App"
//! ignore_case = false
//! ```
//!
//! Every field has a default matching the providers' built-in behavior, so
//! `ProvidersConfig::default()` changes nothing.

use std::path::PathBuf;
#[cfg(feature = "provider-config")]
use std::path::Path;

#[cfg(feature = "provider-config")]
use serde::{Deserialize, Serialize};

use crate::table::DEFAULT_DELIMITER;

/// Configuration for both built-in providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "provider-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "provider-config", serde(default))]
pub struct ProvidersConfig {
    pub delimited: DelimitedTextConfig,
    pub embedded: EmbeddedConfig,
}

/// Settings for [`crate::DelimitedTextProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "provider-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "provider-config", serde(default))]
pub struct DelimitedTextConfig {
    /// Directory holding the resource files.
    pub directory: PathBuf,
    /// File base name used when the address has no dictionary.
    pub base_name: String,
    /// File extension without the dot.
    pub extension: String,
    /// Skip the first line of every file.
    pub has_header: bool,
    /// Field separator.
    pub delimiter: char,
}

impl Default for DelimitedTextConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            base_name: "Resources".into(),
            extension: "csv".into(),
            has_header: false,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Settings for [`crate::EmbeddedResourceProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "provider-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "provider-config", serde(default))]
pub struct EmbeddedConfig {
    /// Assembly used when neither the key nor the ambient context names one.
    pub default_assembly: Option<String>,
    /// Dictionary used when neither the key nor the ambient context names one.
    pub default_dictionary: String,
    /// Compare keys case-insensitively.
    pub ignore_case: bool,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            default_assembly: None,
            default_dictionary: "Resources".into(),
            ignore_case: false,
        }
    }
}

impl ProvidersConfig {
    /// Load from a TOML string.
    #[cfg(feature = "provider-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ProviderConfigError> {
        let config: Self = toml::from_str(s).map_err(ProviderConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "provider-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ProviderConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ProviderConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "provider-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ProviderConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ProviderConfigError::Json)?;
        config.validated()
    }

    /// Validate all fields. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.delimited.base_name.trim().is_empty() {
            errors.push("delimited.base_name must not be empty".into());
        }
        if self.delimited.extension.trim().is_empty() || self.delimited.extension.contains('.') {
            errors.push(format!(
                "delimited.extension must be a bare extension, got '{}'",
                self.delimited.extension
            ));
        }
        if self.delimited.delimiter.is_whitespace() {
            errors.push("delimited.delimiter must not be whitespace".into());
        }
        if self.embedded.default_dictionary.trim().is_empty() {
            errors.push("embedded.default_dictionary must not be empty".into());
        }
        errors
    }

    #[cfg(feature = "provider-config")]
    fn validated(self) -> Result<Self, ProviderConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ProviderConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading provider configuration.
#[derive(Debug)]
pub enum ProviderConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "provider-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "provider-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ProviderConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "provider-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "provider-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ProviderConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "provider-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "provider-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ProvidersConfig::default().validate().is_empty());
    }

    #[test]
    fn validation_catches_bad_fields() {
        let mut config = ProvidersConfig::default();
        config.delimited.extension = ".csv".into();
        config.delimited.base_name = " ".into();
        config.embedded.default_dictionary.clear();
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[cfg(feature = "provider-config")]
    #[test]
    fn toml_round_trip_with_partial_sections() {
        let config = ProvidersConfig::from_toml_str(
            r#"
            [delimited]
            directory = "res"
            has_header = true

            [embedded]
            default_assembly = "App"
            "#,
        )
        .unwrap();
        assert_eq!(config.delimited.directory, PathBuf::from("res"));
        assert!(config.delimited.has_header);
        assert_eq!(config.delimited.extension, "csv");
        assert_eq!(config.embedded.default_assembly.as_deref(), Some("App"));
        assert_eq!(config.embedded.default_dictionary, "Resources");
    }

    #[cfg(feature = "provider-config")]
    #[test]
    fn invalid_json_config_is_rejected() {
        let err = ProvidersConfig::from_json_str(r#"{"delimited": {"extension": ""}}"#)
            .unwrap_err();
        assert!(matches!(err, ProviderConfigError::Validation(_)));
    }
}
