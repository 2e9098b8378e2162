#![forbid(unsafe_code)]

//! Runtime configuration as data.
//!
//! ```toml
//! # lokal.toml
//! culture = "de-AT"
//! design_mode = false
//! fallback_behavior = "key"
//! include_invariant_culture = true
//! sweep_threshold = 64
//! ```
//!
//! ```rust,ignore
//! let config = LocalizeConfig::from_toml_file("lokal.toml")?;
//! let ctx = CultureContext::from_config(&config)?;
//! ```
//!
//! Defaults match the built-in behavior: `LocalizeConfig::default()` yields
//! a context identical to `CultureContext::new()`.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use lokal_core::{Culture, CultureError};

use crate::fallback::FallbackBehavior;
use crate::lifetime::DEFAULT_SWEEP_THRESHOLD;

/// Environment variable overriding the detected process culture.
pub const CULTURE_ENV_VAR: &str = "LOKAL_CULTURE";

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct LocalizeConfig {
    /// Initial culture; `None` detects it from the environment.
    pub culture: Option<String>,
    /// Run with design-time leniency.
    pub design_mode: bool,
    /// Fallback for bindings that do not set their own.
    pub fallback_behavior: FallbackBehavior,
    /// Report the invariant culture among available cultures.
    pub include_invariant_culture: bool,
    /// Insertions between opportunistic lifetime sweeps; 0 disables.
    pub sweep_threshold: usize,
}

impl Default for LocalizeConfig {
    fn default() -> Self {
        Self {
            culture: None,
            design_mode: false,
            fallback_behavior: FallbackBehavior::Default,
            include_invariant_culture: true,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
        }
    }
}

impl LocalizeConfig {
    /// Load and validate a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load and validate a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Validate all fields. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(culture) = &self.culture {
            if let Err(err) = Culture::parse(culture) {
                errors.push(format!("culture: {err}"));
            }
        }
        errors
    }

    /// `self` if [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// The configured culture, or the process culture.
    ///
    /// `LOKAL_CULTURE` takes precedence over the POSIX locale variables.
    pub fn initial_culture(&self) -> Result<Culture, ConfigError> {
        match &self.culture {
            Some(name) => Culture::parse(name).map_err(ConfigError::Culture),
            None => Ok(detect_culture()),
        }
    }
}

/// Process culture from `LOKAL_CULTURE`, then the POSIX locale variables.
#[must_use]
pub fn detect_culture() -> Culture {
    std::env::var(CULTURE_ENV_VAR)
        .ok()
        .and_then(|value| Culture::parse(&value).ok())
        .unwrap_or_else(Culture::from_env)
}

/// Configuration and fail-fast setup errors.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[cfg(feature = "config")]
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// A configured culture name does not parse.
    Culture(CultureError),
    /// A binding's forced culture does not parse (outside design mode).
    InvalidForcedCulture { value: String, source: CultureError },
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "config")]
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Culture(e) => write!(f, "{e}"),
            Self::InvalidForcedCulture { value, source } => {
                write!(f, "forced culture '{value}' is invalid: {source}")
            }
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "config")]
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Culture(e) => Some(e),
            Self::InvalidForcedCulture { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}
