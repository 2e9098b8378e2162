#![forbid(unsafe_code)]

//! lokal public facade crate.
//!
//! Re-exports the stable surface of the internal crates and offers a
//! prelude for day-to-day usage. Applications normally depend on this crate
//! only.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use lokal_core::{
    Culture, CultureError, CultureSet, KeyAddress, LookupRequest, ParseError, ProviderError,
    ProviderEvent, ResolvedAddress, ResourceProvider, ResourceValue, SegmentKind,
};

// --- Runtime re-exports ----------------------------------------------------

pub use lokal_runtime::{
    ConfigError, CultureContext, CultureListener, FallbackBehavior, LocBinding, LocalizeConfig,
    LocalizedTarget, MissingKeyArgs, PropertyError, PropertyToken, ReflectedProperty,
    TargetProperty,
};

// --- Provider re-exports ---------------------------------------------------

#[cfg(feature = "providers")]
pub use lokal_providers::{
    DelimitedTextConfig, DelimitedTextProvider, EmbeddedConfig, EmbeddedResourceProvider,
    ProviderConfigError, ProvidersConfig,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for lokal applications.
#[derive(Debug)]
pub enum Error {
    /// A key string did not parse.
    Parse(ParseError),
    /// A culture name did not parse.
    Culture(CultureError),
    /// Runtime configuration is invalid.
    Config(ConfigError),
    /// A value could not be written into a target property.
    Property(PropertyError),
    /// Provider configuration is invalid.
    #[cfg(feature = "providers")]
    ProviderConfig(ProviderConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid key: {err}"),
            Self::Culture(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Property(err) => write!(f, "{err}"),
            #[cfg(feature = "providers")]
            Self::ProviderConfig(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Culture(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Property(err) => Some(err),
            #[cfg(feature = "providers")]
            Self::ProviderConfig(err) => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<CultureError> for Error {
    fn from(err: CultureError) -> Self {
        Self::Culture(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<PropertyError> for Error {
    fn from(err: PropertyError) -> Self {
        Self::Property(err)
    }
}

#[cfg(feature = "providers")]
impl From<ProviderConfigError> for Error {
    fn from(err: ProviderConfigError) -> Self {
        Self::ProviderConfig(err)
    }
}

/// Standard result type for lokal APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Bind `key` in `ctx` to `property` on `target` and return the binding.
///
/// Shorthand for [`LocBinding::new`] followed by [`LocBinding::bind`].
pub fn bind(
    ctx: &CultureContext,
    key: &str,
    target: &std::rc::Rc<dyn LocalizedTarget>,
    property: impl Into<TargetProperty>,
) -> Result<LocBinding> {
    let binding = LocBinding::new(ctx, key)?;
    binding.bind(target, property);
    Ok(binding)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Culture, CultureContext, Error, FallbackBehavior, LocBinding, LocalizedTarget,
        PropertyError, PropertyToken, ResourceProvider, ResourceValue, Result, TargetProperty,
    };

    #[cfg(feature = "providers")]
    pub use crate::{DelimitedTextProvider, EmbeddedResourceProvider};

    pub use crate::{core, runtime};
}

pub use lokal_core as core;
#[cfg(feature = "providers")]
pub use lokal_providers as providers;
pub use lokal_runtime as runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_convert_and_chain() {
        let err: Error = KeyAddress::parse("").unwrap_err().into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("invalid key"));

        let err: Error = Culture::parse("??").unwrap_err().into();
        assert!(matches!(err, Error::Culture(_)));
    }

    #[test]
    fn bind_helper_rejects_bad_keys() {
        let ctx = CultureContext::new();
        struct Nothing;
        impl LocalizedTarget for Nothing {
            fn set_native(&self, _: &PropertyToken, _: &ResourceValue) -> std::result::Result<(), PropertyError> {
                Ok(())
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
        let target: std::rc::Rc<dyn LocalizedTarget> = std::rc::Rc::new(Nothing);
        assert!(matches!(
            bind(&ctx, "a:b:c:d", &target, TargetProperty::native("Text")),
            Err(Error::Parse(_))
        ));
        assert!(bind(&ctx, "Title", &target, TargetProperty::native("Text")).is_ok());
    }
}
