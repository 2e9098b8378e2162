#![forbid(unsafe_code)]

//! What a binding shows when its key cannot be resolved.
//!
//! Resolution order on a miss:
//!
//! 1. Missing-key handlers registered on the context run in order. The
//!    first one that supplies a value wins outright.
//! 2. If a handler asked for `reload`, the provider is queried once more
//!    (the handler may have registered the resource).
//! 3. Otherwise the binding's [`FallbackBehavior`] produces the value.

use lokal_core::{Culture, ResourceValue};

/// Fallback text for an unresolved key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum FallbackBehavior {
    /// `"Key: {key}"`, visibly marking the gap.
    #[default]
    Default,
    /// The bare key.
    Key,
    /// An empty string.
    EmptyString,
}

impl FallbackBehavior {
    /// Fallback value for `key`.
    #[must_use]
    pub fn value_for(self, key: &str) -> ResourceValue {
        match self {
            Self::Default => ResourceValue::Text(format!("Key: {key}")),
            Self::Key => ResourceValue::Text(key.to_string()),
            Self::EmptyString => ResourceValue::Text(String::new()),
        }
    }
}

/// Arguments passed to missing-key handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKeyArgs {
    /// The key as written at the binding site.
    pub key: String,
    /// Culture the lookup was made for.
    pub culture: Culture,
    /// Set to supply the value to display.
    pub result: Option<ResourceValue>,
    /// Set to ask for one more provider lookup before falling back.
    pub reload: bool,
}

impl MissingKeyArgs {
    #[must_use]
    pub fn new(key: impl Into<String>, culture: Culture) -> Self {
        Self {
            key: key.into(),
            culture,
            result: None,
            reload: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_texts() {
        assert_eq!(
            FallbackBehavior::Default.value_for("abacaba"),
            ResourceValue::from("Key: abacaba")
        );
        assert_eq!(
            FallbackBehavior::Key.value_for("abacaba"),
            ResourceValue::from("abacaba")
        );
        assert_eq!(
            FallbackBehavior::EmptyString.value_for("abacaba"),
            ResourceValue::from("")
        );
    }
}
