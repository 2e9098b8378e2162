#![forbid(unsafe_code)]

//! Resolved resource values.

use std::fmt;
use std::sync::Arc;

/// A value produced by a provider and pushed into target properties.
///
/// Text is the common case. Binary payloads (images, serialized blobs) are
/// carried opaquely; converting them is left to the consuming toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceValue {
    Text(String),
    Binary(Arc<[u8]>),
}

impl ResourceValue {
    /// Borrow the text payload, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    /// Borrow the binary payload, if this is binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Binary(b) => Some(b),
        }
    }
}

impl fmt::Display for ResourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for ResourceValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ResourceValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for ResourceValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value.into())
    }
}
