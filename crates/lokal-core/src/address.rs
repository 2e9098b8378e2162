#![forbid(unsafe_code)]

//! Key addressing: `[[Assembly:]Dictionary:]Key`.
//!
//! A [`KeyAddress`] names one localizable resource. Segments omitted from
//! the key string are `None`, meaning "take the default from the ambient
//! context", and are filled in by [`KeyAddress::resolve_defaults`].
//!
//! # Format
//!
//! | Segments | Meaning |
//! |----------|---------|
//! | 1 | `Key` |
//! | 2 | `Dictionary:Key` |
//! | 3 | `Assembly:Dictionary:Key` |
//!
//! The delimiter is a single `:`. Empty optional segments collapse to
//! `None`, never to the empty string.
//!
//! # Invariants
//!
//! 1. `key` is never empty after a successful parse.
//! 2. `KeyAddress::parse(&addr.to_string()) == Ok(addr)` for every parsed
//!    address (the `Display` form is canonical).

use std::fmt;

/// Delimiter between key segments.
pub const SEGMENT_DELIMITER: char = ':';

/// Errors from key-string parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty after trimming.
    Empty,
    /// Input split into a segment count other than 1, 2, or 3.
    SegmentCount(usize),
    /// The key segment itself was empty (`"Dict:"`).
    EmptyKey,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty key string"),
            Self::SegmentCount(n) => {
                write!(f, "key string has {n} segments, expected 1 to 3")
            }
            Self::EmptyKey => write!(f, "key segment is empty"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Which optional segment an ambient default is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Assembly,
    Dictionary,
}

/// A parsed `{assembly, dictionary, key}` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyAddress {
    assembly: Option<String>,
    dictionary: Option<String>,
    key: String,
}

impl KeyAddress {
    /// Parse a key string.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let segments: Vec<&str> = trimmed.split(SEGMENT_DELIMITER).map(str::trim).collect();
        let (assembly, dictionary, key) = match segments.as_slice() {
            [key] => (None, None, *key),
            [dictionary, key] => (None, non_empty(dictionary), *key),
            [assembly, dictionary, key] => (non_empty(assembly), non_empty(dictionary), *key),
            other => return Err(ParseError::SegmentCount(other.len())),
        };

        if key.is_empty() {
            return Err(ParseError::EmptyKey);
        }

        Ok(Self {
            assembly,
            dictionary,
            key: key.to_string(),
        })
    }

    /// Build an address from parts. `key` must be non-empty.
    pub fn from_parts(
        assembly: Option<&str>,
        dictionary: Option<&str>,
        key: &str,
    ) -> Result<Self, ParseError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::EmptyKey);
        }
        if key.contains(SEGMENT_DELIMITER) {
            return Err(ParseError::SegmentCount(key.split(SEGMENT_DELIMITER).count()));
        }
        Ok(Self {
            assembly: assembly.and_then(|a| non_empty(a.trim())),
            dictionary: dictionary.and_then(|d| non_empty(d.trim())),
            key: key.to_string(),
        })
    }

    /// Assembly segment, if explicitly given.
    #[must_use]
    pub fn assembly(&self) -> Option<&str> {
        self.assembly.as_deref()
    }

    /// Dictionary segment, if explicitly given.
    #[must_use]
    pub fn dictionary(&self) -> Option<&str> {
        self.dictionary.as_deref()
    }

    /// Key segment.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the assembly segment.
    #[must_use]
    pub fn with_assembly(mut self, assembly: Option<&str>) -> Self {
        self.assembly = assembly.and_then(|a| non_empty(a.trim()));
        self
    }

    /// Replace the dictionary segment.
    #[must_use]
    pub fn with_dictionary(mut self, dictionary: Option<&str>) -> Self {
        self.dictionary = dictionary.and_then(|d| non_empty(d.trim()));
        self
    }

    /// Fill `None` segments from the ambient context.
    ///
    /// `ambient` is queried once per unset segment; an empty string counts
    /// as "no default". Segments that stay unresolved are passed through as
    /// `None` for the provider to interpret.
    #[must_use]
    pub fn resolve_defaults(
        &self,
        ambient: impl Fn(SegmentKind) -> Option<String>,
    ) -> ResolvedAddress {
        let lookup = |explicit: &Option<String>, kind| {
            explicit
                .clone()
                .or_else(|| ambient(kind).filter(|value| !value.is_empty()))
        };
        ResolvedAddress {
            assembly: lookup(&self.assembly, SegmentKind::Assembly),
            dictionary: lookup(&self.dictionary, SegmentKind::Dictionary),
            key: self.key.clone(),
        }
    }

    /// Resolve without any ambient context.
    #[must_use]
    pub fn unresolved(&self) -> ResolvedAddress {
        self.resolve_defaults(|_| None)
    }
}

impl fmt::Display for KeyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEGMENT_DELIMITER}{}{SEGMENT_DELIMITER}{}",
            self.assembly.as_deref().unwrap_or_default(),
            self.dictionary.as_deref().unwrap_or_default(),
            self.key
        )
    }
}

impl std::str::FromStr for KeyAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A [`KeyAddress`] after ambient defaulting; what providers receive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    pub assembly: Option<String>,
    pub dictionary: Option<String>,
    pub key: String,
}

impl ResolvedAddress {
    /// Construct directly (mostly for tests and one-shot lookups).
    #[must_use]
    pub fn new(assembly: Option<&str>, dictionary: Option<&str>, key: impl Into<String>) -> Self {
        Self {
            assembly: assembly.map(str::to_string),
            dictionary: dictionary.map(str::to_string),
            key: key.into(),
        }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.assembly.as_deref().unwrap_or("<default>"),
            self.dictionary.as_deref().unwrap_or("<default>"),
            self.key
        )
    }
}

fn non_empty(segment: &str) -> Option<String> {
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}
