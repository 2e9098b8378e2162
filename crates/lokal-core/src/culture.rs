#![forbid(unsafe_code)]

//! Culture identifiers with a parent fallback chain.
//!
//! A [`Culture`] is a normalized BCP-47-like tag (`de-AT`, `zh-Hant-TW`) or
//! the invariant culture (empty name). Every culture has a parent obtained
//! by dropping its last subtag; the chain always terminates at the invariant
//! culture.
//!
//! # Invariants
//!
//! 1. **Normalized**: language is lowercase, script is title-case, region is
//!    uppercase. `Culture::parse("DE_at")` and `Culture::parse("de-AT")` are
//!    equal.
//! 2. **Chain terminates**: `fallback_chain()` yields `self` first and the
//!    invariant culture last, each culture exactly once.
//! 3. **Invariant is its own parent**.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Bad language | Not 2–3 ASCII letters | `CultureError::InvalidLanguage` |
//! | Bad subtag | Empty, too long, or non-alphanumeric | `CultureError::InvalidSubtag` |
//! | Unusable env | `C`, `POSIX`, or junk in `LANG` | `from_env()` yields invariant |

use std::collections::BTreeSet;
use std::fmt;

/// Errors from culture parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CultureError {
    /// The leading language subtag is not 2–3 ASCII letters.
    InvalidLanguage(String),
    /// A non-leading subtag is empty, longer than 8 chars, or not alphanumeric.
    InvalidSubtag { tag: String, subtag: String },
}

impl fmt::Display for CultureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLanguage(tag) => write!(f, "invalid culture '{tag}': bad language subtag"),
            Self::InvalidSubtag { tag, subtag } => {
                write!(f, "invalid culture '{tag}': bad subtag '{subtag}'")
            }
        }
    }
}

impl std::error::Error for CultureError {}

/// A culture (locale) identifier.
///
/// Cheap to clone; compared and ordered by normalized name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Culture {
    name: String,
}

impl Culture {
    /// The invariant (root) culture.
    #[must_use]
    pub fn invariant() -> Self {
        Self {
            name: String::new(),
        }
    }

    /// Parse and normalize a culture tag.
    ///
    /// Accepts `-` or `_` as separator. The empty string (after trimming)
    /// is the invariant culture.
    pub fn parse(raw: &str) -> Result<Self, CultureError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::invariant());
        }

        let mut parts = trimmed.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        if !(2..=3).contains(&language.len()) || !language.bytes().all(|b| b.is_ascii_alphabetic())
        {
            return Err(CultureError::InvalidLanguage(trimmed.to_string()));
        }

        let mut name = language.to_ascii_lowercase();
        for subtag in parts {
            if subtag.is_empty()
                || subtag.len() > 8
                || !subtag.bytes().all(|b| b.is_ascii_alphanumeric())
            {
                return Err(CultureError::InvalidSubtag {
                    tag: trimmed.to_string(),
                    subtag: subtag.to_string(),
                });
            }
            name.push('-');
            name.push_str(&normalize_subtag(subtag));
        }

        Ok(Self { name })
    }

    /// Detect the process culture from `LC_ALL`, `LC_MESSAGES`, then `LANG`.
    ///
    /// POSIX forms such as `de_AT.UTF-8@euro` are accepted. `C`, `POSIX`, or
    /// anything unparseable yields the invariant culture.
    #[must_use]
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .map(|value| Self::from_posix(&value))
            .unwrap_or_else(Self::invariant)
    }

    /// Parse a POSIX locale string (`ll_CC.codeset@modifier`).
    #[must_use]
    pub fn from_posix(value: &str) -> Self {
        let base = value
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();
        if base.eq_ignore_ascii_case("c") || base.eq_ignore_ascii_case("posix") {
            return Self::invariant();
        }
        Self::parse(base).unwrap_or_else(|_| Self::invariant())
    }

    /// Normalized tag; empty for the invariant culture.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the invariant culture.
    #[must_use]
    pub fn is_invariant(&self) -> bool {
        self.name.is_empty()
    }

    /// Whether this is a language-only culture (`de`, not `de-AT`).
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        !self.is_invariant() && !self.name.contains('-')
    }

    /// Language subtag, or `None` for the invariant culture.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        if self.is_invariant() {
            None
        } else {
            self.name.split('-').next()
        }
    }

    /// Parent culture: `de-AT` ⇒ `de` ⇒ invariant ⇒ invariant.
    #[must_use]
    pub fn parent(&self) -> Self {
        match self.name.rfind('-') {
            Some(idx) => Self {
                name: self.name[..idx].to_string(),
            },
            None => Self::invariant(),
        }
    }

    /// Iterate from this culture down to the invariant culture, inclusive.
    pub fn fallback_chain(&self) -> FallbackChain {
        FallbackChain {
            next: Some(self.clone()),
        }
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invariant() {
            f.write_str("(invariant)")
        } else {
            f.write_str(&self.name)
        }
    }
}

impl std::str::FromStr for Culture {
    type Err = CultureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Culture {
    type Error = CultureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Culture> for String {
    fn from(culture: Culture) -> Self {
        culture.name
    }
}

/// Iterator over a culture's fallback chain. See [`Culture::fallback_chain`].
#[derive(Debug, Clone)]
pub struct FallbackChain {
    next: Option<Culture>,
}

impl Iterator for FallbackChain {
    type Item = Culture;

    fn next(&mut self) -> Option<Culture> {
        let current = self.next.take()?;
        if !current.is_invariant() {
            self.next = Some(current.parent());
        }
        Some(current)
    }
}

fn normalize_subtag(subtag: &str) -> String {
    match subtag.len() {
        // Script: title case (Hant, Latn).
        4 if subtag.bytes().all(|b| b.is_ascii_alphabetic()) => {
            let mut out = subtag.to_ascii_lowercase();
            out[..1].make_ascii_uppercase();
            out
        }
        // Region: uppercase (AT, 419 stays numeric).
        2 | 3 => subtag.to_ascii_uppercase(),
        _ => subtag.to_ascii_lowercase(),
    }
}

/// Deduplicated set of cultures with deterministic (sorted) iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CultureSet {
    cultures: BTreeSet<Culture>,
}

impl CultureSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a culture. Returns `false` if it was already present.
    pub fn insert(&mut self, culture: Culture) -> bool {
        self.cultures.insert(culture)
    }

    /// Whether the set contains `culture`.
    #[must_use]
    pub fn contains(&self, culture: &Culture) -> bool {
        self.cultures.contains(culture)
    }

    /// Number of cultures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cultures.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cultures.is_empty()
    }

    /// Iterate in sorted order (invariant first).
    pub fn iter(&self) -> impl Iterator<Item = &Culture> {
        self.cultures.iter()
    }

    /// Merge another set into this one.
    pub fn extend_from(&mut self, other: &CultureSet) {
        self.cultures.extend(other.cultures.iter().cloned());
    }
}

impl FromIterator<Culture> for CultureSet {
    fn from_iter<I: IntoIterator<Item = Culture>>(iter: I) -> Self {
        Self {
            cultures: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CultureSet {
    type Item = &'a Culture;
    type IntoIter = std::collections::btree_set::Iter<'a, Culture>;

    fn into_iter(self) -> Self::IntoIter {
        self.cultures.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &str) -> Culture {
        Culture::parse(name).expect("valid culture")
    }

    #[test]
    fn parse_normalizes_case_and_separator() {
        assert_eq!(c("DE_at").name(), "de-AT");
        assert_eq!(c("zh-hant-tw").name(), "zh-Hant-TW");
        assert_eq!(c("es-419").name(), "es-419");
        assert_eq!(c("  en ").name(), "en");
    }

    #[test]
    fn empty_is_invariant() {
        let inv = c("");
        assert!(inv.is_invariant());
        assert_eq!(inv, Culture::invariant());
        assert_eq!(inv.to_string(), "(invariant)");
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(matches!(
            Culture::parse("x"),
            Err(CultureError::InvalidLanguage(_))
        ));
        assert!(matches!(
            Culture::parse("12-AT"),
            Err(CultureError::InvalidLanguage(_))
        ));
        assert!(matches!(
            Culture::parse("de--AT"),
            Err(CultureError::InvalidSubtag { .. })
        ));
        assert!(matches!(
            Culture::parse("de-toolongsubtag"),
            Err(CultureError::InvalidSubtag { .. })
        ));
        assert!(Culture::parse("not a culture").is_err());
    }

    #[test]
    fn parent_chain_terminates_at_invariant() {
        let chain: Vec<String> = c("de-AT")
            .fallback_chain()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(chain, vec!["de-AT", "de", ""]);
        assert_eq!(Culture::invariant().parent(), Culture::invariant());
        assert_eq!(Culture::invariant().fallback_chain().count(), 1);
    }

    #[test]
    fn long_tag_has_one_level_per_subtag() {
        let tag = "de-a-b-c-d-e-f-g-h-i-j-k-l-m-n-o-p";
        let chain: Vec<Culture> = c(tag).fallback_chain().collect();
        assert_eq!(chain.len(), tag.split('-').count() + 1);
        assert_eq!(chain[chain.len() - 2].name(), "de");
        assert!(chain[chain.len() - 1].is_invariant());
    }

    #[test]
    fn neutral_and_language() {
        assert!(c("de").is_neutral());
        assert!(!c("de-AT").is_neutral());
        assert!(!Culture::invariant().is_neutral());
        assert_eq!(c("de-AT").language(), Some("de"));
        assert_eq!(Culture::invariant().language(), None);
    }

    #[test]
    fn posix_forms() {
        assert_eq!(Culture::from_posix("de_AT.UTF-8@euro").name(), "de-AT");
        assert_eq!(Culture::from_posix("en_US.UTF-8").name(), "en-US");
        assert!(Culture::from_posix("C").is_invariant());
        assert!(Culture::from_posix("POSIX").is_invariant());
        assert!(Culture::from_posix("C.UTF-8").is_invariant());
        assert!(Culture::from_posix("???").is_invariant());
    }

    #[test]
    fn culture_set_deduplicates() {
        let mut set = CultureSet::new();
        assert!(set.insert(c("de")));
        assert!(!set.insert(c("DE")));
        assert!(set.insert(Culture::invariant()));
        assert_eq!(set.len(), 2);
        let names: Vec<&str> = set.iter().map(Culture::name).collect();
        assert_eq!(names, vec!["", "de"]);
    }
}
