#![forbid(unsafe_code)]

//! The narrow slice of a UI property system the binding layer needs.
//!
//! A target is any object that can receive a value for a named property.
//! Properties come in two flavors, modeled as a tagged union instead of
//! runtime type inspection:
//!
//! - [`TargetProperty::Native`]: a toolkit-level property token; the target
//!   itself interprets it through [`LocalizedTarget::set_native`].
//! - [`TargetProperty::Reflected`]: a setter handle that knows how to
//!   downcast the target and assign the value directly.
//!
//! Targets also expose their logical parent and any locally declared
//! defaults so that unset key segments can be inherited from enclosing
//! scopes ([`inherited_default`]).

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use lokal_core::{ResourceValue, SegmentKind};

/// Errors from writing a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The target has no property with this name.
    UnknownProperty(String),
    /// The property exists but cannot hold this kind of value.
    TypeMismatch { property: String, expected: &'static str },
    /// A reflected setter was applied to a target of the wrong type.
    WrongTargetType { property: String },
    /// The property is read-only.
    ReadOnly(String),
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty(name) => write!(f, "unknown property '{name}'"),
            Self::TypeMismatch { property, expected } => {
                write!(f, "property '{property}' expects {expected}")
            }
            Self::WrongTargetType { property } => {
                write!(f, "setter for '{property}' applied to a foreign target type")
            }
            Self::ReadOnly(name) => write!(f, "property '{name}' is read-only"),
        }
    }
}

impl std::error::Error for PropertyError {}

/// An object that localized values can be pushed into.
///
/// All methods take `&self`; implementations use interior mutability, as
/// UI objects are shared and mutated from the owning thread.
pub trait LocalizedTarget: 'static {
    /// Assign `value` to the toolkit property identified by `token`.
    fn set_native(&self, token: &PropertyToken, value: &ResourceValue) -> Result<(), PropertyError>;

    /// Concrete object, for reflected setters.
    fn as_any(&self) -> &dyn Any;

    /// Short description used in diagnostics.
    fn debug_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("<target>")
    }

    /// Enclosing object in the logical tree.
    fn logical_parent(&self) -> Option<Rc<dyn LocalizedTarget>> {
        None
    }

    /// Default declared directly on this object for a key segment.
    fn local_default(&self, _kind: SegmentKind) -> Option<String> {
        None
    }
}

/// Walk `target` and its logical ancestors for the first non-empty default
/// of `kind`.
pub fn inherited_default(target: &dyn LocalizedTarget, kind: SegmentKind) -> Option<String> {
    if let Some(value) = target.local_default(kind).filter(|v| !v.is_empty()) {
        return Some(value);
    }
    let mut current = target.logical_parent();
    while let Some(node) = current {
        if let Some(value) = node.local_default(kind).filter(|v| !v.is_empty()) {
            return Some(value);
        }
        current = node.logical_parent();
    }
    None
}

/// Identifier of a toolkit-level property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyToken {
    name: Cow<'static, str>,
}

impl PropertyToken {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    #[must_use]
    pub fn owned(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

type Setter = dyn Fn(&dyn Any, &ResourceValue) -> Result<(), PropertyError>;

/// A property written through a setter closure instead of the target.
#[derive(Clone)]
pub struct ReflectedProperty {
    name: Rc<str>,
    setter: Rc<Setter>,
}

impl ReflectedProperty {
    /// Build from a raw setter over `&dyn Any`.
    pub fn new(
        name: &str,
        setter: impl Fn(&dyn Any, &ResourceValue) -> Result<(), PropertyError> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            setter: Rc::new(setter),
        }
    }

    /// Build a typed setter; applying it to any other target type fails
    /// with [`PropertyError::WrongTargetType`].
    pub fn typed<T: 'static>(
        name: &str,
        setter: impl Fn(&T, &ResourceValue) -> Result<(), PropertyError> + 'static,
    ) -> Self {
        let owned_name = name.to_string();
        Self::new(name, move |target, value| match target.downcast_ref::<T>() {
            Some(target) => setter(target, value),
            None => Err(PropertyError::WrongTargetType {
                property: owned_name.clone(),
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ReflectedProperty {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Rc::ptr_eq(&self.setter, &other.setter)
    }
}

impl Eq for ReflectedProperty {}

impl fmt::Debug for ReflectedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectedProperty")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The property half of a binding entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetProperty {
    Native(PropertyToken),
    Reflected(ReflectedProperty),
}

impl TargetProperty {
    /// Shorthand for a static native token.
    #[must_use]
    pub const fn native(name: &'static str) -> Self {
        Self::Native(PropertyToken::new(name))
    }

    /// Write `value` into this property on `target`.
    pub fn apply(&self, target: &dyn LocalizedTarget, value: &ResourceValue) -> Result<(), PropertyError> {
        match self {
            Self::Native(token) => target.set_native(token, value),
            Self::Reflected(handle) => (handle.setter)(target.as_any(), value),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Native(token) => token.name(),
            Self::Reflected(handle) => handle.name(),
        }
    }
}

impl From<PropertyToken> for TargetProperty {
    fn from(token: PropertyToken) -> Self {
        Self::Native(token)
    }
}

impl From<ReflectedProperty> for TargetProperty {
    fn from(handle: ReflectedProperty) -> Self {
        Self::Reflected(handle)
    }
}
