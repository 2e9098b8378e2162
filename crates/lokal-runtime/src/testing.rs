#![forbid(unsafe_code)]

//! Test doubles for the target side of bindings.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-helpers` feature.

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use lokal_core::{ResourceValue, SegmentKind};

use crate::target::{LocalizedTarget, PropertyError, PropertyToken};

/// A target that records every native property write.
#[derive(Default)]
pub struct RecordingTarget {
    name: String,
    values: RefCell<HashMap<String, ResourceValue>>,
    writes: RefCell<Vec<(String, ResourceValue)>>,
    rejected: RefCell<HashSet<String>>,
    parent: RefCell<Option<Rc<dyn LocalizedTarget>>>,
    defaults: RefCell<HashMap<SegmentKind, String>>,
}

impl std::fmt::Debug for RecordingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingTarget")
            .field("name", &self.name)
            .field("writes", &self.writes.borrow().len())
            .finish_non_exhaustive()
    }
}

impl RecordingTarget {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Convenience: a fresh target as both its concrete and erased handle.
    #[must_use]
    pub fn shared(name: impl Into<String>) -> (Rc<Self>, Rc<dyn LocalizedTarget>) {
        let concrete = Rc::new(Self::new(name));
        let erased: Rc<dyn LocalizedTarget> = concrete.clone();
        (concrete, erased)
    }

    /// Last value written to `property`.
    #[must_use]
    pub fn value(&self, property: &str) -> Option<ResourceValue> {
        self.values.borrow().get(property).cloned()
    }

    /// Last value written to `property`, rendered as text.
    #[must_use]
    pub fn text(&self, property: &str) -> Option<String> {
        self.value(property).map(|v| v.to_string())
    }

    /// Number of writes to `property`.
    #[must_use]
    pub fn write_count(&self, property: &str) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|(name, _)| name == property)
            .count()
    }

    /// Every write in order.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, ResourceValue)> {
        self.writes.borrow().clone()
    }

    /// Make writes to `property` fail with `UnknownProperty`.
    pub fn reject(&self, property: &str) {
        self.rejected.borrow_mut().insert(property.to_string());
    }

    pub fn set_parent(&self, parent: Option<Rc<dyn LocalizedTarget>>) {
        *self.parent.borrow_mut() = parent;
    }

    /// Declare a local default for a key segment (inherited by children).
    pub fn set_default(&self, kind: SegmentKind, value: &str) {
        self.defaults.borrow_mut().insert(kind, value.to_string());
    }

    /// Write through a reflected setter rather than `set_native`.
    pub fn set_reflected(&self, property: &str, value: &ResourceValue) {
        self.record(property, value);
    }

    fn record(&self, property: &str, value: &ResourceValue) {
        self.values
            .borrow_mut()
            .insert(property.to_string(), value.clone());
        self.writes
            .borrow_mut()
            .push((property.to_string(), value.clone()));
    }
}

impl LocalizedTarget for RecordingTarget {
    fn set_native(&self, token: &PropertyToken, value: &ResourceValue) -> Result<(), PropertyError> {
        if self.rejected.borrow().contains(token.name()) {
            return Err(PropertyError::UnknownProperty(token.name().to_string()));
        }
        self.record(token.name(), value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn debug_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn logical_parent(&self) -> Option<Rc<dyn LocalizedTarget>> {
        self.parent.borrow().clone()
    }

    fn local_default(&self, kind: SegmentKind) -> Option<String> {
        self.defaults.borrow().get(&kind).cloned()
    }
}
