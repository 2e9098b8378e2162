#![forbid(unsafe_code)]

//! Per-binding set of weak `(target, property)` entries.
//!
//! # Invariants
//!
//! 1. A `(target, property)` pair is stored at most once; target identity
//!    is pointer identity, property identity is [`TargetProperty`] equality.
//! 2. The registry never keeps a target alive.
//! 3. `push_value` writes only to targets alive at the time of the call.
//!
//! Dead entries are pruned lazily on `insert` and `prune`; eager cleanup of
//! the owning binding is the lifetime tracker's job, not the registry's.

use std::rc::{Rc, Weak};

use lokal_core::ResourceValue;

use crate::target::{LocalizedTarget, TargetProperty};

/// One weak binding entry.
#[derive(Debug, Clone)]
pub struct BindingEntry {
    pub target: Weak<dyn LocalizedTarget>,
    pub property: TargetProperty,
}

impl BindingEntry {
    fn matches(&self, target: &Weak<dyn LocalizedTarget>, property: &TargetProperty) -> bool {
        Weak::ptr_eq(&self.target, target) && self.property == *property
    }

    fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

/// Counts from one [`BindingRegistry::push_value`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    pub delivered: usize,
    pub skipped_dead: usize,
    pub failed: usize,
}

/// Ordered collection of [`BindingEntry`]s.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    entries: Vec<BindingEntry>,
}

impl BindingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this exact live pair is registered.
    #[must_use]
    pub fn contains(&self, target: &Rc<dyn LocalizedTarget>, property: &TargetProperty) -> bool {
        let weak = Rc::downgrade(target);
        self.entries.iter().any(|e| e.matches(&weak, property))
    }

    /// Append a pair. Returns `false` ("already bound") for duplicates.
    pub fn insert(&mut self, target: &Rc<dyn LocalizedTarget>, property: TargetProperty) -> bool {
        self.prune();
        let weak = Rc::downgrade(target);
        if self.entries.iter().any(|e| e.matches(&weak, &property)) {
            return false;
        }
        self.entries.push(BindingEntry {
            target: weak,
            property,
        });
        true
    }

    /// Remove a pair. Returns whether it was present.
    pub fn remove(&mut self, target: &Rc<dyn LocalizedTarget>, property: &TargetProperty) -> bool {
        let weak = Rc::downgrade(target);
        let before = self.entries.len();
        self.entries.retain(|e| !e.matches(&weak, property));
        before != self.entries.len()
    }

    /// Whether `target` has any entry, for any property.
    #[must_use]
    pub fn has_target(&self, target: &Rc<dyn LocalizedTarget>) -> bool {
        let weak = Rc::downgrade(target);
        self.entries.iter().any(|e| Weak::ptr_eq(&e.target, &weak))
    }

    /// Drop entries whose target is gone. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(BindingEntry::is_alive);
        before - self.entries.len()
    }

    /// Snapshot of live `(target, property)` pairs, upgraded, in order.
    ///
    /// Used to write values without holding a borrow of the registry while
    /// target setters run.
    #[must_use]
    pub fn live_targets(&self) -> Vec<(Rc<dyn LocalizedTarget>, TargetProperty)> {
        self.entries
            .iter()
            .filter_map(|e| e.target.upgrade().map(|t| (t, e.property.clone())))
            .collect()
    }

    /// First live target, used as the anchor for ambient defaults.
    #[must_use]
    pub fn first_live_target(&self) -> Option<Rc<dyn LocalizedTarget>> {
        self.entries.iter().find_map(|e| e.target.upgrade())
    }

    /// Write `value` into every live entry.
    pub fn push_value(&self, value: &ResourceValue) -> PushReport {
        let skipped_dead = self.entries.iter().filter(|e| !e.is_alive()).count();
        let mut report = deliver(&self.live_targets(), value);
        report.skipped_dead = skipped_dead;
        report
    }

    /// Stored entries, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose target is still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_alive()).count()
    }
}

/// Write `value` into each upgraded target. Failures are logged and counted.
pub(crate) fn deliver(
    targets: &[(Rc<dyn LocalizedTarget>, TargetProperty)],
    value: &ResourceValue,
) -> PushReport {
    let mut report = PushReport::default();
    for (target, property) in targets {
        match property.apply(target.as_ref(), value) {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                report.failed += 1;
                tracing::warn!(
                    element = %target.debug_name(),
                    property = property.name(),
                    error = %err,
                    "failed to push localized value"
                );
            }
        }
    }
    report
}
