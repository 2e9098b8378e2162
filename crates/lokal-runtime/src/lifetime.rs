#![forbid(unsafe_code)]

//! Ties the lifetime of a payload to the reachability of an owner.
//!
//! # Design
//!
//! A binding references its targets weakly, and nothing in the UI tree
//! references the binding strongly. Left alone, the binding would be dropped
//! immediately; holding it strongly from its targets would invert the
//! ownership the toolkit expects. [`LifetimeTracker`] stores explicit
//! `{weak owner, strong payload}` pairs: the payload stays alive exactly as
//! long as some owner it was paired with is alive, and [`LifetimeTracker::sweep`]
//! releases payloads whose owners are gone.
//!
//! # Invariants
//!
//! 1. A given `(owner, payload)` pair (by pointer identity) is stored at most once.
//! 2. After `sweep()`, no stored pair has a dead owner.
//! 3. Pairs are kept in insertion order.
//!
//! # Failure Modes
//!
//! - **Sweep never runs**: payloads of dead owners linger until the next
//!   sweep. Tracking runs an opportunistic sweep every `sweep_threshold`
//!   insertions, and `CultureContext::set_culture` sweeps before each
//!   broadcast, so growth is bounded in practice.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Default number of insertions between opportunistic sweeps.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 64;

struct TrackedPair<O: ?Sized> {
    owner: Weak<O>,
    payload: Rc<dyn Any>,
}

/// Registry of `{weak owner, strong payload}` pairs.
///
/// Generic over the owner type so a target trait object can be tracked
/// without converting it to `dyn Any`.
pub struct LifetimeTracker<O: ?Sized = dyn Any> {
    pairs: RefCell<Vec<TrackedPair<O>>>,
    inserts_since_sweep: Cell<usize>,
    sweep_threshold: Cell<usize>,
}

impl<O: ?Sized> fmt::Debug for LifetimeTracker<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeTracker")
            .field("pairs", &self.len())
            .field("sweep_threshold", &self.sweep_threshold.get())
            .finish()
    }
}

impl<O: ?Sized> Default for LifetimeTracker<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ?Sized> LifetimeTracker<O> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_sweep_threshold(DEFAULT_SWEEP_THRESHOLD)
    }

    /// `threshold == 0` disables opportunistic sweeping.
    #[must_use]
    pub fn with_sweep_threshold(threshold: usize) -> Self {
        Self {
            pairs: RefCell::new(Vec::new()),
            inserts_since_sweep: Cell::new(0),
            sweep_threshold: Cell::new(threshold),
        }
    }

    pub fn set_sweep_threshold(&self, threshold: usize) {
        self.sweep_threshold.set(threshold);
    }

    /// Keep `payload` alive while `owner` is alive.
    ///
    /// Returns `false` if this exact pair is already tracked.
    pub fn track(&self, owner: Weak<O>, payload: Rc<dyn Any>) -> bool {
        let duplicate = self
            .pairs
            .borrow()
            .iter()
            .any(|pair| Weak::ptr_eq(&pair.owner, &owner) && Rc::ptr_eq(&pair.payload, &payload));
        if duplicate {
            return false;
        }

        self.pairs.borrow_mut().push(TrackedPair { owner, payload });

        let inserts = self.inserts_since_sweep.get() + 1;
        let threshold = self.sweep_threshold.get();
        if threshold > 0 && inserts >= threshold {
            self.sweep();
        } else {
            self.inserts_since_sweep.set(inserts);
        }
        true
    }

    /// Remove one pair explicitly. Returns whether it was present.
    pub fn release(&self, owner: &Weak<O>, payload: &Rc<dyn Any>) -> bool {
        let removed = {
            let mut pairs = self.pairs.borrow_mut();
            pairs
                .iter()
                .position(|pair| Weak::ptr_eq(&pair.owner, owner) && Rc::ptr_eq(&pair.payload, payload))
                .map(|idx| pairs.remove(idx))
        };
        // Payload (possibly the last strong ref) drops here, outside the borrow.
        removed.is_some()
    }

    /// Drop every pair whose owner is gone. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.inserts_since_sweep.set(0);
        let released: Vec<TrackedPair<O>> = {
            let mut pairs = self.pairs.borrow_mut();
            let (live, dead): (Vec<_>, Vec<_>) = pairs
                .drain(..)
                .partition(|pair| pair.owner.strong_count() > 0);
            *pairs = live;
            dead
        };
        let count = released.len();
        if count > 0 {
            tracing::debug!(released = count, remaining = self.len(), "lifetime sweep");
        }
        // Dropping payloads may run arbitrary Drop impls that touch this
        // tracker, so it happens after the borrow is released.
        drop(released);
        count
    }

    /// Whether any pair holds `payload`.
    #[must_use]
    pub fn tracks(&self, payload: &Rc<dyn Any>) -> bool {
        self.pairs
            .borrow()
            .iter()
            .any(|pair| Rc::ptr_eq(&pair.payload, payload))
    }

    /// Number of stored pairs, including not-yet-swept dead ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.borrow().is_empty()
    }
}
