#![forbid(unsafe_code)]

//! The resource provider contract.
//!
//! A [`ResourceProvider`] turns a [`ResolvedAddress`] plus a [`Culture`]
//! into a [`ResourceValue`]. Providers are shared by every binding that uses
//! them, so they must be `Send + Sync`: the read path may run on background
//! threads while configuration changes happen on the UI thread.
//!
//! # Lookup protocol
//!
//! A miss is not an error for the caller. `get_localized` returns `None`
//! and the provider emits exactly one [`ProviderEvent::ProviderError`]
//! naming the address and every location it tried. Use
//! [`resolve_with_fallback`] to get the culture walk and the diagnostic
//! right.
//!
//! # Notifications
//!
//! [`ProviderEvents`] is a weak subscriber hub in the spirit of an
//! observable: subscribers hold a [`ProviderSubscription`] guard, dropping
//! the guard unsubscribes, and dead entries are pruned lazily on the next
//! emit. Callbacks run outside the internal lock so a callback may itself
//! subscribe or emit.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use arc_swap::ArcSwap;

use crate::address::ResolvedAddress;
use crate::culture::{Culture, CultureSet};
use crate::value::ResourceValue;

/// One lookup request.
#[derive(Debug, Clone, Copy)]
pub struct LookupRequest<'a> {
    pub address: &'a ResolvedAddress,
    pub culture: &'a Culture,
    /// Description of the target the value is for; used only in diagnostics.
    pub context: Option<&'a str>,
}

impl<'a> LookupRequest<'a> {
    #[must_use]
    pub fn new(address: &'a ResolvedAddress, culture: &'a Culture) -> Self {
        Self {
            address,
            culture,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Option<&'a str>) -> Self {
        self.context = context;
        self
    }
}

/// A pluggable source of localized values.
pub trait ResourceProvider: Send + Sync {
    /// Stable name used in diagnostics and event routing.
    fn name(&self) -> &str;

    /// Resolve a value. `None` means not found after the full fallback walk;
    /// the provider has already emitted a `ProviderError` in that case.
    fn get_localized(&self, request: LookupRequest<'_>) -> Option<ResourceValue>;

    /// Cultures this provider currently has resources for.
    fn available_cultures(&self) -> CultureSet;

    /// Notification hub for this provider.
    fn events(&self) -> &ProviderEvents;
}

impl fmt::Debug for dyn ResourceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceProvider")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Diagnostic payload of a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Target description from the request, if any.
    pub context: Option<String>,
    pub key: String,
    pub message: String,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{} (key '{}', target {ctx})", self.message, self.key),
            None => write!(f, "{} (key '{}')", self.message, self.key),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Provider notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Configuration changed; every value from this provider may be stale.
    ProviderChanged { context: Option<String> },
    /// A lookup failed.
    ProviderError(ProviderError),
    /// A single entry changed.
    ValueChanged {
        key: String,
        value: Option<ResourceValue>,
        tag: Option<String>,
    },
}

type EventCallback = dyn Fn(&ProviderEvent) + Send + Sync;

/// Thread-safe weak subscriber list for [`ProviderEvent`]s.
#[derive(Default)]
pub struct ProviderEvents {
    subscribers: Mutex<Vec<Weak<EventCallback>>>,
}

impl fmt::Debug for ProviderEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEvents")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl ProviderEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe. The callback stays registered while the returned guard lives.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ProviderEvent) + Send + Sync + 'static,
    ) -> ProviderSubscription {
        let strong: Arc<EventCallback> = Arc::new(callback);
        self.lock().push(Arc::downgrade(&strong));
        ProviderSubscription { _guard: strong }
    }

    /// Deliver `event` to live subscribers in registration order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, event: &ProviderEvent) -> usize {
        let callbacks: Vec<Arc<EventCallback>> = {
            let mut subs = self.lock();
            subs.retain(|w| w.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };
        for cb in &callbacks {
            cb(event);
        }
        callbacks.len()
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Weak<EventCallback>>> {
        // A poisoned list is still structurally valid.
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// RAII guard for a [`ProviderEvents`] subscription.
pub struct ProviderSubscription {
    _guard: Arc<EventCallback>,
}

impl fmt::Debug for ProviderSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSubscription").finish_non_exhaustive()
    }
}

/// Outcome of probing one culture level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(ResourceValue),
    /// Not found at this level; `location` describes what was tried.
    Missing { location: String },
}

/// Walk `culture`'s fallback chain (`de-AT` → `de` → invariant), returning
/// the first value found or every attempted location on exhaustion.
pub fn resolve_with_fallback(
    culture: &Culture,
    mut probe: impl FnMut(&Culture) -> Probe,
) -> Result<ResourceValue, Vec<String>> {
    let mut attempted = Vec::new();
    for candidate in culture.fallback_chain() {
        match probe(&candidate) {
            Probe::Found(value) => return Ok(value),
            Probe::Missing { location } => attempted.push(location),
        }
    }
    Err(attempted)
}

/// Provider-specific resource name for a dictionary at one culture level:
/// `{dictionary}-{culture}`, or `{dictionary}` for the invariant culture.
#[must_use]
pub fn resource_name(dictionary: &str, culture: &Culture) -> String {
    if culture.is_invariant() {
        dictionary.to_string()
    } else {
        format!("{dictionary}-{}", culture.name())
    }
}

/// Build the single `ProviderError` for an exhausted lookup.
#[must_use]
pub fn not_found_error(request: &LookupRequest<'_>, attempted: &[String]) -> ProviderError {
    ProviderError {
        context: request.context.map(str::to_string),
        key: request.address.key.clone(),
        message: format!(
            "no resource for '{}' at culture {}; tried: {}",
            request.address,
            request.culture,
            attempted.join(", ")
        ),
    }
}

/// Published set of available cultures.
///
/// Readers get a consistent snapshot without locking; writers replace the
/// whole set atomically before announcing `ProviderChanged`.
#[derive(Debug)]
pub struct CulturePublisher {
    inner: ArcSwap<CultureSet>,
}

impl Default for CulturePublisher {
    fn default() -> Self {
        Self::new(CultureSet::new())
    }
}

impl CulturePublisher {
    #[must_use]
    pub fn new(initial: CultureSet) -> Self {
        Self {
            inner: ArcSwap::from_pointee(initial),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn load(&self) -> CultureSet {
        CultureSet::clone(&self.inner.load())
    }

    /// Replace the published set.
    pub fn publish(&self, cultures: CultureSet) {
        tracing::debug!(count = cultures.len(), "publishing available cultures");
        self.inner.store(Arc::new(cultures));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn culture(name: &str) -> Culture {
        Culture::parse(name).unwrap()
    }

    #[test]
    fn fallback_finds_invariant_level() {
        let mut seen = Vec::new();
        let result = resolve_with_fallback(&culture("de-AT"), |c| {
            seen.push(c.name().to_string());
            if c.is_invariant() {
                Probe::Found("neutral".into())
            } else {
                Probe::Missing {
                    location: c.name().to_string(),
                }
            }
        });
        assert_eq!(result, Ok(ResourceValue::from("neutral")));
        assert_eq!(seen, vec!["de-AT", "de", ""]);
    }

    #[test]
    fn fallback_exhaustion_lists_locations() {
        let result = resolve_with_fallback(&culture("de"), |c| Probe::Missing {
            location: format!("loc[{}]", c.name()),
        });
        assert_eq!(result, Err(vec!["loc[de]".to_string(), "loc[]".to_string()]));
    }

    #[test]
    fn resource_name_suffixes() {
        assert_eq!(resource_name("Strings", &culture("de-AT")), "Strings-de-AT");
        assert_eq!(resource_name("Strings", &Culture::invariant()), "Strings");
    }

    #[test]
    fn events_prune_dropped_subscribers() {
        let events = ProviderEvents::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = events.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let changed = ProviderEvent::ProviderChanged { context: None };
        assert_eq!(events.emit(&changed), 1);
        drop(sub);
        assert_eq!(events.emit(&changed), 0);
        assert_eq!(events.subscriber_count(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_delivered_in_registration_order() {
        let events = ProviderEvents::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<_> = (0..3)
            .map(|i| {
                let order = Arc::clone(&order);
                events.subscribe(move |_| order.lock().unwrap().push(i))
            })
            .collect();
        events.emit(&ProviderEvent::ProviderChanged { context: None });
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn not_found_message_names_address_and_locations() {
        let addr = ResolvedAddress::new(Some("App"), Some("Strings"), "Title");
        let c = culture("de");
        let req = LookupRequest::new(&addr, &c).with_context(Some("Button#1"));
        let err = not_found_error(&req, &["a".into(), "b".into()]);
        assert_eq!(err.key, "Title");
        assert_eq!(err.context.as_deref(), Some("Button#1"));
        assert!(err.message.contains("App:Strings:Title"));
        assert!(err.message.contains("tried: a, b"));
    }

    #[test]
    fn publisher_swaps_snapshot() {
        let publisher = CulturePublisher::default();
        assert!(publisher.load().is_empty());
        publisher.publish([culture("de"), culture("en")].into_iter().collect());
        assert_eq!(publisher.load().len(), 2);
    }
}
