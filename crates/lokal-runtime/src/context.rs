#![forbid(unsafe_code)]

//! Ambient culture state and the change broadcast.
//!
//! [`CultureContext`] owns the current [`Culture`], a weak list of
//! [`CultureListener`]s, the default provider and the lifetime tracker that
//! keeps bindings alive while their targets are. Changing the culture walks
//! every live listener synchronously: when [`CultureContext::set_culture`]
//! returns, every live registered target holds a value for the new culture.
//!
//! # Invariants
//!
//! 1. Listeners are notified in subscription order, each at most once per
//!    broadcast pass.
//! 2. Dead listeners are skipped and pruned; nothing is written to a
//!    released target.
//! 3. A `set_culture` issued from inside a broadcast is queued and
//!    broadcast after the current pass. The last queued culture wins.
//! 4. Provider callbacks never touch runtime state directly. They only
//!    enqueue; dispatch happens on the owning thread, at the end of every
//!    culture change or refresh and in
//!    [`CultureContext::pump_provider_events`]. Provider-event passes get the
//!    same panic isolation as culture broadcasts.
//! 5. A provider stays attached while anything besides the context holds it.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Listener panics | Remaining listeners still run; the first panic is resumed after the pass |
//! | Provider lookup fails | Reported as a `ProviderError` event; the broadcast continues |
//! | Context dropped before its bindings | Bindings resolve against the invariant culture and stop receiving broadcasts |

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::mpsc;

use lokal_core::{
    Culture, CultureError, CultureSet, KeyAddress, LookupRequest, ParseError, ProviderError,
    ProviderEvent, ProviderSubscription, ResourceProvider, ResourceValue,
};
use tracing::{debug, info_span, warn};
use web_time::Instant;

use crate::config::{ConfigError, LocalizeConfig, detect_culture};
use crate::fallback::{FallbackBehavior, MissingKeyArgs};
use crate::lifetime::LifetimeTracker;
use crate::target::LocalizedTarget;

/// Something that reacts to culture and provider changes.
///
/// Return values count the targets updated and feed the
/// `culture.broadcast` span.
pub trait CultureListener {
    /// The context's culture changed.
    fn on_culture_changed(&self, ctx: &CultureContext) -> usize;

    /// An attached provider emitted `ProviderChanged` or `ValueChanged`.
    fn on_provider_event(
        &self,
        _ctx: &CultureContext,
        _provider: &Arc<dyn ResourceProvider>,
        _event: &ProviderEvent,
    ) -> usize {
        0
    }

    /// Explicit re-resolve requested through [`CultureContext::refresh`].
    fn on_refresh(&self, ctx: &CultureContext) -> usize {
        self.on_culture_changed(ctx)
    }
}

/// Handle returned by [`CultureContext::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Whether a broadcast pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastState {
    #[default]
    Idle,
    Broadcasting,
}

type MissingKeyHandler = dyn Fn(&mut MissingKeyArgs);
type ProviderErrorHandler = dyn Fn(&str, &ProviderError);
type QueuedEvent = (u64, ProviderEvent);

/// Rounds of provider-event dispatch one pass runs before leaving the rest
/// queued. Bounds feedback loops between handlers and providers.
const MAX_EVENT_ROUNDS: usize = 8;

#[derive(Clone, Copy)]
enum Pass<'a> {
    Culture,
    Refresh,
    ProviderEvent(&'a str),
}

struct ProviderLink {
    id: u64,
    provider: Arc<dyn ResourceProvider>,
    _subscription: ProviderSubscription,
}

pub(crate) struct ContextInner {
    culture: RefCell<Culture>,
    pending: RefCell<Option<Culture>>,
    state: Cell<BroadcastState>,
    design_mode: Cell<bool>,
    fallback_behavior: Cell<FallbackBehavior>,
    include_invariant_culture: Cell<bool>,
    listeners: RefCell<Vec<(ListenerId, Weak<dyn CultureListener>)>>,
    next_listener_id: Cell<u64>,
    default_provider: RefCell<Option<Arc<dyn ResourceProvider>>>,
    links: RefCell<Vec<ProviderLink>>,
    next_link_id: Cell<u64>,
    events_tx: mpsc::Sender<QueuedEvent>,
    events_rx: mpsc::Receiver<QueuedEvent>,
    tracker: LifetimeTracker<dyn LocalizedTarget>,
    missing_key_handlers: RefCell<Vec<Rc<MissingKeyHandler>>>,
    provider_error_handlers: RefCell<Vec<Rc<ProviderErrorHandler>>>,
}

/// Shared handle to a culture context. Clones refer to the same state.
///
/// Single-thread affinity: the handle is `!Send`.
#[derive(Clone)]
pub struct CultureContext {
    inner: Rc<ContextInner>,
}

/// Non-owning reference to a [`CultureContext`].
#[derive(Clone)]
pub(crate) struct WeakContext(Weak<ContextInner>);

impl WeakContext {
    pub(crate) fn upgrade(&self) -> Option<CultureContext> {
        self.0.upgrade().map(|inner| CultureContext { inner })
    }
}

thread_local! {
    static GLOBAL: CultureContext = CultureContext::with_culture(detect_culture());
}

impl fmt::Debug for CultureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CultureContext")
            .field("culture", &self.culture().name())
            .field("state", &self.inner.state.get())
            .field("design_mode", &self.inner.design_mode.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .field("tracked", &self.inner.tracker.len())
            .finish_non_exhaustive()
    }
}

impl Default for CultureContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CultureContext {
    /// Isolated context starting at the invariant culture.
    #[must_use]
    pub fn new() -> Self {
        Self::with_culture(Culture::invariant())
    }

    /// Isolated context starting at `culture`.
    #[must_use]
    pub fn with_culture(culture: Culture) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            inner: Rc::new(ContextInner {
                culture: RefCell::new(culture),
                pending: RefCell::new(None),
                state: Cell::new(BroadcastState::Idle),
                design_mode: Cell::new(false),
                fallback_behavior: Cell::new(FallbackBehavior::Default),
                include_invariant_culture: Cell::new(true),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
                default_provider: RefCell::new(None),
                links: RefCell::new(Vec::new()),
                next_link_id: Cell::new(0),
                events_tx,
                events_rx,
                tracker: LifetimeTracker::new(),
                missing_key_handlers: RefCell::new(Vec::new()),
                provider_error_handlers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Build from configuration. Invalid configuration fails here rather
    /// than at first lookup.
    pub fn from_config(config: &LocalizeConfig) -> Result<Self, ConfigError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        let ctx = Self::with_culture(config.initial_culture()?);
        ctx.apply_config(config);
        Ok(ctx)
    }

    /// The per-thread application context.
    ///
    /// Created on first access from `LOKAL_CULTURE` or the POSIX locale
    /// variables, and kept for the life of the thread.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL.with(Clone::clone)
    }

    /// Apply every field of `config` except `culture`.
    pub fn apply_config(&self, config: &LocalizeConfig) {
        self.inner.design_mode.set(config.design_mode);
        self.inner.fallback_behavior.set(config.fallback_behavior);
        self.inner
            .include_invariant_culture
            .set(config.include_invariant_culture);
        self.inner.tracker.set_sweep_threshold(config.sweep_threshold);
    }

    pub(crate) fn downgrade(&self) -> WeakContext {
        WeakContext(Rc::downgrade(&self.inner))
    }

    /// Whether two handles refer to the same context.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ========================================================================
    // Culture
    // ========================================================================

    #[must_use]
    pub fn culture(&self) -> Culture {
        self.inner.culture.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> BroadcastState {
        self.inner.state.get()
    }

    /// Switch culture and update every live listener before returning.
    ///
    /// Returns `false` if `culture` is already current. Called from inside
    /// a broadcast, the change is queued and `true` is returned.
    pub fn set_culture(&self, culture: Culture) -> bool {
        if self.inner.state.get() == BroadcastState::Broadcasting {
            let latest = self
                .inner
                .pending
                .borrow()
                .clone()
                .unwrap_or_else(|| self.culture());
            if latest == culture {
                return false;
            }
            debug!(culture = %culture, "culture change queued behind running broadcast");
            *self.inner.pending.borrow_mut() = Some(culture);
            return true;
        }

        if *self.inner.culture.borrow() == culture {
            return false;
        }
        *self.inner.pending.borrow_mut() = Some(culture);
        self.settle(|_, _| 0);
        true
    }

    /// Parse `name` and switch to it.
    pub fn set_culture_name(&self, name: &str) -> Result<bool, CultureError> {
        Ok(self.set_culture(Culture::parse(name)?))
    }

    /// Re-resolve every listener against the current state.
    ///
    /// Used after swapping providers, which never re-resolves implicitly.
    ///
    /// Has no effect when called from inside a broadcast.
    pub fn refresh(&self) -> usize {
        if self.inner.state.get() == BroadcastState::Broadcasting {
            return 0;
        }
        self.settle(|ctx, first_panic| {
            ctx.broadcast(first_panic, Pass::Refresh, |listener| listener.on_refresh(ctx))
        })
        .0
    }

    /// Run `first`, then every queued culture change and provider event
    /// until both queues are empty, all in the `Broadcasting` state.
    ///
    /// Returns the targets updated by `first` and the provider events
    /// dispatched. The first listener panic is resumed once `Idle` again.
    fn settle(
        &self,
        first: impl FnOnce(&Self, &mut Option<Box<dyn Any + Send>>) -> usize,
    ) -> (usize, usize) {
        self.inner.state.set(BroadcastState::Broadcasting);
        let mut first_panic: Option<Box<dyn Any + Send>> = None;
        let updated = first(self, &mut first_panic);

        let mut dispatched = 0;
        let mut rounds = 0;
        loop {
            let next = self.inner.pending.borrow_mut().take();
            if let Some(culture) = next {
                if *self.inner.culture.borrow() != culture {
                    *self.inner.culture.borrow_mut() = culture;
                    self.broadcast(&mut first_panic, Pass::Culture, |listener| {
                        listener.on_culture_changed(self)
                    });
                }
                continue;
            }
            if rounds == MAX_EVENT_ROUNDS {
                warn!(
                    rounds,
                    "provider events keep arriving while settling; rest left for the next pump"
                );
                break;
            }
            let events = self.dispatch_queued_events(&mut first_panic);
            if events == 0 {
                break;
            }
            dispatched += events;
            rounds += 1;
        }
        self.inner.state.set(BroadcastState::Idle);

        if let Some(payload) = first_panic {
            resume_unwind(payload);
        }
        (updated, dispatched)
    }

    fn broadcast(
        &self,
        first_panic: &mut Option<Box<dyn Any + Send>>,
        pass: Pass<'_>,
        notify: impl Fn(&dyn CultureListener) -> usize,
    ) -> usize {
        let started = Instant::now();
        self.inner.tracker.sweep();
        let listeners = self.live_listeners();
        let span = match pass {
            Pass::Culture | Pass::Refresh => info_span!(
                "culture.broadcast",
                culture = %self.culture(),
                refresh = matches!(pass, Pass::Refresh),
                listeners = listeners.len() as u64,
                targets_updated = tracing::field::Empty,
                duration_us = tracing::field::Empty
            ),
            Pass::ProviderEvent(provider) => info_span!(
                "provider.event",
                provider = provider,
                listeners = listeners.len() as u64,
                targets_updated = tracing::field::Empty,
                duration_us = tracing::field::Empty
            ),
        }
        .entered();

        let mut targets_updated = 0usize;
        for listener in &listeners {
            match catch_unwind(AssertUnwindSafe(|| notify(listener.as_ref()))) {
                Ok(updated) => targets_updated += updated,
                Err(payload) => {
                    warn!("culture listener panicked; continuing broadcast");
                    first_panic.get_or_insert(payload);
                }
            }
        }

        span.record("targets_updated", targets_updated as u64);
        span.record("duration_us", started.elapsed().as_micros() as u64);
        targets_updated
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener. The context holds it weakly.
    pub fn subscribe(&self, listener: Weak<dyn CultureListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener_id.get());
        self.inner.next_listener_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, listener));
        debug!(listener = id.0, "culture listener subscribed");
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(entry, _)| *entry != id);
        before != listeners.len()
    }

    /// Live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|(_, l)| l.strong_count() > 0)
            .count()
    }

    fn live_listeners(&self) -> Vec<Rc<dyn CultureListener>> {
        let mut listeners = self.inner.listeners.borrow_mut();
        listeners.retain(|(_, l)| l.strong_count() > 0);
        listeners.iter().filter_map(|(_, l)| l.upgrade()).collect()
    }

    // ========================================================================
    // Providers
    // ========================================================================

    #[must_use]
    pub fn default_provider(&self) -> Option<Arc<dyn ResourceProvider>> {
        self.inner.default_provider.borrow().clone()
    }

    /// Replace the default provider.
    ///
    /// Existing values stay as they are until the next culture change,
    /// provider event or [`refresh`](Self::refresh). The previous default
    /// stays attached while a binding override or the caller still holds it.
    pub fn set_default_provider(&self, provider: Arc<dyn ResourceProvider>) {
        self.attach_provider(&provider);
        debug!(provider = provider.name(), "default provider set");
        *self.inner.default_provider.borrow_mut() = Some(provider);
        self.prune_links();
    }

    /// Route `provider`'s events through this context. Idempotent.
    ///
    /// A link lasts while anything besides the context holds the provider.
    pub fn attach_provider(&self, provider: &Arc<dyn ResourceProvider>) {
        self.prune_links();
        let mut links = self.inner.links.borrow_mut();
        if links.iter().any(|link| Arc::ptr_eq(&link.provider, provider)) {
            return;
        }
        let id = self.inner.next_link_id.get();
        self.inner.next_link_id.set(id + 1);
        let tx = self.inner.events_tx.clone();
        let subscription = provider.events().subscribe(move |event| {
            // The receiver lives as long as the context; a send after it is
            // gone has nowhere to go.
            let _ = tx.send((id, event.clone()));
        });
        links.push(ProviderLink {
            id,
            provider: Arc::clone(provider),
            _subscription: subscription,
        });
        debug!(provider = provider.name(), link = id, "provider attached");
    }

    /// Providers whose events reach this context.
    #[must_use]
    pub fn attached_provider_count(&self) -> usize {
        self.prune_links();
        self.inner.links.borrow().len()
    }

    /// Drop links whose provider only the link itself still holds. No
    /// lookup can reach such a provider again.
    fn prune_links(&self) {
        self.inner.links.borrow_mut().retain(|link| {
            let held = Arc::strong_count(&link.provider) > 1;
            if !held {
                debug!(provider = link.provider.name(), link = link.id, "provider detached");
            }
            held
        });
    }

    fn linked_provider(&self, id: u64) -> Option<Arc<dyn ResourceProvider>> {
        self.inner
            .links
            .borrow()
            .iter()
            .find(|link| link.id == id)
            .map(|link| Arc::clone(&link.provider))
    }

    /// Dispatch queued provider events on this thread.
    ///
    /// `ProviderChanged` and `ValueChanged` go to listeners; `ProviderError`
    /// goes to the provider-error handlers. Culture changes and refreshes
    /// drain the queue before returning, so this is only needed for events
    /// raised outside a pass. Returns the number of events dispatched; 0
    /// from inside a broadcast, whose pass drains the queue itself.
    pub fn pump_provider_events(&self) -> usize {
        if self.inner.state.get() == BroadcastState::Broadcasting {
            return 0;
        }
        self.settle(|_, _| 0).1
    }

    fn dispatch_queued_events(&self, first_panic: &mut Option<Box<dyn Any + Send>>) -> usize {
        self.prune_links();
        let events: Vec<QueuedEvent> = self.inner.events_rx.try_iter().collect();
        for (link, event) in &events {
            let Some(provider) = self.linked_provider(*link) else {
                continue;
            };
            match event {
                ProviderEvent::ProviderError(err) => {
                    self.report_provider_error(first_panic, provider.name(), err);
                }
                _ => {
                    self.broadcast(first_panic, Pass::ProviderEvent(provider.name()), |listener| {
                        listener.on_provider_event(self, &provider, event)
                    });
                }
            }
        }
        events.len()
    }

    fn report_provider_error(
        &self,
        first_panic: &mut Option<Box<dyn Any + Send>>,
        provider: &str,
        err: &ProviderError,
    ) {
        warn!(provider, key = %err.key, error = %err.message, "resource lookup failed");
        let handlers: Vec<Rc<ProviderErrorHandler>> =
            self.inner.provider_error_handlers.borrow().clone();
        for handler in handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(provider, err))) {
                warn!(provider, "provider error handler panicked");
                first_panic.get_or_insert(payload);
            }
        }
    }

    /// Cultures the default provider has resources for.
    #[must_use]
    pub fn available_cultures(&self) -> CultureSet {
        let mut cultures = self
            .default_provider()
            .map(|p| p.available_cultures())
            .unwrap_or_default();
        if self.inner.include_invariant_culture.get() {
            cultures.insert(Culture::invariant());
        }
        cultures
    }

    /// One-shot lookup through the default provider, without a binding.
    ///
    /// `culture` defaults to the current culture. `Ok(None)` means not found;
    /// no fallback behavior or missing-key handler is applied.
    pub fn localize(
        &self,
        key: &str,
        culture: Option<&Culture>,
    ) -> Result<Option<ResourceValue>, ParseError> {
        let address = KeyAddress::parse(key)?.unresolved();
        let culture = culture.cloned().unwrap_or_else(|| self.culture());
        Ok(self
            .default_provider()
            .and_then(|p| p.get_localized(LookupRequest::new(&address, &culture))))
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Register a handler consulted when a binding's key resolves nowhere.
    pub fn on_missing_key(&self, handler: impl Fn(&mut MissingKeyArgs) + 'static) {
        self.inner
            .missing_key_handlers
            .borrow_mut()
            .push(Rc::new(handler));
    }

    /// Register a handler for `ProviderError` events, called with the
    /// provider name.
    pub fn on_provider_error(&self, handler: impl Fn(&str, &ProviderError) + 'static) {
        self.inner
            .provider_error_handlers
            .borrow_mut()
            .push(Rc::new(handler));
    }

    /// Run missing-key handlers until one supplies a value.
    pub(crate) fn raise_missing_key(&self, args: &mut MissingKeyArgs) {
        let handlers: Vec<Rc<MissingKeyHandler>> = self.inner.missing_key_handlers.borrow().clone();
        for handler in handlers {
            handler(args);
            if args.result.is_some() {
                break;
            }
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    #[must_use]
    pub fn design_mode(&self) -> bool {
        self.inner.design_mode.get()
    }

    pub fn set_design_mode(&self, enabled: bool) {
        self.inner.design_mode.set(enabled);
    }

    /// Fallback for bindings that do not set their own.
    #[must_use]
    pub fn fallback_behavior(&self) -> FallbackBehavior {
        self.inner.fallback_behavior.get()
    }

    pub fn set_fallback_behavior(&self, behavior: FallbackBehavior) {
        self.inner.fallback_behavior.set(behavior);
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    pub(crate) fn tracker(&self) -> &LifetimeTracker<dyn LocalizedTarget> {
        &self.inner.tracker
    }

    /// Release bindings whose targets are all gone.
    pub fn sweep(&self) -> usize {
        self.inner.tracker.sweep()
    }

    /// Tracked `(target, binding)` pairs, including unswept dead ones.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.inner.tracker.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lokal_providers::EmbeddedResourceProvider;

    struct Counter {
        seen: RefCell<Vec<String>>,
    }

    impl CultureListener for Counter {
        fn on_culture_changed(&self, ctx: &CultureContext) -> usize {
            self.seen.borrow_mut().push(ctx.culture().name().to_string());
            1
        }
    }

    fn counter() -> Rc<Counter> {
        Rc::new(Counter {
            seen: RefCell::new(Vec::new()),
        })
    }

    fn subscribe(ctx: &CultureContext, listener: &Rc<Counter>) -> ListenerId {
        let listener: Rc<dyn CultureListener> = listener.clone();
        ctx.subscribe(Rc::downgrade(&listener))
    }

    #[test]
    fn same_culture_is_a_noop() {
        let ctx = CultureContext::with_culture(Culture::parse("en").unwrap());
        let c = counter();
        subscribe(&ctx, &c);
        assert!(!ctx.set_culture(Culture::parse("en").unwrap()));
        assert!(c.seen.borrow().is_empty());
    }

    #[test]
    fn listeners_notified_in_order() {
        let ctx = CultureContext::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        struct Tagged(u8, Rc<RefCell<Vec<u8>>>);
        impl CultureListener for Tagged {
            fn on_culture_changed(&self, _ctx: &CultureContext) -> usize {
                self.1.borrow_mut().push(self.0);
                0
            }
        }

        let listeners: Vec<Rc<dyn CultureListener>> = (0..3)
            .map(|i| Rc::new(Tagged(i, Rc::clone(&order))) as Rc<dyn CultureListener>)
            .collect();
        for l in &listeners {
            ctx.subscribe(Rc::downgrade(l));
        }
        ctx.set_culture_name("fr").unwrap();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn dead_listeners_pruned() {
        let ctx = CultureContext::new();
        let a = counter();
        let b = counter();
        subscribe(&ctx, &a);
        subscribe(&ctx, &b);
        drop(b);
        assert_eq!(ctx.listener_count(), 1);
        ctx.set_culture_name("de").unwrap();
        assert_eq!(*a.seen.borrow(), vec!["de".to_string()]);
        assert_eq!(ctx.inner.listeners.borrow().len(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let ctx = CultureContext::new();
        let c = counter();
        let id = subscribe(&ctx, &c);
        assert!(ctx.unsubscribe(id));
        assert!(!ctx.unsubscribe(id));
        ctx.set_culture_name("de").unwrap();
        assert!(c.seen.borrow().is_empty());
    }

    #[test]
    fn reentrant_set_culture_is_queued() {
        struct Redirect {
            seen: RefCell<Vec<String>>,
        }
        impl CultureListener for Redirect {
            fn on_culture_changed(&self, ctx: &CultureContext) -> usize {
                let name = ctx.culture().name().to_string();
                if name == "de" {
                    assert!(ctx.set_culture_name("de-AT").unwrap());
                    assert_eq!(ctx.culture().name(), "de", "queued, not applied");
                }
                self.seen.borrow_mut().push(name);
                0
            }
        }

        let ctx = CultureContext::new();
        let redirect = Rc::new(Redirect {
            seen: RefCell::new(Vec::new()),
        });
        let listener: Rc<dyn CultureListener> = redirect.clone();
        ctx.subscribe(Rc::downgrade(&listener));
        ctx.set_culture_name("de").unwrap();

        assert_eq!(ctx.culture().name(), "de-AT");
        assert_eq!(ctx.state(), BroadcastState::Idle);
        assert_eq!(*redirect.seen.borrow(), vec!["de".to_string(), "de-AT".to_string()]);
    }

    #[test]
    fn panicking_listener_does_not_starve_the_rest() {
        struct Boom;
        impl CultureListener for Boom {
            fn on_culture_changed(&self, _ctx: &CultureContext) -> usize {
                panic!("boom");
            }
        }

        let ctx = CultureContext::new();
        let boom: Rc<dyn CultureListener> = Rc::new(Boom);
        ctx.subscribe(Rc::downgrade(&boom));
        let c = counter();
        subscribe(&ctx, &c);

        let result = catch_unwind(AssertUnwindSafe(|| ctx.set_culture_name("fr")));
        assert!(result.is_err(), "first panic is resumed");
        assert_eq!(*c.seen.borrow(), vec!["fr".to_string()]);
        assert_eq!(ctx.state(), BroadcastState::Idle);
    }

    #[test]
    fn panicking_provider_listener_does_not_starve_the_rest() {
        struct Boom;
        impl CultureListener for Boom {
            fn on_culture_changed(&self, _ctx: &CultureContext) -> usize {
                0
            }
            fn on_provider_event(
                &self,
                _ctx: &CultureContext,
                _provider: &Arc<dyn ResourceProvider>,
                _event: &ProviderEvent,
            ) -> usize {
                panic!("boom");
            }
        }

        struct Redirect(Cell<usize>);
        impl CultureListener for Redirect {
            fn on_culture_changed(&self, _ctx: &CultureContext) -> usize {
                0
            }
            fn on_provider_event(
                &self,
                ctx: &CultureContext,
                _provider: &Arc<dyn ResourceProvider>,
                _event: &ProviderEvent,
            ) -> usize {
                assert_eq!(ctx.state(), BroadcastState::Broadcasting);
                assert!(ctx.set_culture_name("de").unwrap());
                self.0.set(self.0.get() + 1);
                1
            }
        }

        let ctx = CultureContext::new();
        let provider = Arc::new(EmbeddedResourceProvider::new("app"));
        let dynamic: Arc<dyn ResourceProvider> = provider.clone();
        ctx.set_default_provider(dynamic);
        let boom: Rc<dyn CultureListener> = Rc::new(Boom);
        ctx.subscribe(Rc::downgrade(&boom));
        let redirect = Rc::new(Redirect(Cell::new(0)));
        let listener: Rc<dyn CultureListener> = redirect.clone();
        ctx.subscribe(Rc::downgrade(&listener));

        provider.add_resource("App", "Resources", Culture::invariant(), [("k", "v")]);
        let result = catch_unwind(AssertUnwindSafe(|| ctx.pump_provider_events()));

        assert!(result.is_err(), "first panic is resumed");
        assert_eq!(redirect.0.get(), 1);
        assert_eq!(ctx.culture().name(), "de", "queued change applied before returning");
        assert_eq!(ctx.state(), BroadcastState::Idle);
        assert_eq!(ctx.pump_provider_events(), 0);
    }

    #[test]
    fn released_default_provider_is_detached() {
        let ctx = CultureContext::new();
        let first: Arc<dyn ResourceProvider> = Arc::new(EmbeddedResourceProvider::new("first"));
        let second: Arc<dyn ResourceProvider> = Arc::new(EmbeddedResourceProvider::new("second"));
        ctx.set_default_provider(Arc::clone(&first));
        ctx.set_default_provider(Arc::clone(&first));
        ctx.set_default_provider(Arc::clone(&second));
        assert_eq!(ctx.attached_provider_count(), 2, "caller still holds the first");

        let weak = Arc::downgrade(&first);
        drop(first);
        assert_eq!(ctx.attached_provider_count(), 1);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn from_config_rejects_invalid_culture() {
        let config = LocalizeConfig {
            culture: Some("1234".into()),
            ..LocalizeConfig::default()
        };
        assert!(matches!(
            CultureContext::from_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn from_config_applies_settings() {
        let config = LocalizeConfig {
            culture: Some("it".into()),
            design_mode: true,
            fallback_behavior: FallbackBehavior::Key,
            include_invariant_culture: false,
            sweep_threshold: 0,
        };
        let ctx = CultureContext::from_config(&config).unwrap();
        assert_eq!(ctx.culture().name(), "it");
        assert!(ctx.design_mode());
        assert_eq!(ctx.fallback_behavior(), FallbackBehavior::Key);
        assert!(ctx.available_cultures().is_empty());
    }

    #[test]
    fn invariant_included_by_default() {
        let ctx = CultureContext::new();
        assert!(ctx.available_cultures().contains(&Culture::invariant()));
    }

    #[test]
    fn global_is_per_thread_singleton() {
        let a = CultureContext::global();
        let b = CultureContext::global();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&CultureContext::new()));
    }
}
