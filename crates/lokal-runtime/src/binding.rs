#![forbid(unsafe_code)]

//! A declared localization site: one key, many targets.
//!
//! [`LocBinding`] resolves its [`KeyAddress`] through a provider and pushes
//! the result into every registered `(target, property)` pair, again on each
//! culture change, and again when the provider reports that the value may
//! have changed.
//!
//! # Ownership
//!
//! ```text
//!   target ──(tracker pair)──▶ binding ──(weak)──▶ target
//!      ▲                          │
//!      └──────── context ◀─(weak)─┘
//! ```
//!
//! The context's lifetime tracker keeps the binding alive while at least one
//! of its targets is. Dropping every [`LocBinding`] handle is fine; dropping
//! every target releases the binding at the next sweep.
//!
//! # Invariants
//!
//! 1. A binding with no live targets is not subscribed to its context.
//! 2. A binding with a valid forced culture ignores culture broadcasts.
//! 3. Ambient `assembly`/`dictionary` defaults come from the first live
//!    registered target's logical ancestry.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use lokal_core::{
    Culture, KeyAddress, LookupRequest, ParseError, ProviderEvent, ResolvedAddress,
    ResourceProvider, ResourceValue,
};
use tracing::debug;

use crate::config::ConfigError;
use crate::context::{CultureContext, CultureListener, ListenerId, WeakContext};
use crate::fallback::{FallbackBehavior, MissingKeyArgs};
use crate::registry::{BindingRegistry, PushReport, deliver};
use crate::target::{LocalizedTarget, TargetProperty, inherited_default};

struct BindingInner {
    this: Weak<BindingInner>,
    ctx: WeakContext,
    address: RefCell<KeyAddress>,
    forced_culture: RefCell<Option<Culture>>,
    fallback: Cell<Option<FallbackBehavior>>,
    provider: RefCell<Option<Arc<dyn ResourceProvider>>>,
    registry: RefCell<BindingRegistry>,
    listener: Cell<Option<ListenerId>>,
}

/// Handle to a localization binding. Clones share the same binding.
#[derive(Clone)]
pub struct LocBinding {
    inner: Rc<BindingInner>,
}

impl fmt::Debug for LocBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocBinding")
            .field("address", &self.inner.address.borrow().to_string())
            .field("forced_culture", &self.inner.forced_culture.borrow())
            .field("targets", &self.inner.registry.borrow().live_count())
            .finish_non_exhaustive()
    }
}

impl LocBinding {
    /// Parse `key` and create an unbound binding in `ctx`.
    pub fn new(ctx: &CultureContext, key: &str) -> Result<Self, ParseError> {
        Ok(Self::from_address(ctx, KeyAddress::parse(key)?))
    }

    #[must_use]
    pub fn from_address(ctx: &CultureContext, address: KeyAddress) -> Self {
        Self {
            inner: Rc::new_cyclic(|this| BindingInner {
                this: this.clone(),
                ctx: ctx.downgrade(),
                address: RefCell::new(address),
                forced_culture: RefCell::new(None),
                fallback: Cell::new(None),
                provider: RefCell::new(None),
                registry: RefCell::new(BindingRegistry::new()),
                listener: Cell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn address(&self) -> KeyAddress {
        self.inner.address.borrow().clone()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replace the key and push the new value.
    pub fn set_key(&self, key: &str) -> Result<(), ParseError> {
        let address = KeyAddress::parse(key)?;
        *self.inner.address.borrow_mut() = address;
        self.push_value();
        Ok(())
    }

    /// Override the dictionary segment. `None` restores ambient lookup.
    pub fn set_dictionary(&self, dictionary: Option<&str>) {
        self.update_address(|address| address.with_dictionary(dictionary));
    }

    /// Override the assembly segment. `None` restores ambient lookup.
    pub fn set_assembly(&self, assembly: Option<&str>) {
        self.update_address(|address| address.with_assembly(assembly));
    }

    fn update_address(&self, change: impl FnOnce(KeyAddress) -> KeyAddress) {
        let current = self.address();
        *self.inner.address.borrow_mut() = change(current);
        self.push_value();
    }

    /// Pin this binding to a culture, or `None` to follow the context.
    ///
    /// An unparseable name is a configuration error, except in design mode
    /// where the binding quietly follows the context's culture instead.
    pub fn set_forced_culture(&self, name: Option<&str>) -> Result<(), ConfigError> {
        let forced = match name.map(Culture::parse) {
            None => None,
            Some(Ok(culture)) => Some(culture),
            Some(Err(source)) => {
                let lenient = self.context().is_some_and(|ctx| ctx.design_mode());
                let value = name.unwrap_or_default().to_string();
                if !lenient {
                    return Err(ConfigError::InvalidForcedCulture { value, source });
                }
                debug!(forced_culture = %value, error = %source, "ignoring invalid forced culture in design mode");
                None
            }
        };
        *self.inner.forced_culture.borrow_mut() = forced;
        self.push_value();
        Ok(())
    }

    #[must_use]
    pub fn forced_culture(&self) -> Option<Culture> {
        self.inner.forced_culture.borrow().clone()
    }

    /// Fallback for this binding; `None` uses the context's.
    pub fn set_fallback_behavior(&self, behavior: Option<FallbackBehavior>) {
        self.inner.fallback.set(behavior);
        self.push_value();
    }

    #[must_use]
    pub fn fallback_behavior(&self) -> FallbackBehavior {
        self.inner.fallback.get().unwrap_or_else(|| {
            self.context()
                .map(|ctx| ctx.fallback_behavior())
                .unwrap_or_default()
        })
    }

    /// Resolve through `provider` instead of the context's default.
    pub fn set_provider(&self, provider: Option<Arc<dyn ResourceProvider>>) {
        if let (Some(ctx), Some(provider)) = (self.context(), provider.as_ref()) {
            ctx.attach_provider(provider);
        }
        *self.inner.provider.borrow_mut() = provider;
        self.push_value();
    }

    /// Provider lookups go through: the override, else the context default.
    #[must_use]
    pub fn provider(&self) -> Option<Arc<dyn ResourceProvider>> {
        self.inner
            .provider
            .borrow()
            .clone()
            .or_else(|| self.context().and_then(|ctx| ctx.default_provider()))
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Register `(target, property)` and push the current value into it.
    ///
    /// Returns `false` if the pair is already registered.
    pub fn bind(&self, target: &Rc<dyn LocalizedTarget>, property: impl Into<TargetProperty>) -> bool {
        let property = property.into();
        if !self.inner.registry.borrow_mut().insert(target, property.clone()) {
            return false;
        }
        self.ensure_subscribed();
        if let Some(ctx) = self.context() {
            ctx.tracker().track(Rc::downgrade(target), self.payload());
        }
        let value = self.value();
        deliver(&[(Rc::clone(target), property)], &value);
        true
    }

    /// Remove `(target, property)`. Returns whether it was registered.
    pub fn unbind(&self, target: &Rc<dyn LocalizedTarget>, property: &TargetProperty) -> bool {
        if !self.inner.registry.borrow_mut().remove(target, property) {
            return false;
        }
        if !self.inner.registry.borrow().has_target(target) {
            if let Some(ctx) = self.context() {
                ctx.tracker().release(&Rc::downgrade(target), &self.payload());
            }
        }
        self.unsubscribe_if_idle();
        true
    }

    /// Registered pairs whose target is alive.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.inner.registry.borrow().live_count()
    }

    /// Resolve and write the value into every live target.
    pub fn push_value(&self) -> PushReport {
        let (targets, skipped_dead) = {
            let mut registry = self.inner.registry.borrow_mut();
            let skipped_dead = registry.prune();
            (registry.live_targets(), skipped_dead)
        };
        if targets.is_empty() {
            self.unsubscribe_if_idle();
            return PushReport {
                skipped_dead,
                ..PushReport::default()
            };
        }
        let value = self.value();
        let mut report = deliver(&targets, &value);
        report.skipped_dead = skipped_dead;
        report
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Culture lookups use: the forced culture, else the context's.
    #[must_use]
    pub fn effective_culture(&self) -> Culture {
        self.forced_culture().unwrap_or_else(|| {
            self.context()
                .map(|ctx| ctx.culture())
                .unwrap_or_else(Culture::invariant)
        })
    }

    /// The value for the effective culture.
    #[must_use]
    pub fn value(&self) -> ResourceValue {
        self.resolve_for(&self.effective_culture())
    }

    /// The value this binding would show under `culture`.
    ///
    /// Never fails: a key that resolves nowhere yields the missing-key
    /// handler's value or the fallback text.
    #[must_use]
    pub fn resolve_for(&self, culture: &Culture) -> ResourceValue {
        let address = self.address();
        let anchor = self.inner.registry.borrow().first_live_target();
        let resolved = resolve_against(&address, anchor.as_ref());
        let context = anchor.as_ref().map(|target| target.debug_name().into_owned());
        let provider = self.provider();
        let lookup = || {
            provider.as_ref().and_then(|p| {
                p.get_localized(
                    LookupRequest::new(&resolved, culture).with_context(context.as_deref()),
                )
            })
        };

        if let Some(value) = lookup() {
            return value;
        }
        if provider.is_none() {
            debug!(key = %address, "no resource provider configured");
        }

        let mut args = MissingKeyArgs::new(address.key(), culture.clone());
        if let Some(ctx) = self.context() {
            ctx.raise_missing_key(&mut args);
        }
        if let Some(value) = args.result {
            return value;
        }
        if args.reload {
            if let Some(value) = lookup() {
                return value;
            }
        }
        self.fallback_behavior().value_for(address.key())
    }

    /// The address with ambient segments filled from the first live target.
    #[must_use]
    pub fn resolved_address(&self) -> ResolvedAddress {
        let anchor = self.inner.registry.borrow().first_live_target();
        resolve_against(&self.address(), anchor.as_ref())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn context(&self) -> Option<CultureContext> {
        self.inner.ctx.upgrade()
    }

    fn payload(&self) -> Rc<dyn Any> {
        Rc::clone(&self.inner) as Rc<dyn Any>
    }

    fn ensure_subscribed(&self) {
        if self.inner.listener.get().is_some() {
            return;
        }
        if let Some(ctx) = self.context() {
            let strong: Rc<dyn CultureListener> = Rc::clone(&self.inner) as Rc<dyn CultureListener>;
            let id = ctx.subscribe(Rc::downgrade(&strong));
            self.inner.listener.set(Some(id));
        }
    }

    fn unsubscribe_if_idle(&self) {
        if self.inner.registry.borrow().live_count() > 0 {
            return;
        }
        if let (Some(id), Some(ctx)) = (self.inner.listener.take(), self.context()) {
            ctx.unsubscribe(id);
            debug!(key = %self.address(), "binding has no live targets; unsubscribed");
        }
    }

    /// Whether a provider event concerns this binding.
    fn is_affected_by(&self, provider: &Arc<dyn ResourceProvider>, event: &ProviderEvent) -> bool {
        let ours = self
            .provider()
            .is_some_and(|current| Arc::ptr_eq(&current, provider));
        if !ours {
            return false;
        }
        match event {
            ProviderEvent::ProviderChanged { .. } => true,
            ProviderEvent::ValueChanged { key, tag, .. } => {
                key == self.inner.address.borrow().key()
                    && tag.as_deref().is_none_or(|tag| {
                        Culture::parse(tag).is_ok_and(|tagged| {
                            self.effective_culture()
                                .fallback_chain()
                                .any(|level| level == tagged)
                        })
                    })
            }
            ProviderEvent::ProviderError(_) => false,
        }
    }
}

fn resolve_against(address: &KeyAddress, anchor: Option<&Rc<dyn LocalizedTarget>>) -> ResolvedAddress {
    address.resolve_defaults(|kind| anchor.and_then(|target| inherited_default(target.as_ref(), kind)))
}

impl CultureListener for BindingInner {
    fn on_culture_changed(&self, ctx: &CultureContext) -> usize {
        if self.forced_culture.borrow().is_some() {
            return 0;
        }
        self.on_refresh(ctx)
    }

    fn on_provider_event(
        &self,
        _ctx: &CultureContext,
        provider: &Arc<dyn ResourceProvider>,
        event: &ProviderEvent,
    ) -> usize {
        match self.handle() {
            Some(binding) if binding.is_affected_by(provider, event) => {
                binding.push_value().delivered
            }
            _ => 0,
        }
    }

    fn on_refresh(&self, _ctx: &CultureContext) -> usize {
        self.handle()
            .map_or(0, |binding| binding.push_value().delivered)
    }
}

impl BindingInner {
    fn handle(&self) -> Option<LocBinding> {
        self.this.upgrade().map(|inner| LocBinding { inner })
    }
}
