#![forbid(unsafe_code)]

//! Live localization bindings for lokal.
//!
//! # Role in lokal
//! `lokal-runtime` is the single-threaded half of the system. It owns the
//! ambient culture, the bindings that turn keys into property values, and
//! the broadcast that refreshes every bound property when the culture
//! changes.
//!
//! # How it fits in the system
//! Bindings parse keys with `lokal-core`, query any
//! [`ResourceProvider`](lokal_core::ResourceProvider) (for example those in
//! `lokal-providers`), and write results into objects implementing
//! [`LocalizedTarget`]. The UI toolkit only has to implement that trait.
//!
//! ```
//! use std::any::Any;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use lokal_core::ResourceValue;
//! use lokal_runtime::{
//!     CultureContext, LocBinding, LocalizedTarget, PropertyError, PropertyToken, TargetProperty,
//! };
//!
//! #[derive(Default)]
//! struct Label {
//!     text: RefCell<String>,
//! }
//!
//! impl LocalizedTarget for Label {
//!     fn set_native(&self, _token: &PropertyToken, value: &ResourceValue) -> Result<(), PropertyError> {
//!         *self.text.borrow_mut() = value.to_string();
//!         Ok(())
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! let ctx = CultureContext::new();
//! let label = Rc::new(Label::default());
//! let target: Rc<dyn LocalizedTarget> = label.clone();
//! let binding = LocBinding::new(&ctx, "Greeting").unwrap();
//! binding.bind(&target, TargetProperty::native("Text"));
//! // No provider configured: the default fallback text is shown.
//! assert_eq!(*label.text.borrow(), "Key: Greeting");
//! ```

pub mod binding;
pub mod config;
pub mod context;
pub mod fallback;
pub mod lifetime;
pub mod registry;
pub mod target;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use binding::LocBinding;
pub use config::{CULTURE_ENV_VAR, ConfigError, LocalizeConfig, detect_culture};
pub use context::{BroadcastState, CultureContext, CultureListener, ListenerId};
pub use fallback::{FallbackBehavior, MissingKeyArgs};
pub use lifetime::{DEFAULT_SWEEP_THRESHOLD, LifetimeTracker};
pub use registry::{BindingEntry, BindingRegistry, PushReport};
pub use target::{
    LocalizedTarget, PropertyError, PropertyToken, ReflectedProperty, TargetProperty,
    inherited_default,
};
