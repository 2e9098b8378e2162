#![forbid(unsafe_code)]

//! Core types for lokal: key addressing, cultures, and the provider contract.
//!
//! # Role in lokal
//! `lokal-core` holds the pure, thread-safe pieces of the localization
//! layer. It knows how to parse a key string into an address, how cultures
//! fall back to their parents, and what a resource provider must offer.
//!
//! # How it fits in the system
//! Provider implementations (`lokal-providers`) implement
//! [`ResourceProvider`]. The binding runtime (`lokal-runtime`) parses keys,
//! resolves ambient defaults, and queries providers. Nothing here depends on
//! a UI toolkit or on the single-threaded runtime.

pub mod address;
pub mod culture;
pub mod provider;
pub mod value;

pub use address::{KeyAddress, ParseError, ResolvedAddress, SegmentKind};
pub use culture::{Culture, CultureError, CultureSet, FallbackChain};
pub use provider::{
    CulturePublisher, LookupRequest, Probe, ProviderError, ProviderEvent, ProviderEvents,
    ProviderSubscription, ResourceProvider, not_found_error, resolve_with_fallback,
    resource_name,
};
pub use value::ResourceValue;
