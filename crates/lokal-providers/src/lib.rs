#![forbid(unsafe_code)]

//! Built-in resource providers for lokal.
//!
//! - [`EmbeddedResourceProvider`]: tables registered in memory, keyed by
//!   assembly and `{dictionary}-{culture}` resource name.
//! - [`DelimitedTextProvider`]: `;`-delimited files named
//!   `{base}.{culture}.{ext}` on disk.
//!
//! Both implement [`lokal_core::ResourceProvider`] and are interchangeable
//! at runtime; neither is privileged by the binding layer.

pub mod config;
pub mod delimited;
pub mod embedded;
pub mod table;

pub use config::{DelimitedTextConfig, EmbeddedConfig, ProviderConfigError, ProvidersConfig};
pub use delimited::DelimitedTextProvider;
pub use embedded::EmbeddedResourceProvider;
pub use table::Table;
