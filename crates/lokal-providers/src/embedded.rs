#![forbid(unsafe_code)]

//! Provider over resource tables compiled into (or registered with) the
//! running program.
//!
//! Tables are keyed by `(assembly, "{dictionary}-{culture}")`, the same
//! naming a satellite-resource layout uses, and enumerated directly to find
//! available cultures. Typical use is `include_str!` of a delimited file per
//! culture:
//!
//! ```
//! use lokal_core::{Culture, LookupRequest, ResolvedAddress, ResourceProvider};
//! use lokal_providers::EmbeddedResourceProvider;
//!
//! let provider = EmbeddedResourceProvider::new("app");
//! provider.add_table_str("App", "Strings", Culture::invariant(), "Title;Hello", false);
//! provider.add_table_str("App", "Strings", Culture::parse("de").unwrap(), "Title;Hallo", false);
//!
//! let addr = ResolvedAddress::new(Some("App"), Some("Strings"), "Title");
//! let de_at = Culture::parse("de-AT").unwrap();
//! let value = provider.get_localized(LookupRequest::new(&addr, &de_at));
//! assert_eq!(value.unwrap().as_text(), Some("Hallo"));
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | No assembly in address or config | `None` + one `ProviderError` |
//! | Key missing at every culture level | `None` + one `ProviderError` listing tables tried |

use std::sync::{PoisonError, RwLock};

use ahash::AHashMap;
use lokal_core::{
    Culture, CulturePublisher, CultureSet, LookupRequest, Probe, ProviderEvent, ProviderEvents,
    ResourceProvider, ResourceValue, not_found_error, resolve_with_fallback, resource_name,
};

use crate::config::EmbeddedConfig;
use crate::table::{DEFAULT_DELIMITER, Table};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TableId {
    assembly: String,
    resource: String,
}

#[derive(Debug, Default)]
struct ResourceTable {
    culture: Culture,
    entries: AHashMap<String, ResourceValue>,
    /// Lowercased key → original key, for `ignore_case` lookups.
    folded: AHashMap<String, String>,
}

impl ResourceTable {
    fn new(culture: Culture) -> Self {
        Self {
            culture,
            ..Self::default()
        }
    }

    fn insert(&mut self, key: String, value: ResourceValue) {
        self.folded
            .entry(key.to_lowercase())
            .or_insert_with(|| key.clone());
        self.entries.insert(key, value);
    }

    fn get(&self, key: &str, ignore_case: bool) -> Option<&ResourceValue> {
        self.entries.get(key).or_else(|| {
            if ignore_case {
                self.folded
                    .get(&key.to_lowercase())
                    .and_then(|original| self.entries.get(original))
            } else {
                None
            }
        })
    }
}

/// In-memory, table-backed provider.
pub struct EmbeddedResourceProvider {
    name: String,
    config: RwLock<EmbeddedConfig>,
    tables: RwLock<AHashMap<TableId, ResourceTable>>,
    cultures: CulturePublisher,
    events: ProviderEvents,
}

impl std::fmt::Debug for EmbeddedResourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedResourceProvider")
            .field("name", &self.name)
            .field("tables", &self.table_count())
            .finish_non_exhaustive()
    }
}

impl EmbeddedResourceProvider {
    /// Create an empty provider with default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, EmbeddedConfig::default())
    }

    /// Create an empty provider with explicit configuration.
    #[must_use]
    pub fn with_config(name: impl Into<String>, config: EmbeddedConfig) -> Self {
        Self {
            name: name.into(),
            config: RwLock::new(config),
            tables: RwLock::new(AHashMap::new()),
            cultures: CulturePublisher::default(),
            events: ProviderEvents::new(),
        }
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn config(&self) -> EmbeddedConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the configuration and announce `ProviderChanged`.
    pub fn set_config(&self, config: EmbeddedConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self.announce_changed(None);
    }

    /// Set the assembly used when an address leaves it unset.
    pub fn set_default_assembly(&self, assembly: Option<&str>) {
        let mut config = self.config();
        config.default_assembly = assembly.map(str::to_string);
        self.set_config(config);
    }

    /// Toggle case-insensitive key matching.
    pub fn set_ignore_case(&self, ignore_case: bool) {
        let mut config = self.config();
        config.ignore_case = ignore_case;
        self.set_config(config);
    }

    /// Register entries for one `(assembly, dictionary, culture)` table,
    /// merging into any existing table. Announces `ProviderChanged`.
    pub fn add_resource<K, V>(
        &self,
        assembly: &str,
        dictionary: &str,
        culture: Culture,
        entries: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<ResourceValue>,
    {
        {
            let mut tables = self.write_tables();
            let id = TableId {
                assembly: assembly.to_string(),
                resource: resource_name(dictionary, &culture),
            };
            let table = tables
                .entry(id)
                .or_insert_with(|| ResourceTable::new(culture));
            for (key, value) in entries {
                table.insert(key.into(), value.into());
            }
        }
        self.announce_changed(Some(assembly));
    }

    /// Register a table from `;`-delimited text (e.g. via `include_str!`).
    pub fn add_table_str(
        &self,
        assembly: &str,
        dictionary: &str,
        culture: Culture,
        text: &str,
        has_header: bool,
    ) {
        let table = Table::parse(text, DEFAULT_DELIMITER, has_header);
        self.add_resource(assembly, dictionary, culture, table.rows());
    }

    /// Drop one table. Returns whether it existed.
    pub fn remove_resource(&self, assembly: &str, dictionary: &str, culture: &Culture) -> bool {
        let removed = self
            .write_tables()
            .remove(&TableId {
                assembly: assembly.to_string(),
                resource: resource_name(dictionary, culture),
            })
            .is_some();
        if removed {
            self.announce_changed(Some(assembly));
        }
        removed
    }

    /// Drop every table. Announces `ProviderChanged` if anything was removed.
    pub fn clear(&self) {
        let removed = {
            let mut tables = self.write_tables();
            let had_tables = !tables.is_empty();
            tables.clear();
            had_tables
        };
        if removed {
            self.announce_changed(None);
        }
    }

    /// Change one entry and announce `ValueChanged` for its key.
    pub fn set_value(
        &self,
        assembly: &str,
        dictionary: &str,
        culture: Culture,
        key: &str,
        value: impl Into<ResourceValue>,
    ) {
        let value = value.into();
        let tag = culture.name().to_string();
        let created = {
            let mut tables = self.write_tables();
            let id = TableId {
                assembly: assembly.to_string(),
                resource: resource_name(dictionary, &culture),
            };
            let created = !tables.contains_key(&id);
            tables
                .entry(id)
                .or_insert_with(|| ResourceTable::new(culture))
                .insert(key.to_string(), value.clone());
            created
        };
        if created {
            self.republish_cultures();
        }
        self.events.emit(&ProviderEvent::ValueChanged {
            key: key.to_string(),
            value: Some(value),
            tag: Some(tag),
        });
    }

    /// Number of registered tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn write_tables(&self) -> std::sync::RwLockWriteGuard<'_, AHashMap<TableId, ResourceTable>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn republish_cultures(&self) {
        let cultures: CultureSet = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|table| table.culture.clone())
            .collect();
        self.cultures.publish(cultures);
    }

    fn announce_changed(&self, context: Option<&str>) {
        self.republish_cultures();
        self.events.emit(&ProviderEvent::ProviderChanged {
            context: context.map(str::to_string),
        });
    }

    fn report(&self, error: lokal_core::ProviderError) {
        tracing::debug!(provider = %self.name, key = %error.key, "embedded lookup failed");
        self.events.emit(&ProviderEvent::ProviderError(error));
    }
}

impl ResourceProvider for EmbeddedResourceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_localized(&self, request: LookupRequest<'_>) -> Option<ResourceValue> {
        let config = self.config();
        let address = request.address;

        let Some(assembly) = address
            .assembly
            .as_deref()
            .or(config.default_assembly.as_deref())
        else {
            self.report(not_found_error(
                &request,
                &["<no assembly given and no default assembly configured>".to_string()],
            ));
            return None;
        };
        let dictionary = address
            .dictionary
            .as_deref()
            .unwrap_or(&config.default_dictionary);

        let result = {
            let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
            resolve_with_fallback(request.culture, |candidate| {
                let resource = resource_name(dictionary, candidate);
                let id = TableId {
                    assembly: assembly.to_string(),
                    resource,
                };
                match tables
                    .get(&id)
                    .and_then(|table| table.get(&address.key, config.ignore_case))
                {
                    Some(value) => Probe::Found(value.clone()),
                    None => Probe::Missing {
                        location: format!("{}/{}", id.assembly, id.resource),
                    },
                }
            })
        };

        match result {
            Ok(value) => Some(value),
            Err(attempted) => {
                self.report(not_found_error(&request, &attempted));
                None
            }
        }
    }

    fn available_cultures(&self) -> CultureSet {
        self.cultures.load()
    }

    fn events(&self) -> &ProviderEvents {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lokal_core::ResolvedAddress;
    use std::sync::{Arc, Mutex};

    fn culture(name: &str) -> Culture {
        Culture::parse(name).unwrap()
    }

    fn provider() -> EmbeddedResourceProvider {
        let p = EmbeddedResourceProvider::new("test");
        p.add_resource("App", "Strings", Culture::invariant(), [
            ("Title", "Hello"),
            ("OnlyRoot", "Root"),
        ]);
        p.add_resource("App", "Strings", culture("de"), [("Title", "Hallo")]);
        p.add_resource("App", "Strings", culture("de-AT"), [("Title", "Servus")]);
        p
    }

    fn capture_errors(p: &EmbeddedResourceProvider) -> (Arc<Mutex<Vec<String>>>, lokal_core::ProviderSubscription) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let sub = p.events().subscribe(move |event| {
            if let ProviderEvent::ProviderError(err) = event {
                sink.lock().unwrap().push(err.message.clone());
            }
        });
        (errors, sub)
    }

    fn get(p: &EmbeddedResourceProvider, addr: &ResolvedAddress, c: &str) -> Option<String> {
        let c = culture(c);
        p.get_localized(LookupRequest::new(addr, &c))
            .map(|v| v.to_string())
    }

    #[test]
    fn walks_fallback_chain() {
        let p = provider();
        let addr = ResolvedAddress::new(Some("App"), Some("Strings"), "Title");
        assert_eq!(get(&p, &addr, "de-AT").as_deref(), Some("Servus"));
        assert_eq!(get(&p, &addr, "de-DE").as_deref(), Some("Hallo"));
        assert_eq!(get(&p, &addr, "fr").as_deref(), Some("Hello"));
    }

    #[test]
    fn invariant_only_key_resolves_without_error() {
        let p = provider();
        let (errors, _sub) = capture_errors(&p);
        let addr = ResolvedAddress::new(Some("App"), Some("Strings"), "OnlyRoot");
        assert_eq!(get(&p, &addr, "de-AT").as_deref(), Some("Root"));
        assert!(errors.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_key_fires_exactly_one_error() {
        let p = provider();
        let (errors, _sub) = capture_errors(&p);
        let addr = ResolvedAddress::new(Some("App"), Some("Strings"), "Nope");
        assert_eq!(get(&p, &addr, "de-AT"), None);
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("App/Strings-de-AT"));
        assert!(errors[0].contains("App/Strings-de,"));
        assert!(errors[0].ends_with("App/Strings"));
    }

    #[test]
    fn defaults_fill_unset_segments() {
        let p = EmbeddedResourceProvider::new("test");
        p.add_resource("App", "Resources", Culture::invariant(), [("k", "v")]);
        let addr = ResolvedAddress::new(None, None, "k");
        assert_eq!(get(&p, &addr, "en"), None);

        p.set_default_assembly(Some("App"));
        assert_eq!(get(&p, &addr, "en").as_deref(), Some("v"));
    }

    #[test]
    fn ignore_case_matches_folded_keys() {
        let p = provider();
        let addr = ResolvedAddress::new(Some("App"), Some("Strings"), "title");
        assert_eq!(get(&p, &addr, "de"), None);
        p.set_ignore_case(true);
        assert_eq!(get(&p, &addr, "de").as_deref(), Some("Hallo"));
    }

    #[test]
    fn available_cultures_enumerate_tables() {
        let p = provider();
        let names: Vec<String> = p
            .available_cultures()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["", "de", "de-AT"]);
        assert!(p.remove_resource("App", "Strings", &culture("de-AT")));
        assert_eq!(p.available_cultures().len(), 2);
    }

    #[test]
    fn clear_drops_all_tables_and_announces_once() {
        let p = provider();
        let changes = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&changes);
        let _sub = p.events().subscribe(move |event| {
            if matches!(event, ProviderEvent::ProviderChanged { .. }) {
                *sink.lock().unwrap() += 1;
            }
        });
        p.clear();
        p.clear();
        assert_eq!(p.table_count(), 0);
        assert!(p.available_cultures().is_empty());
        assert_eq!(*changes.lock().unwrap(), 1);
    }

    #[test]
    fn set_value_emits_value_changed() {
        let p = provider();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = p.events().subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        p.set_value("App", "Strings", culture("de"), "Title", "Grüß Gott");
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[ProviderEvent::ValueChanged {
                key: "Title".into(),
                value: Some("Grüß Gott".into()),
                tag: Some("de".into()),
            }]
        );
    }

    #[test]
    fn cultures_published_before_provider_changed() {
        let p = Arc::new(EmbeddedResourceProvider::new("test"));
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        let weak = Arc::downgrade(&p);
        let _sub = p.events().subscribe(move |event| {
            if matches!(event, ProviderEvent::ProviderChanged { .. }) {
                if let Some(p) = weak.upgrade() {
                    *sink.lock().unwrap() = Some(p.available_cultures().len());
                }
            }
        });
        p.add_resource("App", "Strings", culture("fr"), [("k", "v")]);
        assert_eq!(*observed.lock().unwrap(), Some(1));
    }
}
