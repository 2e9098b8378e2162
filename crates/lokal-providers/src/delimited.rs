#![forbid(unsafe_code)]

//! Provider over delimited text files on disk.
//!
//! # File naming
//!
//! | Culture | File |
//! |---------|------|
//! | specific (`de-AT`) | `{directory}/{base}.de-AT.{ext}` |
//! | invariant | `{directory}/{base}.{ext}` |
//!
//! `base` is the address's dictionary when it has one, otherwise the
//! configured `base_name`. Inside a file, see [`crate::table`] for the row
//! format.
//!
//! # Concurrency
//!
//! Reads go through a parsed-file cache behind an `RwLock`. A lookup holds
//! the config read lock for its whole fallback walk, so every table it
//! caches was parsed under the settings current at insertion. Configuration
//! setters take the config write lock, clear the cache, rescan the
//! directory, publish the new culture set, and only then emit
//! `ProviderChanged`. Events are emitted with no lock held.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | File for a culture level missing | That level is a miss; path listed in the error |
//! | File unreadable (permissions, bad UTF-8) | Same as a miss, reason included |
//! | Directory unreadable during scan | Empty culture set, `warn!` logged |

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use ahash::AHashMap;
use lokal_core::{
    Culture, CulturePublisher, CultureSet, LookupRequest, Probe, ProviderEvent, ProviderEvents,
    ResourceProvider, ResourceValue, not_found_error, resolve_with_fallback,
};

use crate::config::DelimitedTextConfig;
use crate::table::Table;

/// File-backed provider for `;`-delimited key/value files.
pub struct DelimitedTextProvider {
    name: String,
    config: RwLock<DelimitedTextConfig>,
    cache: RwLock<AHashMap<PathBuf, Arc<Table>>>,
    cultures: CulturePublisher,
    events: ProviderEvents,
}

impl std::fmt::Debug for DelimitedTextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelimitedTextProvider")
            .field("name", &self.name)
            .field("config", &self.config())
            .finish_non_exhaustive()
    }
}

impl DelimitedTextProvider {
    /// Create a provider and scan its directory for available cultures.
    #[must_use]
    pub fn new(name: impl Into<String>, config: DelimitedTextConfig) -> Self {
        let provider = Self {
            name: name.into(),
            config: RwLock::new(config),
            cache: RwLock::new(AHashMap::new()),
            cultures: CulturePublisher::default(),
            events: ProviderEvents::new(),
        };
        provider.rescan();
        provider
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn config(&self) -> DelimitedTextConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole configuration.
    pub fn set_config(&self, config: DelimitedTextConfig) {
        self.reconfigure(|current| *current = config);
    }

    /// Change the file base name (`Strings` for `Strings.de.csv`).
    pub fn set_base_name(&self, base_name: impl Into<String>) {
        let base_name = base_name.into();
        self.reconfigure(|config| config.base_name = base_name);
    }

    /// Change the directory holding resource files.
    pub fn set_directory(&self, directory: impl Into<PathBuf>) {
        let directory = directory.into();
        self.reconfigure(|config| config.directory = directory);
    }

    /// Toggle header-row skipping.
    pub fn set_has_header(&self, has_header: bool) {
        self.reconfigure(|config| config.has_header = has_header);
    }

    /// Drop cached files so the next lookup re-reads from disk.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Re-read the directory and announce `ProviderChanged`.
    pub fn reload(&self) {
        self.reconfigure(|_| {});
    }

    /// Path of the file backing `base` at `culture`.
    #[must_use]
    pub fn file_path(&self, base: &str, culture: &Culture) -> PathBuf {
        file_path(&self.config(), base, culture)
    }

    fn reconfigure(&self, change: impl FnOnce(&mut DelimitedTextConfig)) {
        {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut config);
            self.clear_cache();
        }
        self.rescan();
        self.events
            .emit(&ProviderEvent::ProviderChanged { context: None });
    }

    fn rescan(&self) {
        let config = self.config();
        let cultures = scan_cultures(&config);
        self.cultures.publish(cultures);
    }

    fn load_table(&self, path: &Path, config: &DelimitedTextConfig) -> io::Result<Option<Arc<Table>>> {
        if let Some(table) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(Some(Arc::clone(table)));
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let table = Arc::new(Table::parse(&text, config.delimiter, config.has_header));
        tracing::debug!(path = %path.display(), rows = table.len(), "loaded delimited resource file");
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), Arc::clone(&table));
        Ok(Some(table))
    }
}

impl ResourceProvider for DelimitedTextProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_localized(&self, request: LookupRequest<'_>) -> Option<ResourceValue> {
        let key = request.address.key.as_str();
        let result = {
            // Held for the whole walk so a reconfigure cannot clear the cache
            // while a table parsed under the old settings is still in flight.
            let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
            let base = request
                .address
                .dictionary
                .as_deref()
                .unwrap_or(&config.base_name);

            resolve_with_fallback(request.culture, |candidate| {
                let path = file_path(&config, base, candidate);
                match self.load_table(&path, &config) {
                    Ok(Some(table)) => match table.get(key) {
                        Some(value) => Probe::Found(ResourceValue::Text(value.to_string())),
                        None => Probe::Missing {
                            location: format!("{} (key absent)", path.display()),
                        },
                    },
                    Ok(None) => Probe::Missing {
                        location: format!("{} (no such file)", path.display()),
                    },
                    Err(err) => Probe::Missing {
                        location: format!("{} (unreadable: {err})", path.display()),
                    },
                }
            })
        };

        match result {
            Ok(value) => Some(value),
            Err(attempted) => {
                let error = not_found_error(&request, &attempted);
                tracing::debug!(provider = %self.name, key, "delimited lookup failed");
                self.events.emit(&ProviderEvent::ProviderError(error));
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

fn file_path(config: &DelimitedTextConfig, base: &str, culture: &Culture) -> PathBuf {
    let file = if culture.is_invariant() {
        format!("{base}.{}", config.extension)
    } else {
        format!("{base}.{}.{}", culture.name(), config.extension)
    };
    config.directory.join(file)
}

fn scan_cultures(config: &DelimitedTextConfig) -> CultureSet {
    let entries = match std::fs::read_dir(&config.directory) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(
                directory = %config.directory.display(),
                error = %err,
                "cannot scan resource directory"
            );
            return CultureSet::new();
        }
    };

    let invariant_file = format!("{}.{}", config.base_name, config.extension);
    let prefix = format!("{}.", config.base_name);
    let suffix = format!(".{}", config.extension);

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|file| {
            if file == invariant_file {
                return Some(Culture::invariant());
            }
            let middle = file.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
            Culture::parse(middle)
                .ok()
                .filter(|culture| !culture.is_invariant())
        })
        .collect()
}
