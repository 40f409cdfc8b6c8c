//! Named collections and composites, plus the catalog of known sources.
//!
//! A `Registry` is an explicit value built by the analysis setup code and
//! passed to whatever needs it; there is no process-wide registry.

use std::sync::Arc;

use indexmap::IndexMap;
use np_core::{Error, Result};
use np_hist::Histogram;

use crate::collection::Collection;
use crate::composite::CompositeCollection;
use crate::entry::{Entry, Retrieve};
use crate::policy::NormalizationPolicy;
use crate::source::Source;

/// What [`Registry::compose_by_name`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeOutcome {
    /// Whether a composite was inserted.
    pub inserted: bool,
    /// Component keys that resolved, in order.
    pub resolved: Vec<String>,
    /// Component keys that were not registered.
    pub missing: Vec<String>,
}

/// Key → collection/composite namespace with a source catalog.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<String, Entry>,
    sources: IndexMap<String, Arc<Source>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single source as a one-element collection keyed by its name.
    pub fn add_source(&mut self, source: Arc<Source>) -> bool {
        let key = source.name().to_string();
        let mut collection = Collection::new(key.clone());
        collection.add_source(source);
        self.insert_entry(key, collection.into())
    }

    /// Insert a collection. An existing key is kept and the conflict logged.
    pub fn insert_collection(&mut self, key: impl Into<String>, collection: Collection) -> bool {
        self.insert_entry(key.into(), collection.into())
    }

    /// Insert a composite. An existing key is kept and the conflict logged.
    pub fn insert_composite(
        &mut self,
        key: impl Into<String>,
        composite: CompositeCollection,
    ) -> bool {
        self.insert_entry(key.into(), composite.into())
    }

    fn insert_entry(&mut self, key: String, entry: Entry) -> bool {
        if let Some(existing) = self.entries.get(&key) {
            tracing::error!(
                key = %key,
                existing_kind = existing.kind(),
                existing_size = existing.len(),
                rejected_kind = entry.kind(),
                "key already registered, keeping the existing entry"
            );
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Build a composite from registered entries and insert it under `key`.
    ///
    /// Unlike plain inserts, an existing `key` is an [`Error::DuplicateKey`].
    /// Unknown component keys are skipped with a warning; if none resolve,
    /// nothing is inserted.
    pub fn compose_by_name<I, S>(
        &mut self,
        key: &str,
        title: &str,
        component_keys: I,
        scale_factor: f64,
    ) -> Result<ComposeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let composite = CompositeCollection::new(title).with_scale_factor(scale_factor);
        self.compose_with(key, composite, component_keys)
    }

    /// [`Registry::compose_by_name`] starting from a preconfigured, empty composite.
    pub fn compose_with<I, S>(
        &mut self,
        key: &str,
        mut composite: CompositeCollection,
        component_keys: I,
    ) -> Result<ComposeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(existing) = self.entries.get(key) {
            tracing::error!(key, existing_kind = existing.kind(), "composite key already registered");
            return Err(Error::DuplicateKey(key.to_string()));
        }

        let mut outcome = ComposeOutcome::default();
        for name in component_keys {
            let name = name.as_ref();
            match self.entries.get(name) {
                Some(entry) => {
                    composite.add(entry.clone());
                    outcome.resolved.push(name.to_string());
                }
                None => {
                    tracing::warn!(key, component = name, "component not registered, skipping");
                    outcome.missing.push(name.to_string());
                }
            }
        }

        if composite.is_empty() {
            tracing::debug!(key, "no component resolved, nothing inserted");
            return Ok(outcome);
        }
        outcome.inserted = self.insert_entry(key.to_string(), composite.into());
        Ok(outcome)
    }

    /// Entry registered under `key`.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Whether `key` is registered.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Retrieve the entry under `key`.
    pub fn retrieve(
        &self,
        key: &str,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
    ) -> Result<Option<Histogram>> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?
            .retrieve(object_name, policy, skip_bad)
    }

    /// Registered keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a source to the catalog. A duplicate name keeps the old source.
    pub fn register_source(&mut self, source: Arc<Source>) -> bool {
        if let Some(old) = self.sources.get(source.name()) {
            tracing::warn!(
                source = source.name(),
                old_path = old.path(),
                new_path = source.path(),
                "source already registered, keeping old"
            );
            return false;
        }
        self.sources.insert(source.name().to_string(), source);
        true
    }

    /// Catalog source named `name`.
    pub fn source(&self, name: &str) -> Option<&Arc<Source>> {
        self.sources.get(name)
    }

    /// Catalog sources in registration order.
    pub fn sources(&self) -> impl Iterator<Item = &Arc<Source>> {
        self.sources.values()
    }

    /// Look up catalog sources by name, failing on the first unknown one.
    pub fn sources_by_name<I, S>(&self, names: I) -> Result<Vec<Arc<Source>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|n| {
                let n = n.as_ref();
                self.sources.get(n).cloned().ok_or_else(|| {
                    tracing::error!(source = n, "source not registered");
                    Error::UnknownKey(n.to_string())
                })
            })
            .collect()
    }

    /// New collection titled `title` holding the named catalog sources.
    pub fn collection_from_sources<I, S>(&self, title: &str, names: I) -> Result<Collection>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collection = Collection::new(title);
        collection.add_sources(self.sources_by_name(names)?);
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use np_hist::MemoryStore;
    use tracing_test::traced_test;

    fn h(contents: &[f64]) -> Histogram {
        let edges = (0..=contents.len()).map(|i| i as f64).collect();
        Histogram::from_contents("h", edges, contents).unwrap()
    }

    fn registry() -> Registry {
        let store = Arc::new(
            MemoryStore::new()
                .with("a.root", "x", h(&[1.0, 2.0]))
                .with("b.root", "x", h(&[10.0, 20.0])),
        );
        let mut r = Registry::new();
        r.add_source(Arc::new(Source::new("a", "a.root", store.clone())));
        r.add_source(Arc::new(Source::new("b", "b.root", store)));
        r
    }

    #[test]
    fn add_source_wraps_in_singleton_collection() {
        let r = registry();
        let entry = r.get("a").unwrap();
        assert_eq!(entry.kind(), "collection");
        assert_eq!(entry.len(), 1);
        assert_eq!(entry.title(), "a");
        let out = r.retrieve("a", "x", &NormalizationPolicy::none(), false).unwrap().unwrap();
        assert_eq!(out.bin_contents(), &[1.0, 2.0]);
    }

    #[test]
    #[traced_test]
    fn duplicate_insert_keeps_old_entry() {
        let mut r = registry();
        assert!(!r.insert_collection("a", Collection::new("other")));
        assert!(!r.insert_composite("a", CompositeCollection::new("other")));
        assert_eq!(r.get("a").unwrap().title(), "a");
        assert_eq!(r.len(), 2);
        assert!(logs_contain("ERROR"));
        assert!(logs_contain("key already registered, keeping the existing entry"));
        assert!(logs_contain("rejected_kind=\"composite\""));
    }

    #[test]
    #[traced_test]
    fn compose_skips_missing_components() {
        let mut r = registry();
        let outcome = r.compose_by_name("X", "title", ["a", "missing", "b"], 1.0).unwrap();
        assert!(outcome.inserted);
        assert_eq!(outcome.resolved, vec!["a", "b"]);
        assert_eq!(outcome.missing, vec!["missing"]);
        assert!(logs_contain("WARN"));
        assert!(logs_contain("component not registered, skipping"));
        assert!(logs_contain("component=\"missing\""));

        let entry = r.get("X").unwrap();
        assert_eq!(entry.kind(), "composite");
        assert_eq!(entry.len(), 2);
        let out = r.retrieve("X", "x", &NormalizationPolicy::none(), false).unwrap().unwrap();
        assert_eq!(out.bin_contents(), &[11.0, 22.0]);
        assert_eq!(out.title(), "title");
    }

    #[test]
    #[traced_test]
    fn compose_is_strict_on_existing_key() {
        let mut r = registry();
        let err = r.compose_by_name("a", "t", ["b"], 1.0).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(ref k) if k == "a"));
        assert!(logs_contain("composite key already registered"));
    }

    #[test]
    fn compose_with_nothing_resolved_inserts_nothing() {
        let mut r = registry();
        let outcome = r.compose_by_name("Y", "t", ["nope", "nada"], 1.0).unwrap();
        assert!(!outcome.inserted);
        assert!(outcome.resolved.is_empty());
        assert!(!r.contains_key("Y"));
    }

    #[test]
    fn composites_can_nest_by_name() {
        let mut r = registry();
        r.compose_by_name("ab", "ab", ["a", "b"], 2.0).unwrap();
        r.compose_by_name("all", "all", ["ab", "a"], 1.0).unwrap();
        let out = r.retrieve("all", "x", &NormalizationPolicy::none(), false).unwrap().unwrap();
        assert_eq!(out.bin_contents(), &[23.0, 46.0]);
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "b", "ab", "all"]);
    }

    #[test]
    fn unknown_key_on_retrieve() {
        let r = registry();
        assert!(matches!(
            r.retrieve("zzz", "x", &NormalizationPolicy::none(), false),
            Err(Error::UnknownKey(_))
        ));
    }

    #[test]
    fn source_catalog_builds_collections() {
        let store = Arc::new(MemoryStore::new().with("a.root", "x", h(&[1.0])));
        let mut r = Registry::new();
        assert!(r.register_source(Arc::new(Source::new("a", "a.root", store.clone()))));
        assert!(!r.register_source(Arc::new(Source::new("a", "other.root", store.clone()))));
        assert_eq!(r.source("a").unwrap().path(), "a.root");

        let c = r.collection_from_sources("twice", ["a", "a"]).unwrap();
        assert_eq!(c.len(), 2);
        assert!(Arc::ptr_eq(&c.sources()[0], &c.sources()[1]));

        assert!(matches!(
            r.collection_from_sources("bad", ["a", "nope"]),
            Err(Error::UnknownKey(ref k)) if k == "nope"
        ));
    }
}
