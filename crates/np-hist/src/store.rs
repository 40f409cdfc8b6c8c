//! Histogram containers and the openers that produce them.
//!
//! A container is a named bag of histograms (one analysis output file). The
//! collection engine only needs two capabilities from it: open a container by
//! locator, and fetch a named histogram out of it. A container that cannot be
//! opened is an error of the opener; a missing object is `None` from
//! [`Container::get`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use np_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;

/// An opened container of named histograms.
pub trait Container: Send + Sync {
    /// Independent copy of the named histogram, or `None` if absent.
    fn get(&self, name: &str) -> Option<Histogram>;

    /// Names of all objects in the container.
    fn keys(&self) -> Vec<String>;
}

/// Opens containers by locator.
pub trait ContainerOpener: Send + Sync {
    /// Open the container at `path`.
    ///
    /// Fails with [`Error::Resource`] if the container is missing or corrupted.
    fn open(&self, path: &str) -> Result<Box<dyn Container>>;
}

impl Container for BTreeMap<String, Histogram> {
    fn get(&self, name: &str) -> Option<Histogram> {
        BTreeMap::get(self, name).cloned()
    }

    fn keys(&self) -> Vec<String> {
        BTreeMap::keys(self).cloned().collect()
    }
}

/// Shared, read-only object map handed out by [`MemoryStore`].
struct SharedObjects(Arc<BTreeMap<String, Histogram>>);

impl Container for SharedObjects {
    fn get(&self, name: &str) -> Option<Histogram> {
        self.0.get(name).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

/// In-memory container store.
///
/// Paths map to object maps; paths marked corrupted fail to open the way a
/// zombie file would. Open attempts are counted per path.
#[derive(Default)]
pub struct MemoryStore {
    containers: HashMap<String, Option<Arc<BTreeMap<String, Histogram>>>>,
    opens: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `histogram` into the container at `path` under `name`.
    pub fn insert(&mut self, path: impl Into<String>, name: impl Into<String>, histogram: Histogram) {
        let entry =
            self.containers.entry(path.into()).or_insert_with(|| Some(Arc::new(BTreeMap::new())));
        match entry {
            Some(objects) => {
                Arc::make_mut(objects).insert(name.into(), histogram);
            }
            None => {
                tracing::warn!("ignoring insert into a container marked corrupted");
            }
        }
    }

    /// Builder form of [`MemoryStore::insert`].
    pub fn with(mut self, path: impl Into<String>, name: impl Into<String>, h: Histogram) -> Self {
        self.insert(path, name, h);
        self
    }

    /// Make `path` fail to open, dropping anything stored there.
    pub fn mark_corrupted(&mut self, path: impl Into<String>) {
        self.containers.insert(path.into(), None);
    }

    /// Number of open attempts made for `path`.
    pub fn open_count(&self, path: &str) -> usize {
        let opens = self.opens.lock().unwrap_or_else(PoisonError::into_inner);
        opens.get(path).copied().unwrap_or(0)
    }
}

impl ContainerOpener for MemoryStore {
    fn open(&self, path: &str) -> Result<Box<dyn Container>> {
        {
            let mut opens = self.opens.lock().unwrap_or_else(PoisonError::into_inner);
            *opens.entry(path.to_string()).or_default() += 1;
        }
        match self.containers.get(path) {
            Some(Some(objects)) => Ok(Box::new(SharedObjects(Arc::clone(objects)))),
            Some(None) => Err(Error::resource(path, "container is corrupted")),
            None => Err(Error::resource(path, "no such container")),
        }
    }
}

/// On-disk layout read by [`JsonFileOpener`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct JsonContainer {
    /// Histograms keyed by object path (e.g. `nominal/mumu/hPt`).
    pub objects: BTreeMap<String, Histogram>,
}

impl JsonContainer {
    /// Read a container file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the container as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Opens JSON container files relative to a base directory.
#[derive(Debug, Clone)]
pub struct JsonFileOpener {
    base_dir: PathBuf,
}

impl JsonFileOpener {
    /// Create an opener resolving relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ContainerOpener for JsonFileOpener {
    fn open(&self, path: &str) -> Result<Box<dyn Container>> {
        let full = self.base_dir.join(path);
        tracing::debug!(path = %full.display(), "reading JSON container");
        let container = JsonContainer::read(&full).map_err(|e| Error::resource(path, e))?;
        Ok(Box::new(container.objects))
    }
}
