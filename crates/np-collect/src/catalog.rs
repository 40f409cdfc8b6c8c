//! Sample catalog: a YAML (or JSON) description of sources, collections and
//! composites that builds a [`Registry`].
//!
//! ```yaml
//! base_dir: histos
//! cross_section_files: [xsec/XS_DY_mc16.csv]
//! missing_cross_section: one
//! sum_of_weights: { object_name: nominal/sumOfWeight_nominal, bin_index: 2 }
//! sources:
//!   - { name: data15, path: data15.json }
//!   - { name: "600702.mc16a", path: dy_a.json, sample_id: "600702", luminosity: 36.2 }
//! collections:
//!   - { key: data, title: Data, sources: [data15] }
//!   - { key: dy, title: Drell-Yan, sources: ["600702.mc16a"], sum_of_weights: true }
//! composites:
//!   - { key: bkg, title: Background, members: [dy] }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use np_core::{Error, Result};
use np_hist::{ContainerOpener, JsonFileOpener};
use serde::Deserialize;

use crate::composite::CompositeCollection;
use crate::registry::Registry;
use crate::source::{Source, SumOfWeightsLocator};
use crate::xsection::{MissingCrossSection, XsectionTable};

/// Parsed catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Directory source paths are relative to.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Cross-section tables, read in order.
    #[serde(default)]
    pub cross_section_files: Vec<PathBuf>,
    /// Behavior for sample ids missing from the tables.
    #[serde(default)]
    pub missing_cross_section: MissingCrossSection,
    /// Analysis-wide sum-of-weights locator.
    #[serde(default)]
    pub sum_of_weights: Option<SumOfWeightsLocator>,
    /// Source definitions.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Collection definitions.
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,
    /// Composite definitions, composed in order.
    #[serde(default)]
    pub composites: Vec<CompositeSpec>,
    /// Directory of the catalog file; relative paths resolve against it.
    #[serde(skip)]
    origin: PathBuf,
}

/// One source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    /// Source name (catalog key).
    pub name: String,
    /// Container path, relative to `base_dir`.
    pub path: String,
    /// Sample id looked up in the cross-section tables.
    #[serde(default)]
    pub sample_id: Option<String>,
    /// Explicit cross-section; wins over the table.
    #[serde(default)]
    pub cross_section: Option<f64>,
    /// Luminosity.
    #[serde(default = "one")]
    pub luminosity: f64,
}

/// Sum-of-weights setting of a collection or composite.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LocatorSpec {
    /// `true` uses the catalog-wide locator, `false` none.
    Global(bool),
    /// Explicit locator.
    Explicit(SumOfWeightsLocator),
}

/// One collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionSpec {
    /// Registry key.
    pub key: String,
    /// Display title (defaults to the key).
    #[serde(default)]
    pub title: Option<String>,
    /// Catalog source names.
    pub sources: Vec<String>,
    /// Sum-of-weights locator.
    #[serde(default)]
    pub sum_of_weights: Option<LocatorSpec>,
    /// Scale factor of the combined result.
    #[serde(default = "one")]
    pub scale_factor: f64,
}

/// One composite.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeSpec {
    /// Registry key.
    pub key: String,
    /// Display title (defaults to the key).
    #[serde(default)]
    pub title: Option<String>,
    /// Registry keys of members; unknown keys are skipped.
    pub members: Vec<String>,
    /// Scale factor.
    #[serde(default = "one")]
    pub scale_factor: f64,
    /// Default locator for members without one.
    #[serde(default)]
    pub sum_of_weights: Option<LocatorSpec>,
}

fn one() -> f64 {
    1.0
}

impl Catalog {
    /// Read a catalog file. Relative paths inside resolve against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading catalog");
        let bytes = std::fs::read(path)?;
        let mut catalog: Catalog = serde_yaml_ng::from_slice(&bytes)?;
        catalog.origin = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(catalog)
    }

    /// Parse catalog text; relative paths resolve against the working directory.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Resolve `path` against the catalog directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.origin.join(path)
    }

    /// Directory the sources live in.
    pub fn source_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => self.resolve(dir),
            None => self.origin.clone(),
        }
    }

    /// Opener for JSON containers under [`Catalog::source_dir`].
    pub fn json_opener(&self) -> JsonFileOpener {
        JsonFileOpener::new(self.source_dir())
    }

    /// Build a registry: sources, then collections, then composites.
    pub fn build(&self, opener: Arc<dyn ContainerOpener>) -> Result<Registry> {
        let mut xs_table = XsectionTable::new();
        for file in &self.cross_section_files {
            xs_table.add_file(&self.resolve(file))?;
        }

        let mut registry = Registry::new();
        for spec in &self.sources {
            let cross_section = match (spec.cross_section, &spec.sample_id) {
                (Some(xs), _) => xs,
                (None, Some(id)) => xs_table.cross_section(id, self.missing_cross_section)?,
                (None, None) => 1.0,
            };
            let source = Source::new(&spec.name, &spec.path, Arc::clone(&opener))
                .with_cross_section(cross_section)
                .with_luminosity(spec.luminosity);
            registry.register_source(Arc::new(source));
        }

        for spec in &self.collections {
            let title = spec.title.as_deref().unwrap_or(&spec.key);
            let mut collection = registry
                .collection_from_sources(title, &spec.sources)?
                .with_scale_factor(spec.scale_factor);
            if let Some(locator) = self.locator(spec.sum_of_weights.as_ref(), &spec.key)? {
                collection = collection.with_sum_of_weights(locator);
            }
            registry.insert_collection(spec.key.as_str(), collection);
        }

        for spec in &self.composites {
            let title = spec.title.as_deref().unwrap_or(&spec.key);
            let mut composite = CompositeCollection::new(title).with_scale_factor(spec.scale_factor);
            if let Some(locator) = self.locator(spec.sum_of_weights.as_ref(), &spec.key)? {
                composite = composite.with_sum_of_weights(locator);
            }
            registry.compose_with(&spec.key, composite, &spec.members)?;
        }

        tracing::info!(
            sources = self.sources.len(),
            entries = registry.len(),
            "catalog registry built"
        );
        Ok(registry)
    }

    fn locator(&self, spec: Option<&LocatorSpec>, key: &str) -> Result<Option<SumOfWeightsLocator>> {
        match spec {
            None | Some(LocatorSpec::Global(false)) => Ok(None),
            Some(LocatorSpec::Explicit(locator)) => Ok(Some(locator.clone())),
            Some(LocatorSpec::Global(true)) => match &self.sum_of_weights {
                Some(locator) => Ok(Some(locator.clone())),
                None => Err(Error::Configuration(format!(
                    "'{}' uses the catalog sum-of-weights locator, but none is defined",
                    key
                ))),
            },
        }
    }
}
