//! A single histogram-bearing data source (one analysis output file).

use std::fmt;
use std::sync::{Arc, OnceLock};

use np_core::{Error, Result};
use np_hist::{Container, ContainerOpener, Histogram};
use serde::{Deserialize, Serialize};

/// Where the sum of generator weights of a sample is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SumOfWeightsLocator {
    /// Name of the bookkeeping histogram.
    pub object_name: String,
    /// Bin holding the sum of weights (ROOT numbering, `0` is the underflow).
    pub bin_index: usize,
}

impl SumOfWeightsLocator {
    /// Create a locator.
    pub fn new(object_name: impl Into<String>, bin_index: usize) -> Self {
        Self { object_name: object_name.into(), bin_index }
    }
}

/// One physical source of histograms.
///
/// The container behind `path` is opened on first use and kept for the
/// lifetime of the source; a failed open is remembered and never retried.
/// The sum of weights is read once and cached.
pub struct Source {
    name: String,
    path: String,
    cross_section: f64,
    luminosity: f64,
    opener: Arc<dyn ContainerOpener>,
    /// `Some(None)` records a failed open.
    container: OnceLock<Option<Box<dyn Container>>>,
    sum_of_weights: OnceLock<f64>,
}

impl Source {
    /// Create a source with cross-section and luminosity of 1.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        opener: Arc<dyn ContainerOpener>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            cross_section: 1.0,
            luminosity: 1.0,
            opener,
            container: OnceLock::new(),
            sum_of_weights: OnceLock::new(),
        }
    }

    /// Set the cross-section.
    pub fn with_cross_section(mut self, cross_section: f64) -> Self {
        self.cross_section = cross_section;
        self
    }

    /// Set the luminosity.
    pub fn with_luminosity(mut self, luminosity: f64) -> Self {
        self.luminosity = luminosity;
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container locator.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cross-section scale factor.
    pub fn cross_section(&self) -> f64 {
        self.cross_section
    }

    /// Luminosity scale factor.
    pub fn luminosity(&self) -> f64 {
        self.luminosity
    }

    /// Whether an open was attempted.
    pub fn is_open(&self) -> bool {
        self.container.get().is_some()
    }

    /// Whether the container was opened successfully.
    pub fn is_valid(&self) -> bool {
        matches!(self.container.get(), Some(Some(_)))
    }

    /// Sum of weights, if already computed.
    pub fn cached_sum_of_weights(&self) -> Option<f64> {
        self.sum_of_weights.get().copied()
    }

    /// Open the container if not done yet and report whether it is usable.
    ///
    /// The first failure is returned as [`Error::Resource`] unless `skip_bad`
    /// is set, in which case `Ok(false)` is returned. Later calls only report
    /// the cached validity.
    pub fn open(&self, skip_bad: bool) -> Result<bool> {
        let mut failure = None;
        let container = self.container.get_or_init(|| match self.opener.open(&self.path) {
            Ok(c) => {
                tracing::info!(source = %self.name, path = %self.path, "opened source container");
                Some(c)
            }
            Err(e) => {
                tracing::error!(source = %self.name, path = %self.path, error = %e, "problem opening source container");
                failure = Some(e);
                None
            }
        });

        match (container, failure) {
            (Some(_), _) => Ok(true),
            (None, Some(e)) if !skip_bad => Err(e),
            (None, _) => Ok(false),
        }
    }

    /// Fetch an independent copy of the named histogram.
    ///
    /// An unusable container yields `Ok(None)` with `skip_bad` and
    /// [`Error::Resource`] without. A missing object in a usable container is
    /// always [`Error::MissingObject`].
    pub fn fetch(&self, object_name: &str, skip_bad: bool) -> Result<Option<Histogram>> {
        self.open(skip_bad)?;

        let Some(container) = self.container.get().and_then(Option::as_ref) else {
            if skip_bad {
                tracing::warn!(source = %self.name, object = object_name, "skipping unusable source");
                return Ok(None);
            }
            return Err(Error::resource(&self.path, "container could not be opened"));
        };

        match container.get(object_name) {
            Some(h) => Ok(Some(h)),
            None => {
                tracing::error!(source = %self.name, object = object_name, "object does not exist in source");
                Err(Error::MissingObject {
                    object: object_name.to_string(),
                    source_name: self.name.clone(),
                })
            }
        }
    }

    /// Sum of weights read from the bookkeeping histogram named by `locator`.
    ///
    /// Computed on first call and cached; the locator of later calls is not
    /// consulted again. A non-positive value is an
    /// [`Error::InvariantViolation`] and is not cached.
    pub fn sum_of_weights(&self, locator: &SumOfWeightsLocator) -> Result<f64> {
        if let Some(&cached) = self.sum_of_weights.get() {
            return Ok(cached);
        }

        let histogram = self.fetch(&locator.object_name, false)?.ok_or_else(|| {
            Error::resource(&self.path, "container could not be opened")
        })?;
        let value = histogram.bin_content(locator.bin_index);
        if value.is_nan() || value <= 0.0 {
            tracing::error!(
                source = %self.name,
                object = %locator.object_name,
                bin = locator.bin_index,
                value,
                "non-positive sum of weights"
            );
            return Err(Error::InvariantViolation(format!(
                "sum of weights of '{}' is {} ('{}', bin {}), expected a positive value",
                self.name, value, locator.object_name, locator.bin_index
            )));
        }

        tracing::debug!(source = %self.name, sum_of_weights = value, "sum of weights cached");
        Ok(*self.sum_of_weights.get_or_init(|| value))
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("cross_section", &self.cross_section)
            .field("luminosity", &self.luminosity)
            .field("is_open", &self.is_open())
            .field("is_valid", &self.is_valid())
            .field("sum_of_weights", &self.cached_sum_of_weights())
            .finish()
    }
}
