//! Ordered group of sources combined into one normalized histogram.

use std::sync::Arc;

use np_core::{Error, Result};
use np_hist::Histogram;

use crate::entry::Retrieve;
use crate::policy::NormalizationPolicy;
use crate::source::{Source, SumOfWeightsLocator};

/// A titled, ordered group of [`Source`]s.
#[derive(Debug, Clone)]
pub struct Collection {
    title: String,
    sum_of_weights: Option<SumOfWeightsLocator>,
    sources: Vec<Arc<Source>>,
    scale_factor: f64,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), sum_of_weights: None, sources: Vec::new(), scale_factor: 1.0 }
    }

    /// Set where the sum of weights of every source is found.
    pub fn with_sum_of_weights(mut self, locator: SumOfWeightsLocator) -> Self {
        self.sum_of_weights = Some(locator);
        self
    }

    /// Multiply the combined result by `scale_factor`.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Append a source. Duplicates are kept.
    pub fn add_source(&mut self, source: Arc<Source>) {
        self.sources.push(source);
    }

    /// Append several sources in order.
    pub fn add_sources(&mut self, sources: impl IntoIterator<Item = Arc<Source>>) {
        self.sources.extend(sources);
    }

    /// Append all sources of `other` (flattening, not nesting).
    pub fn merge(&mut self, other: &Collection) {
        self.sources.extend(other.sources.iter().cloned());
    }

    /// Collection title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Sum-of-weights locator, if any.
    pub fn sum_of_weights_locator(&self) -> Option<&SumOfWeightsLocator> {
        self.sum_of_weights.as_ref()
    }

    /// Scale factor applied to the combined result.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Sources in insertion order.
    pub fn sources(&self) -> &[Arc<Source>] {
        &self.sources
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the collection has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Combine `object_name` from all sources.
    ///
    /// `inherited` is the sum-of-weights locator of an enclosing composite; the
    /// collection's own locator takes precedence.
    pub(crate) fn retrieve_with(
        &self,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
        inherited: Option<&SumOfWeightsLocator>,
    ) -> Result<Option<Histogram>> {
        if self.sources.is_empty() {
            tracing::error!(collection = %self.title, "collection is empty");
            return Err(Error::EmptyCollection(self.title.clone()));
        }

        let locator = self.sum_of_weights.as_ref().or(inherited);
        if policy.by_sum_of_weights() && locator.is_none() {
            tracing::error!(collection = %self.title, "sum-of-weights normalization without a locator");
            return Err(Error::Configuration(format!(
                "collection '{}' is normalized by sum of weights but has no sum-of-weights locator",
                self.title
            )));
        }

        let mut total: Option<Histogram> = None;
        for source in &self.sources {
            let Some(mut h) = source.fetch(object_name, skip_bad)? else {
                tracing::warn!(
                    collection = %self.title,
                    source = source.name(),
                    object = object_name,
                    "source skipped"
                );
                continue;
            };

            if policy.by_cross_section() {
                h.scale(source.cross_section());
            }
            if let (true, Some(loc)) = (policy.by_sum_of_weights(), locator) {
                h.divide(source.sum_of_weights(loc)?);
            }
            if policy.by_luminosity() {
                h.scale(source.luminosity());
            }

            match &mut total {
                Some(t) => t.add(&h)?,
                None => total = Some(h),
            }
        }

        let Some(mut total) = total else {
            tracing::warn!(collection = %self.title, object = object_name, "no source contributed");
            return Ok(None);
        };

        if self.scale_factor != 1.0 {
            total.scale(self.scale_factor);
        }
        if policy.to_unit_integral() {
            normalize_to_unit(&mut total, &self.title);
        }
        total.set_title(&self.title);
        Ok(Some(total))
    }
}

impl Retrieve for Collection {
    fn retrieve(
        &self,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
    ) -> Result<Option<Histogram>> {
        self.retrieve_with(object_name, policy, skip_bad, None)
    }
}

/// Divide `h` by its integral; a zero integral leaves it untouched.
pub(crate) fn normalize_to_unit(h: &mut Histogram, owner: &str) {
    let integral = h.integral();
    if integral == 0.0 {
        tracing::warn!(collection = owner, "integral is zero, result left unnormalized");
        return;
    }
    h.divide(integral);
}
