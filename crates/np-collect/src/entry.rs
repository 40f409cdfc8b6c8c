//! Registry entries: a collection or a composite, behind one retrieval interface.

use std::sync::Arc;

use np_core::Result;
use np_hist::Histogram;

use crate::collection::Collection;
use crate::composite::CompositeCollection;
use crate::policy::NormalizationPolicy;
use crate::source::SumOfWeightsLocator;

/// Anything that can produce a combined, normalized histogram.
pub trait Retrieve {
    /// Combine `object_name` under `policy`.
    ///
    /// `Ok(None)` means nothing contributed (every source was skipped under
    /// `skip_bad`).
    fn retrieve(
        &self,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
    ) -> Result<Option<Histogram>>;
}

/// A collection or a composite collection.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Plain group of sources.
    Collection(Arc<Collection>),
    /// Scaled group of entries.
    Composite(Arc<CompositeCollection>),
}

impl Entry {
    /// `"collection"` or `"composite"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Collection(_) => "collection",
            Entry::Composite(_) => "composite",
        }
    }

    /// Title of the wrapped collection.
    pub fn title(&self) -> &str {
        match self {
            Entry::Collection(c) => c.title(),
            Entry::Composite(c) => c.title(),
        }
    }

    /// Number of direct constituents (sources or members).
    pub fn len(&self) -> usize {
        match self {
            Entry::Collection(c) => c.len(),
            Entry::Composite(c) => c.len(),
        }
    }

    /// Whether there are no direct constituents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn retrieve_with(
        &self,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
        inherited: Option<&SumOfWeightsLocator>,
    ) -> Result<Option<Histogram>> {
        match self {
            Entry::Collection(c) => c.retrieve_with(object_name, policy, skip_bad, inherited),
            Entry::Composite(c) => c.retrieve_with(object_name, policy, skip_bad, inherited),
        }
    }
}

impl Retrieve for Entry {
    fn retrieve(
        &self,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
    ) -> Result<Option<Histogram>> {
        self.retrieve_with(object_name, policy, skip_bad, None)
    }
}

impl From<Collection> for Entry {
    fn from(c: Collection) -> Self {
        Entry::Collection(Arc::new(c))
    }
}

impl From<CompositeCollection> for Entry {
    fn from(c: CompositeCollection) -> Self {
        Entry::Composite(Arc::new(c))
    }
}

impl From<Arc<Collection>> for Entry {
    fn from(c: Arc<Collection>) -> Self {
        Entry::Collection(c)
    }
}

impl From<Arc<CompositeCollection>> for Entry {
    fn from(c: Arc<CompositeCollection>) -> Self {
        Entry::Composite(c)
    }
}
