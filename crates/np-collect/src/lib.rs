//! # np-collect
//!
//! Combine histograms from many sources into normalized, plot-ready results.
//!
//! A [`Source`] is one file. A [`Collection`] sums the same object over its
//! sources, optionally weighting each by cross-section, luminosity and
//! inverse sum of generator weights. A [`CompositeCollection`] sums
//! collections (or other composites) and applies its own scale factor.
//! A [`Registry`] names them so they can be referenced by key.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use np_collect::{Collection, NormalizationPolicy, Retrieve, Source, SumOfWeightsLocator};
//! use np_hist::{Histogram, MemoryStore};
//!
//! let h = Histogram::from_contents("hPt", vec![0.0, 1.0, 2.0], &[2.0, 6.0]).unwrap();
//! let sow = Histogram::from_contents("sow", vec![0.0, 1.0], &[4.0]).unwrap();
//! let store = Arc::new(MemoryStore::new().with("tt.root", "hPt", h).with("tt.root", "sow", sow));
//!
//! let mut ttbar = Collection::new("ttbar").with_sum_of_weights(SumOfWeightsLocator::new("sow", 1));
//! ttbar.add_source(Arc::new(Source::new("tt", "tt.root", store).with_cross_section(2.0)));
//!
//! let out = ttbar.retrieve("hPt", &NormalizationPolicy::simulation(), false).unwrap().unwrap();
//! assert_eq!(out.bin_contents(), &[1.0, 3.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod collection;
pub mod composite;
pub mod entry;
pub mod policy;
pub mod registry;
pub mod source;
pub mod xsection;

pub use catalog::{Catalog, CollectionSpec, CompositeSpec, LocatorSpec, SourceSpec};
pub use collection::Collection;
pub use composite::CompositeCollection;
pub use entry::{Entry, Retrieve};
pub use policy::NormalizationPolicy;
pub use registry::{ComposeOutcome, Registry};
pub use source::{Source, SumOfWeightsLocator};
pub use xsection::{CrossSection, MissingCrossSection, XsectionTable};
