//! # np-hist
//!
//! Binned histograms and the containers they are read from.
//!
//! ## Example
//!
//! ```
//! use np_hist::{ContainerOpener, Histogram, MemoryStore};
//!
//! let h = Histogram::from_contents("hPt", vec![0.0, 10.0, 20.0], &[3.0, 1.0]).unwrap();
//! let store = MemoryStore::new().with("ttbar.root", "nominal/hPt", h);
//!
//! let container = store.open("ttbar.root").unwrap();
//! let pt = container.get("nominal/hPt").unwrap();
//! assert_eq!(pt.integral(), 4.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod histogram;
pub mod ratio;
pub mod store;

pub use histogram::Histogram;
pub use ratio::{divide_ratio, ratio};
pub use store::{Container, ContainerOpener, JsonContainer, JsonFileOpener, MemoryStore};
