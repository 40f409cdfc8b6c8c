//! # np-core
//!
//! Shared error type for the nextplot crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};
