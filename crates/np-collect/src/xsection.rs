//! Cross-section lookup tables.
//!
//! Tables are comma-separated text files with one sample per line:
//!
//! ```text
//! # SampleID, xsec [pb], k-factor, filter eff., ...
//! 600702, 1950.5, 1.0, 0.25, ...
//! ```
//!
//! Only the first four columns are used but a line needs at least seven
//! columns to count. `NULL` in a numeric column reads as 1.

use std::collections::HashMap;
use std::path::Path;

use np_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Minimum number of comma-separated columns for a data line.
const MIN_COLUMNS: usize = 7;

/// Cross-section record of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSection {
    /// Raw cross-section.
    pub xs: f64,
    /// Higher-order correction factor.
    pub k_factor: f64,
    /// Generator filter efficiency.
    pub filter_efficiency: f64,
}

impl CrossSection {
    /// Effective cross-section: `xs * k_factor * filter_efficiency`.
    pub fn value(&self) -> f64 {
        self.xs * self.k_factor * self.filter_efficiency
    }
}

/// What to do when a sample id is not in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCrossSection {
    /// Use 1.0 and log a warning.
    One,
    /// Fail with [`Error::UnknownKey`].
    #[default]
    Fail,
}

/// Sample id → cross-section table, filled from one or more files.
#[derive(Debug, Clone, Default)]
pub struct XsectionTable {
    entries: HashMap<String, CrossSection>,
}

impl XsectionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read several files in order; later files override earlier ids.
    pub fn add_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<usize> {
        let mut added = 0;
        for p in paths {
            added += self.add_file(p.as_ref())?;
        }
        Ok(added)
    }

    /// Read one file. Returns the number of records read.
    pub fn add_file(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        let added = self.add_str(&text, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), records = added, "cross-section file read");
        Ok(added)
    }

    /// Parse table text. `origin` is only used in messages.
    pub fn add_str(&mut self, text: &str, origin: &str) -> Result<usize> {
        let mut added = 0;
        for (lineno, line) in text.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') || line.contains("SampleID") {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < MIN_COLUMNS {
                continue;
            }

            let id = fields[0].trim();
            let at = format!("{}:{}", origin, lineno + 1);
            let record = CrossSection {
                xs: parse_value(fields[1], id, "cross-section", &at)?,
                k_factor: parse_value(fields[2], id, "k-factor", &at)?,
                filter_efficiency: parse_value(fields[3], id, "filter efficiency", &at)?,
            };
            self.entries.insert(id.to_string(), record);
            added += 1;
        }
        Ok(added)
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, id: impl Into<String>, record: CrossSection) {
        self.entries.insert(id.into(), record);
    }

    /// Record for `id`.
    pub fn get(&self, id: &str) -> Option<&CrossSection> {
        self.entries.get(id)
    }

    /// Effective cross-section of `id`.
    pub fn cross_section(&self, id: &str, missing: MissingCrossSection) -> Result<f64> {
        match (self.entries.get(id), missing) {
            (Some(record), _) => Ok(record.value()),
            (None, MissingCrossSection::One) => {
                tracing::warn!(sample = id, "sample not in any cross-section file, using 1");
                Ok(1.0)
            }
            (None, MissingCrossSection::Fail) => {
                tracing::error!(sample = id, "sample not in any cross-section file");
                Err(Error::UnknownKey(format!("cross-section of sample '{}'", id)))
            }
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_value(raw: &str, id: &str, what: &str, at: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw == "NULL" {
        tracing::warn!(sample = id, column = what, location = at, "value is NULL, using 1");
        return Ok(1.0);
    }
    raw.parse::<f64>()
        .map_err(|e| Error::Parse(format!("{}: {} of sample '{}' ('{}'): {}", at, what, id, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: &str = "\
# SampleID, xsec, kfactor, filteff, uncUp, uncDown, generator
SampleID,crossSection,kFactor,genFiltEff,x,y,z

600702, 2000.0, 1.1, 0.5, 0, 0, PP8
363753,NULL, 1.0, 0.2, 0, 0, HW7
short, 1.0, 1.0
";

    #[test]
    fn parses_records_and_skips_noise() {
        let mut t = XsectionTable::new();
        assert_eq!(t.add_str(TABLE, "test").unwrap(), 2);
        assert_eq!(t.len(), 2);
        assert_relative_eq!(t.cross_section("600702", MissingCrossSection::Fail).unwrap(), 1100.0);
        // NULL reads as one
        assert_relative_eq!(t.cross_section("363753", MissingCrossSection::Fail).unwrap(), 0.2);
        assert!(t.get("short").is_none());
    }

    #[test]
    fn missing_sample_modes() {
        let t = XsectionTable::new();
        assert_eq!(t.cross_section("1", MissingCrossSection::One).unwrap(), 1.0);
        assert!(matches!(
            t.cross_section("1", MissingCrossSection::Fail),
            Err(Error::UnknownKey(_))
        ));
    }

    #[test]
    fn bad_number_is_parse_error() {
        let mut t = XsectionTable::new();
        let err = t.add_str("1, abc, 1, 1, 0, 0, x\n", "bad.csv").unwrap_err();
        match err {
            Error::Parse(msg) => assert!(msg.starts_with("bad.csv:1"), "{}", msg),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn later_records_override() {
        let mut t = XsectionTable::new();
        t.add_str("7, 1.0, 1, 1, 0, 0, a\n", "a").unwrap();
        t.add_str("7, 3.0, 1, 1, 0, 0, b\n", "b").unwrap();
        assert_eq!(t.cross_section("7", MissingCrossSection::Fail).unwrap(), 3.0);
    }
}
