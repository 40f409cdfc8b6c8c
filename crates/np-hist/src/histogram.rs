//! 1D binned histogram used throughout nextplot.
//!
//! Bin indices follow the ROOT convention: bin `0` is the underflow, bins
//! `1..=n_bins` are the regular bins and bin `n_bins + 1` is the overflow.

use np_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Relative tolerance when comparing bin edges of two histograms.
const EDGE_RTOL: f64 = 1e-10;

/// A 1D histogram with under/overflow and optional per-bin sum of squared weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramRepr", into = "HistogramRepr")]
pub struct Histogram {
    name: String,
    title: String,
    /// Bin edges (length = n_bins + 1).
    edges: Vec<f64>,
    /// Bin contents including flows (length = n_bins + 2).
    content: Vec<f64>,
    /// Sum of weights squared including flows, if tracked.
    sumw2: Option<Vec<f64>>,
    entries: f64,
}

impl Histogram {
    /// Create an empty histogram with the given bin edges.
    pub fn new(name: impl Into<String>, edges: Vec<f64>) -> Result<Self> {
        validate_edges(&edges)?;
        let n = edges.len() - 1;
        Ok(Self {
            name: name.into(),
            title: String::new(),
            edges,
            content: vec![0.0; n + 2],
            sumw2: None,
            entries: 0.0,
        })
    }

    /// Create an empty histogram with `n_bins` equal-width bins on `[x_min, x_max)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::InvariantViolation("histogram needs at least one bin".into()));
        }
        let width = (x_max - x_min) / n_bins as f64;
        let edges = (0..=n_bins).map(|i| x_min + width * i as f64).collect();
        Self::new(name, edges)
    }

    /// Create a histogram from regular-bin contents (flows start at zero).
    pub fn from_contents(
        name: impl Into<String>,
        edges: Vec<f64>,
        contents: &[f64],
    ) -> Result<Self> {
        let mut h = Self::new(name, edges)?;
        if contents.len() != h.n_bins() {
            return Err(Error::IncompatibleHistograms(format!(
                "{} contents for {} bins",
                contents.len(),
                h.n_bins()
            )));
        }
        h.content[1..=contents.len()].copy_from_slice(contents);
        h.entries = contents.len() as f64;
        Ok(h)
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the histogram.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Histogram title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the histogram title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Number of regular bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// All bin edges.
    pub fn bin_edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of bin `i` (`1..=n_bins + 1`; the overflow starts at `x_max`).
    pub fn bin_low_edge(&self, i: usize) -> Option<f64> {
        if i == 0 { None } else { self.edges.get(i - 1).copied() }
    }

    /// Regular-bin contents (without flows).
    pub fn bin_contents(&self) -> &[f64] {
        &self.content[1..=self.n_bins()]
    }

    /// Content of bin `i`. Out-of-range indices read as zero.
    pub fn bin_content(&self, i: usize) -> f64 {
        self.content.get(i).copied().unwrap_or(0.0)
    }

    /// Overwrite the content of bin `i`.
    pub fn set_bin_content(&mut self, i: usize, value: f64) -> Result<()> {
        let n = self.n_bins();
        let slot = self.content.get_mut(i).ok_or_else(|| out_of_range(i, n))?;
        *slot = value;
        Ok(())
    }

    /// Statistical error of bin `i`.
    ///
    /// Uses the stored sum of squared weights when present, Poisson
    /// (`sqrt(|content|)`) otherwise.
    pub fn bin_error(&self, i: usize) -> f64 {
        match &self.sumw2 {
            Some(w2) => w2.get(i).copied().unwrap_or(0.0).sqrt(),
            None => self.bin_content(i).abs().sqrt(),
        }
    }

    /// Overwrite the error of bin `i` (stored as its square).
    pub fn set_bin_error(&mut self, i: usize, error: f64) -> Result<()> {
        let n = self.n_bins();
        if i > n + 1 {
            return Err(out_of_range(i, n));
        }
        self.ensure_sumw2()[i] = error * error;
        Ok(())
    }

    /// Whether per-bin sums of squared weights are tracked.
    pub fn has_sumw2(&self) -> bool {
        self.sumw2.is_some()
    }

    /// Number of entries.
    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Set the number of entries.
    pub fn set_entries(&mut self, entries: f64) {
        self.entries = entries;
    }

    /// Sum of the regular bins.
    pub fn integral(&self) -> f64 {
        self.bin_contents().iter().sum()
    }

    /// Sum of bins `first..=last`, clamped to the valid range including flows.
    pub fn integral_range(&self, first: usize, last: usize) -> f64 {
        let last = last.min(self.n_bins() + 1);
        if first > last {
            return 0.0;
        }
        self.content[first..=last].iter().sum()
    }

    /// Multiply every bin (flows included) by `factor`; errors scale by `|factor|`.
    pub fn scale(&mut self, factor: f64) {
        if factor != 1.0 {
            self.ensure_sumw2();
        }
        for c in &mut self.content {
            *c *= factor;
        }
        if let Some(w2) = &mut self.sumw2 {
            let f2 = factor * factor;
            for w in w2 {
                *w *= f2;
            }
        }
    }

    /// Divide every bin (flows included) by `divisor`; errors scale by `1 / |divisor|`.
    ///
    /// Contents stay finite for subnormal divisors, where `1.0 / divisor` overflows.
    pub fn divide(&mut self, divisor: f64) {
        if divisor != 1.0 {
            self.ensure_sumw2();
        }
        for c in &mut self.content {
            *c /= divisor;
        }
        if let Some(w2) = &mut self.sumw2 {
            for w in w2 {
                *w = *w / divisor / divisor;
            }
        }
    }

    /// Bin-wise addition of another histogram with identical binning.
    pub fn add(&mut self, other: &Histogram) -> Result<()> {
        self.check_compatible(other)?;
        if self.sumw2.is_some() || other.sumw2.is_some() {
            let other_w2 = other.sumw2_or_poisson();
            for (w, o) in self.ensure_sumw2().iter_mut().zip(other_w2) {
                *w += o;
            }
        }
        for (c, o) in self.content.iter_mut().zip(&other.content) {
            *c += o;
        }
        self.entries += other.entries;
        Ok(())
    }

    /// Whether `other` has the same binning as `self`.
    pub fn is_compatible(&self, other: &Histogram) -> bool {
        self.edges.len() == other.edges.len()
            && self.edges.iter().zip(&other.edges).all(|(a, b)| {
                let scale = a.abs().max(b.abs()).max(1.0);
                (a - b).abs() <= EDGE_RTOL * scale
            })
    }

    /// Error unless `other` has the same binning as `self`.
    pub fn check_compatible(&self, other: &Histogram) -> Result<()> {
        if self.is_compatible(other) {
            return Ok(());
        }
        Err(Error::IncompatibleHistograms(format!(
            "'{}' has {} bins on [{}, {}], '{}' has {} bins on [{}, {}]",
            self.name,
            self.n_bins(),
            self.x_min(),
            self.x_max(),
            other.name,
            other.n_bins(),
            other.x_min(),
            other.x_max()
        )))
    }

    /// Merge every `group` consecutive regular bins into one.
    pub fn rebin(&mut self, group: usize) -> Result<()> {
        let n = self.n_bins();
        if group == 0 || n % group != 0 {
            return Err(Error::Configuration(format!(
                "cannot merge {} bins in groups of {}",
                n, group
            )));
        }
        if group == 1 {
            return Ok(());
        }
        let new_n = n / group;
        let edges: Vec<f64> = self.edges.iter().step_by(group).copied().collect();
        let merge = |v: &[f64]| {
            let mut out = Vec::with_capacity(new_n + 2);
            out.push(v[0]);
            out.extend(v[1..=n].chunks(group).map(|c| c.iter().sum::<f64>()));
            out.push(v[n + 1]);
            out
        };
        self.content = merge(&self.content);
        self.sumw2 = self.sumw2.as_deref().map(merge);
        self.edges = edges;
        Ok(())
    }

    fn ensure_sumw2(&mut self) -> &mut Vec<f64> {
        let content = &self.content;
        self.sumw2.get_or_insert_with(|| content.iter().map(|c| c.abs()).collect())
    }

    fn sumw2_or_poisson(&self) -> Vec<f64> {
        match &self.sumw2 {
            Some(w2) => w2.clone(),
            None => self.content.iter().map(|c| c.abs()).collect(),
        }
    }
}

fn validate_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::InvariantViolation(format!(
            "histogram needs at least two bin edges, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::InvariantViolation(
            "bin edges must be finite and strictly increasing".into(),
        ));
    }
    Ok(())
}

fn out_of_range(i: usize, n_bins: usize) -> Error {
    Error::InvariantViolation(format!("bin {} outside 0..={}", i, n_bins + 1))
}

/// Serialized form: regular bins plus explicit flows.
#[derive(Serialize, Deserialize)]
struct HistogramRepr {
    name: String,
    #[serde(default)]
    title: String,
    bin_edges: Vec<f64>,
    bin_content: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sumw2: Option<Vec<f64>>,
    #[serde(default)]
    underflow: f64,
    #[serde(default)]
    overflow: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    underflow_sumw2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overflow_sumw2: Option<f64>,
    #[serde(default)]
    entries: f64,
}

impl TryFrom<HistogramRepr> for Histogram {
    type Error = Error;

    fn try_from(r: HistogramRepr) -> Result<Self> {
        let mut h = Histogram::new(r.name, r.bin_edges)?;
        let n = h.n_bins();
        if r.bin_content.len() != n {
            return Err(Error::IncompatibleHistograms(format!(
                "'{}': {} contents for {} bins",
                h.name,
                r.bin_content.len(),
                n
            )));
        }
        h.title = r.title;
        h.entries = r.entries;
        h.content[0] = r.underflow;
        h.content[1..=n].copy_from_slice(&r.bin_content);
        h.content[n + 1] = r.overflow;
        if let Some(w2) = r.sumw2 {
            if w2.len() != n {
                return Err(Error::IncompatibleHistograms(format!(
                    "'{}': {} sumw2 values for {} bins",
                    h.name,
                    w2.len(),
                    n
                )));
            }
            let mut full = Vec::with_capacity(n + 2);
            full.push(r.underflow_sumw2.unwrap_or(r.underflow.abs()));
            full.extend(w2);
            full.push(r.overflow_sumw2.unwrap_or(r.overflow.abs()));
            h.sumw2 = Some(full);
        }
        Ok(h)
    }
}

impl From<Histogram> for HistogramRepr {
    fn from(h: Histogram) -> Self {
        let n = h.n_bins();
        let (sumw2, underflow_sumw2, overflow_sumw2) = match &h.sumw2 {
            Some(w2) => (Some(w2[1..=n].to_vec()), Some(w2[0]), Some(w2[n + 1])),
            None => (None, None, None),
        };
        HistogramRepr {
            bin_content: h.content[1..=n].to_vec(),
            underflow: h.content[0],
            overflow: h.content[n + 1],
            sumw2,
            underflow_sumw2,
            overflow_sumw2,
            entries: h.entries,
            name: h.name,
            title: h.title,
            bin_edges: h.edges,
        }
    }
}
