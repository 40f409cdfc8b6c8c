//! Ratio helpers for data/prediction panels.
//!
//! The denominator is treated as exact: only the numerator's errors are
//! propagated into the ratio.

use np_core::{Error, Result};

use crate::histogram::Histogram;

/// Divide `num` in place by `den`, bin by bin over the regular bins.
///
/// Bins where the denominator is zero are set to zero content and zero error.
pub fn divide_ratio(num: &mut Histogram, den: &Histogram) -> Result<()> {
    if num.n_bins() != den.n_bins() {
        tracing::error!(num = num.name(), den = den.name(), "incompatible histograms in ratio");
        return Err(Error::IncompatibleHistograms(format!(
            "ratio of '{}' ({} bins) over '{}' ({} bins)",
            num.name(),
            num.n_bins(),
            den.name(),
            den.n_bins()
        )));
    }

    for i in 1..=num.n_bins() {
        let d = den.bin_content(i);
        let (value, error) =
            if d != 0.0 { (num.bin_content(i) / d, num.bin_error(i) / d) } else { (0.0, 0.0) };
        num.set_bin_content(i, value)?;
        num.set_bin_error(i, error)?;
    }
    Ok(())
}

/// Copy of `num` divided by `den`, named `<num>_<suffix>`.
pub fn ratio(num: &Histogram, den: &Histogram, suffix: &str) -> Result<Histogram> {
    let mut out = num.clone();
    out.set_name(format!("{}_{}", num.name(), suffix));
    divide_ratio(&mut out, den)?;
    Ok(out)
}
