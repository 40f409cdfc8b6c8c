//! Normalization policy shared by collections and composites.

use serde::{Deserialize, Serialize};

/// Which scale factors to apply when combining sources.
///
/// Per-source factors are applied in a fixed order: cross-section, then
/// `1 / sum of weights`, then luminosity. Unit-integral normalization always
/// comes last, on the combined result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationPolicy {
    to_unit_integral: bool,
    by_luminosity: bool,
    by_cross_section: bool,
    by_sum_of_weights: bool,
}

impl NormalizationPolicy {
    /// No scaling at all.
    pub const fn none() -> Self {
        Self {
            to_unit_integral: false,
            by_luminosity: false,
            by_cross_section: false,
            by_sum_of_weights: false,
        }
    }

    /// Standard simulation weighting: cross-section × luminosity / sum of weights.
    pub const fn simulation() -> Self {
        Self::none().with_cross_section().with_sum_of_weights().with_luminosity()
    }

    /// Also normalize the combined result to unit integral.
    pub const fn with_unit_integral(mut self) -> Self {
        self.to_unit_integral = true;
        self
    }

    /// Also scale each source by its luminosity.
    pub const fn with_luminosity(mut self) -> Self {
        self.by_luminosity = true;
        self
    }

    /// Also scale each source by its cross-section.
    pub const fn with_cross_section(mut self) -> Self {
        self.by_cross_section = true;
        self
    }

    /// Also divide each source by its sum of weights.
    pub const fn with_sum_of_weights(mut self) -> Self {
        self.by_sum_of_weights = true;
        self
    }

    /// Same policy with unit-integral normalization cleared.
    pub const fn without_unit_integral(mut self) -> Self {
        self.to_unit_integral = false;
        self
    }

    /// Normalize the final result to unit integral.
    pub const fn to_unit_integral(&self) -> bool {
        self.to_unit_integral
    }

    /// Scale each source by its luminosity.
    pub const fn by_luminosity(&self) -> bool {
        self.by_luminosity
    }

    /// Scale each source by its cross-section.
    pub const fn by_cross_section(&self) -> bool {
        self.by_cross_section
    }

    /// Divide each source by its sum of weights.
    pub const fn by_sum_of_weights(&self) -> bool {
        self.by_sum_of_weights
    }

    /// Whether any flag is set.
    pub const fn is_noop(&self) -> bool {
        !(self.to_unit_integral
            || self.by_luminosity
            || self.by_cross_section
            || self.by_sum_of_weights)
    }
}
