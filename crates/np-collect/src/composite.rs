//! Recursive, scaled groups of collections.

use np_core::{Error, Result};
use np_hist::Histogram;

use crate::collection::normalize_to_unit;
use crate::entry::{Entry, Retrieve};
use crate::policy::NormalizationPolicy;
use crate::source::SumOfWeightsLocator;

/// A titled group of [`Entry`] members with its own scale factor.
///
/// Members are added as already-built entries, so a composite can never end up
/// containing itself.
#[derive(Debug, Clone)]
pub struct CompositeCollection {
    title: String,
    scale_factor: f64,
    sum_of_weights: Option<SumOfWeightsLocator>,
    members: Vec<Entry>,
}

impl CompositeCollection {
    /// Create an empty composite with scale factor 1.
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), scale_factor: 1.0, sum_of_weights: None, members: Vec::new() }
    }

    /// Multiply the combined result by `scale_factor`.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Default sum-of-weights locator for member collections that have none.
    pub fn with_sum_of_weights(mut self, locator: SumOfWeightsLocator) -> Self {
        self.sum_of_weights = Some(locator);
        self
    }

    /// Append a member.
    pub fn add(&mut self, member: impl Into<Entry>) {
        self.members.push(member.into());
    }

    /// Composite title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Default sum-of-weights locator, if any.
    pub fn sum_of_weights_locator(&self) -> Option<&SumOfWeightsLocator> {
        self.sum_of_weights.as_ref()
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[Entry] {
        &self.members
    }

    /// Number of direct members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn retrieve_with(
        &self,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
        inherited: Option<&SumOfWeightsLocator>,
    ) -> Result<Option<Histogram>> {
        if self.members.is_empty() {
            tracing::error!(composite = %self.title, "composite is empty");
            return Err(Error::EmptyCollection(self.title.clone()));
        }

        // Members combine raw; unit normalization happens once on the sum.
        let member_policy = policy.without_unit_integral();
        let locator = self.sum_of_weights.as_ref().or(inherited);

        let mut total: Option<Histogram> = None;
        for member in &self.members {
            let Some(h) = member.retrieve_with(object_name, &member_policy, skip_bad, locator)?
            else {
                tracing::warn!(composite = %self.title, member = member.title(), "member skipped");
                continue;
            };
            match &mut total {
                Some(t) => t.add(&h)?,
                None => total = Some(h),
            }
        }

        let Some(mut total) = total else {
            tracing::warn!(composite = %self.title, object = object_name, "no member contributed");
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

impl Retrieve for CompositeCollection {
    fn retrieve(
        &self,
        object_name: &str,
        policy: &NormalizationPolicy,
        skip_bad: bool,
    ) -> Result<Option<Histogram>> {
        self.retrieve_with(object_name, policy, skip_bad, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::source::Source;
    use approx::assert_relative_eq;
    use np_hist::MemoryStore;
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn h(contents: &[f64]) -> Histogram {
        let edges = (0..=contents.len()).map(|i| i as f64).collect();
        Histogram::from_contents("h", edges, contents).unwrap()
    }

    fn store() -> Arc<MemoryStore> {
        let mut s = MemoryStore::new()
            .with("a.root", "x", h(&[1.0, 3.0]))
            .with("a.root", "sow", h(&[2.0]))
            .with("b.root", "x", h(&[1.0, 1.0]))
            .with("b.root", "sow", h(&[4.0]))
            .with("z.root", "x", h(&[0.0, 0.0]));
        s.mark_corrupted("bad.root");
        Arc::new(s)
    }

    fn single(title: &str, path: &str, s: &Arc<MemoryStore>) -> Collection {
        let mut c = Collection::new(title);
        c.add_source(Arc::new(Source::new(title, path, s.clone())));
        c
    }

    #[test]
    fn normalizes_the_sum_not_the_members() {
        let s = store();
        let a = single("a", "a.root", &s);
        let b = single("b", "b.root", &s);
        let mut comp = CompositeCollection::new("ab").with_scale_factor(3.0);
        comp.add(a.clone());
        comp.add(b.clone());

        let unit = NormalizationPolicy::none().with_unit_integral();
        let out = comp.retrieve("x", &unit, false).unwrap().unwrap();
        assert_relative_eq!(out.bin_content(1), 1.0 / 3.0);
        assert_relative_eq!(out.bin_content(2), 2.0 / 3.0);
        assert_relative_eq!(out.integral(), 1.0);

        // same as: sum of raw members, scaled, normalized once
        let mut expected = a.retrieve("x", &NormalizationPolicy::none(), false).unwrap().unwrap();
        expected.add(&b.retrieve("x", &NormalizationPolicy::none(), false).unwrap().unwrap()).unwrap();
        expected.scale(3.0);
        let integral = expected.integral();
        expected.divide(integral);
        assert_eq!(out.bin_contents(), expected.bin_contents());

        // and differs from summing individually normalized members
        let mut naive = a.retrieve("x", &unit, false).unwrap().unwrap();
        naive.add(&b.retrieve("x", &unit, false).unwrap().unwrap()).unwrap();
        assert!((naive.bin_content(1) - out.bin_content(1)).abs() > 1e-6);
    }

    #[test]
    fn scale_factors_compose_through_nesting() {
        let s = store();
        let mut inner = CompositeCollection::new("inner").with_scale_factor(2.0);
        inner.add(single("a", "a.root", &s));
        let mut outer = CompositeCollection::new("outer").with_scale_factor(0.5);
        outer.add(inner);
        outer.add(single("b", "b.root", &s));

        let out = outer.retrieve("x", &NormalizationPolicy::none(), false).unwrap().unwrap();
        // ((1,3) * 2 + (1,1)) * 0.5
        assert_eq!(out.bin_contents(), &[1.5, 3.5]);
        assert_eq!(out.title(), "outer");
    }

    #[test]
    fn per_source_factors_still_apply_inside_members() {
        let s = store();
        let mut a = Collection::new("a").with_sum_of_weights(SumOfWeightsLocator::new("sow", 1));
        a.add_source(Arc::new(Source::new("a", "a.root", s.clone()).with_cross_section(4.0)));
        let mut comp = CompositeCollection::new("c");
        comp.add(a);

        let p = NormalizationPolicy::none().with_cross_section().with_sum_of_weights();
        let out = comp.retrieve("x", &p, false).unwrap().unwrap();
        // (1,3) * 4 / 2
        assert_eq!(out.bin_contents(), &[2.0, 6.0]);
    }

    #[test]
    fn inherited_locator_fills_in_for_members() {
        let s = store();
        let mut comp =
            CompositeCollection::new("c").with_sum_of_weights(SumOfWeightsLocator::new("sow", 1));
        comp.add(single("b", "b.root", &s));

        let p = NormalizationPolicy::none().with_sum_of_weights();
        let out = comp.retrieve("x", &p, false).unwrap().unwrap();
        assert_eq!(out.bin_contents(), &[0.25, 0.25]);

        let mut bare = CompositeCollection::new("bare");
        bare.add(single("b", "b.root", &s));
        assert!(matches!(bare.retrieve("x", &p, false), Err(Error::Configuration(_))));
    }

    #[test]
    fn empty_composite_fails_fast() {
        let comp = CompositeCollection::new("none");
        assert!(matches!(
            comp.retrieve("x", &NormalizationPolicy::none(), false),
            Err(Error::EmptyCollection(_))
        ));
    }

    #[test]
    fn members_without_result_are_skipped() {
        let s = store();
        let mut comp = CompositeCollection::new("c");
        comp.add(single("bad", "bad.root", &s));
        comp.add(single("b", "b.root", &s));
        let out = comp.retrieve("x", &NormalizationPolicy::none(), true).unwrap().unwrap();
        assert_eq!(out.bin_contents(), &[1.0, 1.0]);

        let mut only_bad = CompositeCollection::new("c");
        only_bad.add(single("bad", "bad.root", &s));
        assert!(only_bad.retrieve("x", &NormalizationPolicy::none(), true).unwrap().is_none());
    }

    #[test]
    #[traced_test]
    fn zero_sum_is_left_unnormalized() {
        let s = store();
        let mut comp = CompositeCollection::new("zeros").with_scale_factor(2.0);
        comp.add(single("z", "z.root", &s));
        comp.add(single("z2", "z.root", &s));

        let unit = NormalizationPolicy::none().with_unit_integral();
        let out = comp.retrieve("x", &unit, false).unwrap().unwrap();
        assert_eq!(out.bin_contents(), &[0.0, 0.0]);
        assert!(out.bin_contents().iter().all(|v| v.is_finite()));
        assert!(logs_contain("integral is zero, result left unnormalized"));
        assert!(logs_contain("zeros"));
    }

    #[test]
    #[traced_test]
    fn skipped_member_is_logged() {
        let s = store();
        let mut comp = CompositeCollection::new("c");
        comp.add(single("bad", "bad.root", &s));
        comp.add(single("b", "b.root", &s));
        comp.retrieve("x", &NormalizationPolicy::none(), true).unwrap();
        assert!(logs_contain("member skipped"));
    }
}
