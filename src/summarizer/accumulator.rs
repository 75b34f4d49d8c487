//! Running sums for abundance-weighted summaries
//!
//! One `SpeciesAccumulator` per species is filled in a single pass over the
//! observations, then finalized by division. The event baseline reuses the
//! same building blocks with unit weights.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::summarizer::species::{CategoryFrequencies, ContinuousMean, SpeciesHabitatSummary};
use crate::types::{AttributeSchema, Observation};

/// Weighted mean over present values only
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedMean {
    weight: f64,
    weighted_sum: f64,
}

impl WeightedMean {
    pub fn add(&mut self, value: Option<f64>, weight: f64) {
        if let Some(v) = value {
            if v.is_finite() {
                self.weight += weight;
                self.weighted_sum += v * weight;
            }
        }
    }

    /// Missing when no present value was added
    pub fn mean(&self) -> Option<f64> {
        if self.weight > 0.0 {
            Some(self.weighted_sum / self.weight)
        } else {
            None
        }
    }
}

/// Weight per category, with missing values in their own bucket
#[derive(Debug, Clone, Default)]
pub struct CategoryTally {
    by_category: FxHashMap<String, f64>,
    missing: f64,
}

impl CategoryTally {
    pub fn add(&mut self, category: Option<&str>, weight: f64) {
        match category {
            Some(c) => *self.by_category.entry(c.to_string()).or_insert(0.0) += weight,
            None => self.missing += weight,
        }
    }

    /// Divide by `total`; only categories actually seen are emitted
    pub fn frequencies(&self, attribute: &str, total: f64) -> CategoryFrequencies {
        if total <= 0.0 {
            return CategoryFrequencies::empty(attribute);
        }

        let frequencies: BTreeMap<String, f64> = self
            .by_category
            .iter()
            .map(|(category, weight)| (category.clone(), weight / total))
            .collect();

        CategoryFrequencies {
            attribute: attribute.to_string(),
            frequencies,
            missing: self.missing / total,
        }
    }
}

/// Per-species running sums
#[derive(Debug, Clone)]
pub struct SpeciesAccumulator {
    occurrences: usize,
    total_abundance: f64,
    continuous: SmallVec<[WeightedMean; 4]>,
    categorical: SmallVec<[CategoryTally; 6]>,
}

impl SpeciesAccumulator {
    pub fn new(schema: &AttributeSchema) -> Self {
        Self {
            occurrences: 0,
            total_abundance: 0.0,
            continuous: (0..schema.continuous().len()).map(|_| WeightedMean::default()).collect(),
            categorical: (0..schema.categorical().len()).map(|_| CategoryTally::default()).collect(),
        }
    }

    /// Fold one observation in; duplicate rows are counted again
    pub fn add(&mut self, obs: &Observation) {
        self.occurrences += 1;
        self.total_abundance += obs.abundance;

        for (acc, value) in self.continuous.iter_mut().zip(&obs.continuous) {
            acc.add(*value, obs.abundance);
        }
        for (tally, value) in self.categorical.iter_mut().zip(&obs.categorical) {
            tally.add(value.as_deref(), obs.abundance);
        }
    }

    pub fn finalize(&self, species_id: &str, schema: &AttributeSchema) -> SpeciesHabitatSummary {
        let mean_abund = if self.occurrences > 0 {
            Some(self.total_abundance / self.occurrences as f64)
        } else {
            None
        };

        let continuous = schema
            .continuous()
            .iter()
            .zip(&self.continuous)
            .map(|(name, acc)| ContinuousMean {
                attribute: name.clone(),
                mean: acc.mean(),
            })
            .collect();

        let categorical = schema
            .categorical()
            .iter()
            .zip(&self.categorical)
            .map(|(name, tally)| tally.frequencies(name, self.total_abundance))
            .collect();

        SpeciesHabitatSummary {
            species_id: species_id.to_string(),
            species_name: None,
            total_occ: self.occurrences,
            total_abund: self.total_abundance,
            mean_abund,
            continuous,
            categorical,
            traits: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weighted_mean_skips_missing() {
        let mut acc = WeightedMean::default();
        acc.add(Some(20.0), 5.0);
        acc.add(None, 100.0);
        acc.add(Some(40.0), 15.0);

        assert_relative_eq!(acc.mean().unwrap(), 35.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_mean_empty_is_missing() {
        let mut acc = WeightedMean::default();
        acc.add(None, 3.0);
        assert_eq!(acc.mean(), None);
    }

    #[test]
    fn test_category_tally_missing_bucket() {
        let mut tally = CategoryTally::default();
        tally.add(Some("Sand"), 3.0);
        tally.add(Some("Mud"), 1.0);
        tally.add(None, 4.0);

        let freq = tally.frequencies("Substrate", 8.0);
        assert_relative_eq!(freq.frequencies["Sand"], 0.375);
        assert_relative_eq!(freq.frequencies["Mud"], 0.125);
        assert_relative_eq!(freq.missing, 0.5);
        assert_relative_eq!(freq.observed_total() + freq.missing, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_category_tally_zero_total() {
        let tally = CategoryTally::default();
        let freq = tally.frequencies("Substrate", 0.0);
        assert!(freq.frequencies.is_empty());
        assert_eq!(freq.missing, 0.0);
    }
}
