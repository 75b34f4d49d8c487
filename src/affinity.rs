//! Habitat Affinity
//!
//! Compares a species' abundance-weighted habitat profile with the event
//! baseline (sampling effort). A category affinity above 1 means the species
//! is found there more than sampling alone would predict.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::summarizer::{EventHabitatSummary, HabitatProfile, SpeciesHabitatSummary};

/// Species vs baseline for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAffinity {
    pub attribute: String,
    pub category: String,
    pub species_frequency: f64,
    pub baseline_frequency: f64,
    /// Missing when the baseline never saw the category
    pub affinity: Option<f64>,
}

/// Species vs baseline for one continuous attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuousShift {
    pub attribute: String,
    pub species_mean: Option<f64>,
    pub baseline_mean: Option<f64>,
    pub difference: Option<f64>,
}

pub fn affinity_ratio(species_frequency: f64, baseline_frequency: f64) -> Option<f64> {
    if baseline_frequency > 0.0 {
        Some(species_frequency / baseline_frequency)
    } else {
        None
    }
}

/// Affinity for every category seen for the species or in the baseline
///
/// Empty for a species with no observations.
pub fn category_affinities(
    summary: &SpeciesHabitatSummary,
    baseline: &EventHabitatSummary,
) -> Vec<CategoryAffinity> {
    if summary.total_occ == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for species_freq in &summary.categorical {
        let attribute = species_freq.attribute.as_str();
        let baseline_freq = baseline.categories(attribute);

        let mut categories: BTreeSet<&str> = species_freq.frequencies.keys().map(String::as_str).collect();
        if let Some(b) = baseline_freq {
            categories.extend(b.frequencies.keys().map(String::as_str));
        }

        for category in categories {
            let s = species_freq.get(category).unwrap_or(0.0);
            let b = baseline_freq.and_then(|f| f.get(category)).unwrap_or(0.0);
            out.push(CategoryAffinity {
                attribute: attribute.to_string(),
                category: category.to_string(),
                species_frequency: s,
                baseline_frequency: b,
                affinity: affinity_ratio(s, b),
            });
        }
    }
    out
}

pub fn continuous_shifts(
    summary: &SpeciesHabitatSummary,
    baseline: &EventHabitatSummary,
) -> Vec<ContinuousShift> {
    summary
        .continuous
        .iter()
        .map(|c| {
            let baseline_mean = baseline.continuous_mean(&c.attribute);
            ContinuousShift {
                attribute: c.attribute.clone(),
                species_mean: c.mean,
                baseline_mean,
                difference: c.mean.zip(baseline_mean).map(|(s, b)| s - b),
            }
        })
        .collect()
}
