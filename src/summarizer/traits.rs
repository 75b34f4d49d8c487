//! Trait merge
//!
//! Attaches the species trait reference to computed summaries. A species
//! without a record gets the same fields, each explicitly missing.

use crate::summarizer::species::{SpeciesHabitatSummary, TraitField};
use crate::types::TraitTable;

/// Attach trait fields to one summary, replacing any previously merged
pub fn merge_traits(summary: &mut SpeciesHabitatSummary, traits: &TraitTable) {
    let record = traits.get(&summary.species_id);

    summary.traits = traits
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| TraitField {
            name: name.clone(),
            value: record.and_then(|values| values[i].clone()),
        })
        .collect();
}

/// Attach trait fields to every summary; returns how many had a record
pub fn merge_traits_all(summaries: &mut [SpeciesHabitatSummary], traits: &TraitTable) -> usize {
    let mut matched = 0;
    for summary in summaries.iter_mut() {
        if traits.get(&summary.species_id).is_some() {
            matched += 1;
        }
        merge_traits(summary, traits);
    }

    tracing::info!(
        "Merged traits: {}/{} species have a trait record",
        matched,
        summaries.len()
    );
    matched
}
