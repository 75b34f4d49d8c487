//! Habitat Summarizer
//!
//! Per-species abundance-weighted habitat summaries, the all-species batch,
//! trait merging and the event-level baseline.
//!
//! - `accumulator`: single-pass running sums, finalized by division
//! - `species`: summary types, single-species and all-species operations
//! - `traits`: trait reference merge
//! - `events`: unweighted / occurrence-weighted event baseline

pub mod accumulator;
pub mod species;
pub mod traits;
pub mod events;

pub use accumulator::{CategoryTally, SpeciesAccumulator, WeightedMean};
pub use species::{
    summarize_all, summarize_species, CategoryFrequencies, ContinuousMean, HabitatProfile,
    SpeciesHabitatSummary, TraitField,
};
pub use traits::{merge_traits, merge_traits_all};
pub use events::{summarize_events, EventHabitatSummary, EventWeighting};

use crate::types::{ObservationTable, SpeciesList, TraitTable};

/// Coordinator over one loaded observation table
///
/// Every call recomputes from the observations; nothing is cached between
/// calls.
pub struct HabitatSummarizer<'a> {
    observations: &'a ObservationTable,
    traits: Option<&'a TraitTable>,
}

impl<'a> HabitatSummarizer<'a> {
    pub fn new(observations: &'a ObservationTable) -> Self {
        Self {
            observations,
            traits: None,
        }
    }

    /// Merge this trait reference into every summary produced
    pub fn with_traits(mut self, traits: &'a TraitTable) -> Self {
        self.traits = Some(traits);
        self
    }

    /// Summary of one species, trait fields merged when a reference is set
    pub fn summarize_species(&self, species_id: &str) -> SpeciesHabitatSummary {
        let mut summary = summarize_species(self.observations, species_id);
        if let Some(traits) = self.traits {
            merge_traits(&mut summary, traits);
        }
        summary
    }

    /// Summaries of every listed (or every observed) species
    pub fn summarize_all(&self, species: Option<&SpeciesList>) -> Vec<SpeciesHabitatSummary> {
        let mut summaries = summarize_all(self.observations, species);
        if let Some(traits) = self.traits {
            merge_traits_all(&mut summaries, traits);
        }

        let observed = summaries.iter().filter(|s| s.total_occ > 0).count();
        tracing::info!(
            "Summarized {} species ({} with observations, {} without)",
            summaries.len(),
            observed,
            summaries.len() - observed
        );
        summaries
    }

    pub fn summarize_events(&self, weighting: EventWeighting) -> EventHabitatSummary {
        summarize_events(self.observations, weighting)
    }
}
