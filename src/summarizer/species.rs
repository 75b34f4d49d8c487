//! Species Habitat Summary
//!
//! Abundance-weighted habitat profile of one species: weighted means of the
//! continuous attributes and weighted frequencies of each observed category.
//!
//! Category output is sparse per species. The dense, zero-filled layout only
//! exists in the wide table built by `crate::table`.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::summarizer::accumulator::SpeciesAccumulator;
use crate::types::{ObservationTable, SpeciesList, TraitValue};

/// Weighted mean of one continuous attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuousMean {
    pub attribute: String,
    pub mean: Option<f64>,
}

/// Weighted frequencies of the observed categories of one attribute
///
/// `missing` is the share carried by observations with no category, so
/// `observed_total() + missing == 1` whenever there was any weight at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryFrequencies {
    pub attribute: String,
    pub frequencies: BTreeMap<String, f64>,
    pub missing: f64,
}

impl CategoryFrequencies {
    pub fn empty(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            frequencies: BTreeMap::new(),
            missing: 0.0,
        }
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.frequencies.get(category).copied()
    }

    /// Sum over observed categories, excluding the missing bucket
    pub fn observed_total(&self) -> f64 {
        self.frequencies.values().sum()
    }
}

/// One merged trait field; `None` marks a missing record or cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitField {
    pub name: String,
    pub value: Option<TraitValue>,
}

/// Habitat summary of a single species
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesHabitatSummary {
    pub species_id: String,
    pub species_name: Option<String>,
    pub total_occ: usize,
    pub total_abund: f64,
    pub mean_abund: Option<f64>,
    pub continuous: Vec<ContinuousMean>,
    pub categorical: Vec<CategoryFrequencies>,
    pub traits: Vec<TraitField>,
}

impl SpeciesHabitatSummary {
    pub fn trait_value(&self, name: &str) -> Option<&TraitValue> {
        self.traits
            .iter()
            .find(|t| t.name == name)
            .and_then(|t| t.value.as_ref())
    }
}

/// Read access shared by species summaries and the event baseline
pub trait HabitatProfile {
    fn continuous(&self) -> &[ContinuousMean];
    fn categorical(&self) -> &[CategoryFrequencies];

    fn continuous_mean(&self, attribute: &str) -> Option<f64> {
        self.continuous()
            .iter()
            .find(|c| c.attribute == attribute)
            .and_then(|c| c.mean)
    }

    fn categories(&self, attribute: &str) -> Option<&CategoryFrequencies> {
        self.categorical().iter().find(|c| c.attribute == attribute)
    }

    fn category_frequency(&self, attribute: &str, category: &str) -> Option<f64> {
        self.categories(attribute).and_then(|c| c.get(category))
    }
}

impl HabitatProfile for SpeciesHabitatSummary {
    fn continuous(&self) -> &[ContinuousMean] {
        &self.continuous
    }

    fn categorical(&self) -> &[CategoryFrequencies] {
        &self.categorical
    }
}

/// Summarize one species
///
/// A species with no observations gets a zero summary rather than an error.
pub fn summarize_species(table: &ObservationTable, species_id: &str) -> SpeciesHabitatSummary {
    let mut acc = SpeciesAccumulator::new(table.schema());
    for obs in table.observations_for(species_id) {
        acc.add(obs);
    }
    acc.finalize(species_id, table.schema())
}

/// Summarize every species in one pass over the observations
///
/// Output order follows `species` when given (listed species with no
/// observations get zero summaries), else ascending species identifier.
pub fn summarize_all(table: &ObservationTable, species: Option<&SpeciesList>) -> Vec<SpeciesHabitatSummary> {
    let schema = table.schema();

    let mut accumulators: FxHashMap<&str, SpeciesAccumulator> = FxHashMap::default();
    for obs in table.rows() {
        accumulators
            .entry(obs.species_id.as_str())
            .or_insert_with(|| SpeciesAccumulator::new(schema))
            .add(obs);
    }

    let ids: Vec<String> = match species {
        Some(list) => list.entries().iter().map(|e| e.id.clone()).collect(),
        None => table.species_ids(),
    };

    tracing::debug!(
        "Accumulated {} observed species; finalizing {} summaries",
        accumulators.len(),
        ids.len()
    );

    let empty = SpeciesAccumulator::new(schema);
    ids.par_iter()
        .map(|id| {
            let mut summary = accumulators
                .get(id.as_str())
                .unwrap_or(&empty)
                .finalize(id, schema);
            summary.species_name = species.and_then(|l| l.name_of(id)).map(str::to_string);
            summary
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeSchema, Observation, SpeciesEntry};
    use approx::assert_relative_eq;
    use smallvec::smallvec;

    fn schema() -> AttributeSchema {
        AttributeSchema::new(vec!["MudPercent".into()], vec!["Substrate".into()])
    }

    fn obs(species: &str, event: &str, abundance: f64, mud: Option<f64>, substrate: Option<&str>) -> Observation {
        Observation {
            species_id: species.to_string(),
            event_id: event.to_string(),
            abundance,
            continuous: smallvec![mud],
            categorical: smallvec![substrate.map(str::to_string)],
        }
    }

    fn example_table() -> ObservationTable {
        ObservationTable::new(
            schema(),
            vec![
                obs("103228", "X", 5.0, Some(20.0), Some("Sand")),
                obs("103228", "Y", 15.0, Some(40.0), Some("Sand")),
                obs("141433", "X", 2.0, None, Some("Mud")),
                obs("141433", "Z", 6.0, Some(80.0), None),
            ],
        ).unwrap()
    }

    #[test]
    fn test_worked_example() {
        let summary = summarize_species(&example_table(), "103228");

        assert_eq!(summary.total_occ, 2);
        assert_relative_eq!(summary.total_abund, 20.0);
        assert_relative_eq!(summary.mean_abund.unwrap(), 10.0);
        assert_relative_eq!(summary.continuous_mean("MudPercent").unwrap(), 35.0, epsilon = 1e-12);
        assert_relative_eq!(summary.category_frequency("Substrate", "Sand").unwrap(), 1.0);
        assert_eq!(summary.categories("Substrate").unwrap().frequencies.len(), 1);
    }

    #[test]
    fn test_missing_values_handled_per_attribute() {
        let summary = summarize_species(&example_table(), "141433");

        // Mean only over the observation with a value
        assert_relative_eq!(summary.continuous_mean("MudPercent").unwrap(), 80.0);

        let substrate = summary.categories("Substrate").unwrap();
        assert_relative_eq!(substrate.get("Mud").unwrap(), 0.25);
        assert_relative_eq!(substrate.missing, 0.75);
        assert!(substrate.observed_total() < 1.0);
    }

    #[test]
    fn test_single_observation_mean_equals_value() {
        let table = ObservationTable::new(
            schema(),
            vec![obs("1", "e", 7.5, Some(12.3), Some("Rock"))],
        ).unwrap();

        let summary = summarize_species(&table, "1");
        assert_relative_eq!(summary.continuous_mean("MudPercent").unwrap(), 12.3);
    }

    #[test]
    fn test_absent_species_is_zero_summary() {
        let summary = summarize_species(&example_table(), "999");

        assert_eq!(summary.total_occ, 0);
        assert_eq!(summary.total_abund, 0.0);
        assert_eq!(summary.mean_abund, None);
        assert!(summary.continuous.iter().all(|c| c.mean.is_none()));
        assert!(summary.categorical.iter().all(|c| c.frequencies.is_empty()));
    }

    #[test]
    fn test_duplicate_rows_counted_twice() {
        let table = ObservationTable::new(
            schema(),
            vec![
                obs("1", "e1", 4.0, Some(10.0), Some("Sand")),
                obs("1", "e1", 4.0, Some(10.0), Some("Mud")),
            ],
        ).unwrap();

        let summary = summarize_species(&table, "1");
        assert_eq!(summary.total_occ, 2);
        assert_relative_eq!(summary.total_abund, 8.0);
        assert_relative_eq!(summary.category_frequency("Substrate", "Sand").unwrap(), 0.5);
    }

    #[test]
    fn test_summarize_all_matches_single() {
        let table = example_table();
        let all = summarize_all(&table, None);

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].species_id, "103228");
        for summary in &all {
            assert_eq!(summary, &summarize_species(&table, &summary.species_id));
        }
    }

    #[test]
    fn test_summarize_all_follows_species_list() {
        let list = SpeciesList::new(vec![
            SpeciesEntry { id: "555".into(), name: Some("Abra alba".into()) },
            SpeciesEntry { id: "141433".into(), name: None },
        ]);

        let all = summarize_all(&example_table(), Some(&list));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].species_id, "555");
        assert_eq!(all[0].species_name.as_deref(), Some("Abra alba"));
        assert_eq!(all[0].total_occ, 0);
        assert_eq!(all[1].total_occ, 2);
    }
}
