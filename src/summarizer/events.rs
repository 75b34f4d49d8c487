//! Event-level baseline
//!
//! Habitat distribution over sampling effort, independent of species and
//! without abundance weighting.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::summarizer::accumulator::{CategoryTally, WeightedMean};
use crate::summarizer::species::{CategoryFrequencies, ContinuousMean, HabitatProfile};
use crate::types::{Observation, ObservationTable};

/// What one unit of baseline weight is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventWeighting {
    /// Each distinct event row counts once, however many species it holds.
    /// An event matched to two habitat classifications counts once per
    /// distinct attribute row.
    #[default]
    PerEvent,
    /// Every observation row counts once
    PerOccurrence,
}

impl fmt::Display for EventWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventWeighting::PerEvent => f.write_str("per-event"),
            EventWeighting::PerOccurrence => f.write_str("per-occurrence"),
        }
    }
}

impl FromStr for EventWeighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per-event" | "event" => Ok(EventWeighting::PerEvent),
            "per-occurrence" | "occurrence" => Ok(EventWeighting::PerOccurrence),
            other => Err(format!("unknown event weighting '{}'", other)),
        }
    }
}

/// Baseline habitat distribution over sampling events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventHabitatSummary {
    pub weighting: EventWeighting,
    /// Distinct event identifiers
    pub n_events: usize,
    /// Rows that carried weight (after de-duplication for `PerEvent`)
    pub n_rows: usize,
    pub continuous: Vec<ContinuousMean>,
    pub categorical: Vec<CategoryFrequencies>,
}

impl HabitatProfile for EventHabitatSummary {
    fn continuous(&self) -> &[ContinuousMean] {
        &self.continuous
    }

    fn categorical(&self) -> &[CategoryFrequencies] {
        &self.categorical
    }
}

/// Identity of an event row: the event plus its exact attribute values
type EventKey<'a> = (&'a str, SmallVec<[Option<u64>; 4]>, &'a [Option<String>]);

fn event_key(obs: &Observation) -> EventKey<'_> {
    (
        obs.event_id.as_str(),
        obs.continuous.iter().map(|v| v.map(f64::to_bits)).collect(),
        obs.categorical.as_slice(),
    )
}

/// Compute the event baseline over the whole observation table
pub fn summarize_events(table: &ObservationTable, weighting: EventWeighting) -> EventHabitatSummary {
    let schema = table.schema();

    let mut continuous: Vec<WeightedMean> = vec![WeightedMean::default(); schema.continuous().len()];
    let mut categorical: Vec<CategoryTally> = vec![CategoryTally::default(); schema.categorical().len()];
    let mut seen_rows: AHashSet<EventKey<'_>> = AHashSet::new();
    let mut events: AHashSet<&str> = AHashSet::new();
    let mut n_rows = 0usize;

    for obs in table.rows() {
        events.insert(obs.event_id.as_str());

        if weighting == EventWeighting::PerEvent && !seen_rows.insert(event_key(obs)) {
            continue;
        }

        n_rows += 1;
        for (acc, value) in continuous.iter_mut().zip(&obs.continuous) {
            acc.add(*value, 1.0);
        }
        for (tally, value) in categorical.iter_mut().zip(&obs.categorical) {
            tally.add(value.as_deref(), 1.0);
        }
    }

    tracing::debug!(
        "Event baseline ({}): {} events, {} weighted rows",
        weighting,
        events.len(),
        n_rows
    );

    EventHabitatSummary {
        weighting,
        n_events: events.len(),
        n_rows,
        continuous: schema
            .continuous()
            .iter()
            .zip(&continuous)
            .map(|(name, acc)| ContinuousMean {
                attribute: name.clone(),
                mean: acc.mean(),
            })
            .collect(),
        categorical: schema
            .categorical()
            .iter()
            .zip(&categorical)
            .map(|(name, tally)| tally.frequencies(name, n_rows as f64))
            .collect(),
    }
}
