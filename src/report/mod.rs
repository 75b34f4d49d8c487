//! Species Report View Models
//!
//! Renderer-facing shape of one species' habitat profile: an occurrence
//! block, one panel per continuous attribute and one bar panel per
//! categorical attribute, each set against the event baseline.
//! Field names follow the wide-table/metadata column naming.

pub mod generator;

pub use generator::{build_species_report, report_file_name, report_file_names, write_reports};

use serde::Serialize;

use crate::summarizer::{EventWeighting, TraitField};

/// Complete per-species report
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesReport {
    pub species_id: String,
    pub species_name: Option<String>,
    pub occurrence: OccurrencePanel,
    pub continuous: Vec<ContinuousPanel>,
    pub categorical: Vec<CategoricalPanel>,
    pub traits: Vec<TraitField>,
    pub baseline: BaselineInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccurrencePanel {
    pub total_occ: usize,
    pub total_abund: f64,
    pub mean_abund: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContinuousPanel {
    pub attribute: String,
    pub label: String,
    pub species_mean: Option<f64>,
    pub baseline_mean: Option<f64>,
    pub difference: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoricalPanel {
    pub attribute: String,
    pub label: String,
    pub bars: Vec<CategoryBar>,
    /// Species abundance share with no category
    pub missing: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBar {
    pub category: String,
    /// Matching wide-table column
    pub column: String,
    pub species_frequency: f64,
    pub baseline_frequency: f64,
    pub affinity: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineInfo {
    pub weighting: EventWeighting,
    pub n_events: usize,
    pub n_rows: usize,
}
