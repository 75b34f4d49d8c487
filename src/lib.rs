//! Habitat Summarizer
//!
//! Abundance-weighted habitat profiles for species in a marine
//! observation dataset.
//!
//! Structure:
//! - `config`: attribute catalogue, column families, input column names
//! - `data`: loading observations, traits and species lists with Polars
//! - `summarizer/`: per-species summaries, trait merge, event baseline
//! - `table`: dense all-species wide table
//! - `metadata`: one descriptive row per wide-table column
//! - `affinity`: species vs baseline comparisons
//! - `report/`: per-species JSON reports
//! - `utils/`: frame helpers and CSV/Parquet I/O

pub mod error;
pub mod config;
pub mod types;
pub mod utils;
pub mod data;
pub mod summarizer;
pub mod table;
pub mod metadata;
pub mod affinity;
pub mod report;

// Re-export commonly used types
pub use error::{HabitatError, HabitatResult};
pub use config::HabitatConfig;
pub use data::{DataPaths, HabitatData};
pub use types::{Observation, ObservationTable, SpeciesList, TraitTable, TraitValue};
pub use summarizer::{
    summarize_all, summarize_events, summarize_species, EventHabitatSummary, EventWeighting,
    HabitatProfile, HabitatSummarizer, SpeciesHabitatSummary,
};
pub use table::{build_wide_table, event_baseline_frame, ColumnPlan, WideTable};
pub use metadata::{describe_columns, metadata_frame, ColumnMetadata};
