//! Column Metadata Table
//!
//! Three columns (`column`, `description`, `source`), one row per wide-table
//! column in the same order. Built from the `ColumnPlan` so it cannot drift
//! from the summary schema.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;

use crate::config::{HabitatConfig, ABUNDANCE_SOURCE};
use crate::table::{ColumnKind, ColumnPlan};

pub const DERIVED_SOURCE: &str = "Derived from species abundance records and matched habitat layers";
pub const TRAIT_SOURCE: &str = "Species trait reference";
pub const SPECIES_LIST_SOURCE: &str = "Species list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
    pub column: String,
    pub description: String,
    pub source: String,
}

fn source_or(source: &str, fallback: &str) -> String {
    if source.trim().is_empty() {
        fallback.to_string()
    } else {
        source.to_string()
    }
}

/// Describe every column of the plan
pub fn describe_columns(config: &HabitatConfig, plan: &ColumnPlan) -> Vec<ColumnMetadata> {
    plan.columns()
        .iter()
        .map(|col| {
            let (description, source) = match &col.kind {
                ColumnKind::SpeciesId => (
                    "Species identifier".to_string(),
                    ABUNDANCE_SOURCE.to_string(),
                ),
                ColumnKind::SpeciesName => (
                    "Species scientific name".to_string(),
                    SPECIES_LIST_SOURCE.to_string(),
                ),
                ColumnKind::TotalOcc => (
                    "Number of occurrence records (species × sampling event rows)".to_string(),
                    ABUNDANCE_SOURCE.to_string(),
                ),
                ColumnKind::TotalAbund => (
                    "Total abundance summed over all occurrence records".to_string(),
                    ABUNDANCE_SOURCE.to_string(),
                ),
                ColumnKind::MeanAbund => (
                    "Mean abundance per occurrence record".to_string(),
                    ABUNDANCE_SOURCE.to_string(),
                ),
                ColumnKind::Continuous { attribute } => {
                    let spec = config.attribute(attribute);
                    let label = spec.map(|s| s.description.as_str()).unwrap_or(attribute.as_str());
                    (
                        format!("Abundance-weighted mean of {}", label),
                        source_or(spec.map(|s| s.source.as_str()).unwrap_or(""), DERIVED_SOURCE),
                    )
                }
                ColumnKind::Category { attribute, category } => {
                    let spec = config.attribute(attribute);
                    let label = spec.map(|s| s.description.as_str()).unwrap_or(attribute.as_str());
                    (
                        format!("Abundance-weighted proportion of occurrences where {} is '{}'", label, category),
                        source_or(spec.map(|s| s.source.as_str()).unwrap_or(""), DERIVED_SOURCE),
                    )
                }
                ColumnKind::CategoryMissing { attribute } => {
                    let spec = config.attribute(attribute);
                    let label = spec.map(|s| s.description.as_str()).unwrap_or(attribute.as_str());
                    (
                        format!("Abundance-weighted proportion of occurrences with no {} value", label),
                        source_or(spec.map(|s| s.source.as_str()).unwrap_or(""), DERIVED_SOURCE),
                    )
                }
                ColumnKind::Trait { name } => match config.trait_spec(name) {
                    Some(spec) => (spec.description.clone(), source_or(&spec.source, TRAIT_SOURCE)),
                    None => (format!("Trait flag '{}'", name), TRAIT_SOURCE.to_string()),
                },
            };

            ColumnMetadata {
                column: col.name.clone(),
                description,
                source,
            }
        })
        .collect()
}

/// Metadata as a three-column DataFrame
pub fn metadata_frame(rows: &[ColumnMetadata]) -> Result<DataFrame> {
    let column: Vec<&str> = rows.iter().map(|r| r.column.as_str()).collect();
    let description: Vec<&str> = rows.iter().map(|r| r.description.as_str()).collect();
    let source: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();

    DataFrame::new(vec![
        Column::new("column".into(), column),
        Column::new("description".into(), description),
        Column::new("source".into(), source),
    ])
    .with_context(|| "Failed to assemble metadata table")
}
