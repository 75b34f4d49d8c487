//! Wide Summary Table
//!
//! Unions the sparse per-species category sets into one dense table.
//!
//! Two passes:
//! 1. `ColumnPlan::build` collects every (attribute, category) pair observed
//!    for any species and fixes the curated column order.
//! 2. `build_wide_table` materializes each species against that fixed plan,
//!    zero-filling categories the species was never seen in.
//!
//! Species with no observations keep every derived column missing.
//! The metadata table is generated from the same plan (see `crate::metadata`).

use ahash::AHashSet;
use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::HabitatConfig;
use crate::summarizer::{EventHabitatSummary, SpeciesHabitatSummary};
use crate::types::TraitValue;

pub const TOTAL_OCC: &str = "total_occ";
pub const TOTAL_ABUND: &str = "total_abund";
pub const MEAN_ABUND: &str = "mean_abund";

/// Prefix given to a trait column whose name is already taken
pub const TRAIT_PREFIX: &str = "trait_";

/// What an output column holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    SpeciesId,
    SpeciesName,
    TotalOcc,
    TotalAbund,
    MeanAbund,
    Continuous { attribute: String },
    Category { attribute: String, category: String },
    CategoryMissing { attribute: String },
    Trait { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// Name of the wide-table column holding one category's frequency
pub fn category_column(attribute: &str, category: &str) -> String {
    format!("{}_{}", attribute, category)
}

/// Name of the wide-table column holding an attribute's missing share
pub fn missing_column(attribute: &str) -> String {
    format!("{}_missing", attribute)
}

/// Fixed, ordered column set of the wide table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    columns: Vec<OutputColumn>,
}

impl ColumnPlan {
    /// First pass: gather observed categories and lay out columns by family
    pub fn build(config: &HabitatConfig, summaries: &[SpeciesHabitatSummary]) -> Self {
        let mut categories: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut with_missing: AHashSet<&str> = AHashSet::new();

        for summary in summaries {
            for freq in &summary.categorical {
                let seen = categories.entry(freq.attribute.as_str()).or_default();
                seen.extend(freq.frequencies.keys().map(String::as_str));
                if freq.missing > 0.0 {
                    with_missing.insert(freq.attribute.as_str());
                }
            }
        }

        let mut plan = Self { columns: Vec::new() };
        plan.push(config.columns.species.clone(), ColumnKind::SpeciesId);

        if summaries.iter().any(|s| s.species_name.is_some()) {
            plan.push(config.columns.species_name.clone(), ColumnKind::SpeciesName);
        }

        plan.push(TOTAL_OCC.to_string(), ColumnKind::TotalOcc);
        plan.push(TOTAL_ABUND.to_string(), ColumnKind::TotalAbund);
        plan.push(MEAN_ABUND.to_string(), ColumnKind::MeanAbund);

        let schema = config.schema();
        for attribute in config.ordered_attributes() {
            if schema.continuous_index(attribute).is_some() {
                plan.push(
                    attribute.to_string(),
                    ColumnKind::Continuous { attribute: attribute.to_string() },
                );
                continue;
            }

            if let Some(seen) = categories.get(attribute) {
                for category in seen {
                    plan.push(
                        category_column(attribute, category),
                        ColumnKind::Category {
                            attribute: attribute.to_string(),
                            category: category.to_string(),
                        },
                    );
                }
            }
            if with_missing.contains(attribute) {
                plan.push(
                    missing_column(attribute),
                    ColumnKind::CategoryMissing { attribute: attribute.to_string() },
                );
            }
        }

        if let Some(first) = summaries.first() {
            for field in &first.traits {
                plan.push(field.name.clone(), ColumnKind::Trait { name: field.name.clone() });
            }
        }

        plan
    }

    /// Append a column, renaming it if the name is already taken
    ///
    /// A clashing trait column is first tried as `trait_<name>`; any other
    /// clash (or a still-taken trait name) gets the first free `_<n>` suffix
    /// starting at 2. Earlier columns always keep their name.
    fn push(&mut self, name: String, kind: ColumnKind) {
        let mut resolved = name.clone();
        if self.contains(&resolved) {
            if let ColumnKind::Trait { .. } = kind {
                resolved = format!("{}{}", TRAIT_PREFIX, name);
            }
            let base = resolved.clone();
            let mut n = 2;
            while self.contains(&resolved) {
                resolved = format!("{}_{}", base, n);
                n += 1;
            }
            tracing::warn!("Column name '{}' already in use; writing it as '{}'", name, resolved);
        }
        self.columns.push(OutputColumn { name: resolved, kind });
    }

    fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }


    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Numeric cell of a summary under the dense layout
///
/// Categories absent for an observed species read as 0; every derived cell of
/// an unobserved species is missing.
pub fn numeric_cell(summary: &SpeciesHabitatSummary, kind: &ColumnKind) -> Option<f64> {
    let observed = summary.total_occ > 0;
    match kind {
        ColumnKind::TotalOcc => Some(summary.total_occ as f64),
        ColumnKind::TotalAbund => Some(summary.total_abund),
        ColumnKind::MeanAbund => summary.mean_abund,
        ColumnKind::Continuous { attribute } => summary
            .continuous
            .iter()
            .find(|c| &c.attribute == attribute)
            .and_then(|c| c.mean),
        ColumnKind::Category { attribute, category } if observed => Some(
            summary
                .categorical
                .iter()
                .find(|c| &c.attribute == attribute)
                .and_then(|c| c.get(category))
                .unwrap_or(0.0),
        ),
        ColumnKind::CategoryMissing { attribute } if observed => Some(
            summary
                .categorical
                .iter()
                .find(|c| &c.attribute == attribute)
                .map(|c| c.missing)
                .unwrap_or(0.0),
        ),
        _ => None,
    }
}

/// Dense table plus the plan that produced it
#[derive(Debug, Clone)]
pub struct WideTable {
    pub plan: ColumnPlan,
    pub frame: DataFrame,
}

/// Second pass: materialize every summary against the fixed plan
pub fn build_wide_table(config: &HabitatConfig, summaries: &[SpeciesHabitatSummary]) -> Result<WideTable> {
    let plan = ColumnPlan::build(config, summaries);

    let columns: Vec<Column> = plan
        .columns()
        .iter()
        .map(|col| materialize_column(col, summaries))
        .collect();

    let frame = DataFrame::new(columns)
        .with_context(|| "Failed to assemble wide summary table")?;

    tracing::info!(
        "Wide table: {} species × {} columns",
        frame.height(),
        frame.width()
    );

    Ok(WideTable { plan, frame })
}

fn materialize_column(col: &OutputColumn, summaries: &[SpeciesHabitatSummary]) -> Column {
    let name: PlSmallStr = col.name.as_str().into();
    match &col.kind {
        ColumnKind::SpeciesId => {
            let ids: Vec<&str> = summaries.iter().map(|s| s.species_id.as_str()).collect();
            Column::new(name, ids)
        }
        ColumnKind::SpeciesName => {
            let names: Vec<Option<&str>> = summaries.iter().map(|s| s.species_name.as_deref()).collect();
            Column::new(name, names)
        }
        ColumnKind::TotalOcc => {
            let counts: Vec<u64> = summaries.iter().map(|s| s.total_occ as u64).collect();
            Column::new(name, counts)
        }
        ColumnKind::Trait { name: trait_name } => trait_column(name, trait_name, summaries),
        kind => {
            let values: Vec<Option<f64>> = summaries.iter().map(|s| numeric_cell(s, kind)).collect();
            Column::new(name, values)
        }
    }
}

/// Trait columns keep a typed dtype when all present values agree
fn trait_column(name: PlSmallStr, trait_name: &str, summaries: &[SpeciesHabitatSummary]) -> Column {
    let values: Vec<Option<&TraitValue>> = summaries.iter().map(|s| s.trait_value(trait_name)).collect();

    if values.iter().flatten().all(|v| matches!(v, TraitValue::Flag(_))) {
        let flags: Vec<Option<bool>> = values
            .iter()
            .map(|v| match v {
                Some(TraitValue::Flag(b)) => Some(*b),
                _ => None,
            })
            .collect();
        return Column::new(name, flags);
    }

    if values.iter().flatten().all(|v| matches!(v, TraitValue::Number(_))) {
        let numbers: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Some(TraitValue::Number(n)) => Some(*n),
                _ => None,
            })
            .collect();
        return Column::new(name, numbers);
    }

    let text: Vec<Option<String>> = values.into_iter().map(|v| v.map(|t| t.to_string())).collect();
    Column::new(name, text)
}

/// Long-format baseline: one row per continuous mean, category and missing share
pub fn event_baseline_frame(baseline: &EventHabitatSummary) -> Result<DataFrame> {
    let mut attribute: Vec<String> = Vec::new();
    let mut kind: Vec<&str> = Vec::new();
    let mut category: Vec<Option<String>> = Vec::new();
    let mut value: Vec<Option<f64>> = Vec::new();

    for c in &baseline.continuous {
        attribute.push(c.attribute.clone());
        kind.push("mean");
        category.push(None);
        value.push(c.mean);
    }

    for freq in &baseline.categorical {
        for (cat, f) in &freq.frequencies {
            attribute.push(freq.attribute.clone());
            kind.push("frequency");
            category.push(Some(cat.clone()));
            value.push(Some(*f));
        }
        if freq.missing > 0.0 {
            attribute.push(freq.attribute.clone());
            kind.push("missing");
            category.push(None);
            value.push(Some(freq.missing));
        }
    }

    let n = attribute.len();
    DataFrame::new(vec![
        Column::new("attribute".into(), attribute),
        Column::new("kind".into(), kind),
        Column::new("category".into(), category),
        Column::new("value".into(), value),
        Column::new("weighting".into(), vec![baseline.weighting.to_string(); n]),
        Column::new("n_events".into(), vec![baseline.n_events as u64; n]),
        Column::new("n_rows".into(), vec![baseline.n_rows as u64; n]),
    ])
    .with_context(|| "Failed to assemble event baseline table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AttributeSpec, ColumnFamily};
    use crate::summarizer::{summarize_all, summarize_events, EventWeighting, merge_traits_all};
    use crate::types::{Observation, ObservationTable, TraitTable};
    use approx::assert_relative_eq;
    use smallvec::smallvec;

    fn config() -> HabitatConfig {
        HabitatConfig {
            continuous: vec![AttributeSpec::new("MudPercent", "Mud (%)", "sediment")],
            categorical: vec![
                AttributeSpec::new("Energy", "Energy", "map"),
                AttributeSpec::new("Substrate", "Substrate", "map"),
            ],
            families: vec![ColumnFamily {
                name: "habitat".into(),
                attributes: vec!["Substrate".into(), "MudPercent".into()],
            }],
            ..HabitatConfig::default()
        }
    }

    fn obs(species: &str, abundance: f64, mud: Option<f64>, energy: Option<&str>, substrate: &str) -> Observation {
        Observation {
            species_id: species.to_string(),
            event_id: format!("{}-{}", species, abundance),
            abundance,
            continuous: smallvec![mud],
            categorical: smallvec![energy.map(str::to_string), Some(substrate.to_string())],
        }
    }

    fn table() -> ObservationTable {
        let cfg = config();
        ObservationTable::new(
            cfg.schema(),
            vec![
                obs("1", 5.0, Some(20.0), Some("Low"), "Sand"),
                obs("1", 15.0, Some(40.0), Some("Low"), "Sand"),
                obs("2", 1.0, None, None, "Rock"),
                obs("2", 3.0, Some(10.0), Some("High"), "Mud"),
            ],
        ).unwrap()
    }

    #[test]
    fn test_column_plan_order() {
        let summaries = summarize_all(&table(), None);
        let plan = ColumnPlan::build(&config(), &summaries);

        assert_eq!(
            plan.names(),
            vec![
                "aphia_id", "total_occ", "total_abund", "mean_abund",
                "Substrate_Mud", "Substrate_Rock", "Substrate_Sand",
                "MudPercent",
                "Energy_High", "Energy_Low", "Energy_missing",
            ]
        );
    }

    #[test]
    fn test_dense_zero_fill() {
        let summaries = summarize_all(&table(), None);
        let wide = build_wide_table(&config(), &summaries).unwrap();

        assert_eq!(wide.frame.height(), 2);
        let sand = wide.frame.column("Substrate_Sand").unwrap().f64().unwrap().clone();
        assert_eq!(sand.get(0), Some(1.0));
        assert_eq!(sand.get(1), Some(0.0));

        let missing = wide.frame.column("Energy_missing").unwrap().f64().unwrap().clone();
        assert_relative_eq!(missing.get(1).unwrap(), 0.25);
        assert_eq!(missing.get(0), Some(0.0));
    }

    #[test]
    fn test_unobserved_species_all_derived_missing() {
        let list = crate::types::SpeciesList::from_ids(&["1", "404"]);
        let summaries = summarize_all(&table(), Some(&list));
        let plan = ColumnPlan::build(&config(), &summaries);

        let ghost = &summaries[1];
        for col in plan.columns() {
            match col.kind {
                ColumnKind::SpeciesId | ColumnKind::SpeciesName => {}
                ColumnKind::TotalOcc | ColumnKind::TotalAbund => {
                    assert_eq!(numeric_cell(ghost, &col.kind), Some(0.0));
                }
                _ => assert_eq!(numeric_cell(ghost, &col.kind), None, "column {}", col.name),
            }
        }
    }

    #[test]
    fn test_trait_columns_typed() {
        let mut traits = TraitTable::new(vec!["hard_substrate".into(), "notes".into()]);
        traits.insert("1", vec![Some(TraitValue::Flag(true)), Some(TraitValue::Text("x".into()))]).unwrap();

        let mut summaries = summarize_all(&table(), None);
        merge_traits_all(&mut summaries, &traits);
        let wide = build_wide_table(&config(), &summaries).unwrap();

        let flags = wide.frame.column("hard_substrate").unwrap().bool().unwrap().clone();
        assert_eq!(flags.get(0), Some(true));
        assert_eq!(flags.get(1), None);
        assert_eq!(wide.plan.names().last(), Some(&"notes"));
    }

    #[test]
    fn test_category_named_missing_keeps_bucket_column_distinct() {
        let cfg = config();
        let rows = vec![
            obs("1", 2.0, Some(5.0), Some("missing"), "Sand"),
            obs("1", 6.0, Some(5.0), None, "Sand"),
        ];
        let summaries = summarize_all(&ObservationTable::new(cfg.schema(), rows).unwrap(), None);
        let wide = build_wide_table(&cfg, &summaries).unwrap();

        let category = wide.frame.column("Energy_missing").unwrap().f64().unwrap().clone();
        assert_relative_eq!(category.get(0).unwrap(), 0.25);
        let bucket = wide.frame.column("Energy_missing_2").unwrap().f64().unwrap().clone();
        assert_relative_eq!(bucket.get(0).unwrap(), 0.75);

        let kinds: Vec<&ColumnKind> = wide.plan.columns().iter().map(|c| &c.kind).collect();
        assert!(kinds.contains(&&ColumnKind::CategoryMissing { attribute: "Energy".into() }));
    }

    #[test]
    fn test_trait_name_clash_is_prefixed() {
        let mut traits = TraitTable::new(vec!["MudPercent".into(), "total_occ".into()]);
        traits.insert("1", vec![Some(TraitValue::Number(7.0)), Some(TraitValue::Text("many".into()))]).unwrap();

        let mut summaries = summarize_all(&table(), None);
        merge_traits_all(&mut summaries, &traits);
        let wide = build_wide_table(&config(), &summaries).unwrap();

        let names = wide.plan.names();
        let unique: std::collections::HashSet<&&str> = names.iter().collect();
        assert_eq!(unique.len(), names.len());

        let mud = wide.frame.column("MudPercent").unwrap().f64().unwrap().clone();
        assert_relative_eq!(mud.get(0).unwrap(), 35.0);
        let trait_mud = wide.frame.column("trait_MudPercent").unwrap().f64().unwrap().clone();
        assert_eq!(trait_mud.get(0), Some(7.0));
        assert!(names.contains(&"trait_total_occ"));
    }

    #[test]
    fn test_event_baseline_frame_rows() {
        let baseline = summarize_events(&table(), EventWeighting::PerEvent);
        let frame = event_baseline_frame(&baseline).unwrap();

        // 1 mean + Energy {High, Low, missing} + Substrate {Mud, Rock, Sand}
        assert_eq!(frame.height(), 7);
        assert_eq!(frame.width(), 7);
    }
}
