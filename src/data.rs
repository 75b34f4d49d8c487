//! Data Loading and Management
//!
//! Loads the observation table, the optional species trait reference and the
//! optional species list (CSV or Parquet) with Polars, then converts them to
//! typed, immutable tables.
//!
//! Malformed numeric fields are rejected here. Rows with zero or missing
//! abundance, or without species/event identifiers, are dropped with a
//! warning; everything downstream assumes clean typed input.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::HabitatConfig;
use crate::types::{
    CategoricalValues, ContinuousValues, Observation, ObservationTable, SpeciesEntry, SpeciesList,
    TraitTable, TraitValue,
};
use crate::utils::{bool_values, float_values, read_table, require_columns, string_values};

/// Input file locations
#[derive(Debug, Clone, Default)]
pub struct DataPaths {
    pub observations: PathBuf,
    pub traits: Option<PathBuf>,
    pub species: Option<PathBuf>,
}

/// Everything the summarizer reads
pub struct HabitatData {
    /// Species × event observations annotated with habitat attributes
    pub observations: ObservationTable,

    /// Species trait reference (sparse)
    pub traits: Option<TraitTable>,

    /// Species of interest, with optional names
    pub species: Option<SpeciesList>,
}

impl HabitatData {
    /// Load all configured datasets
    pub fn load(paths: &DataPaths, config: &HabitatConfig) -> Result<Self> {
        tracing::info!("Loading observations: {:?}", paths.observations);
        let observations = Self::load_observations(&paths.observations, config)?;

        let traits = match &paths.traits {
            Some(path) => {
                tracing::info!("Loading trait reference: {:?}", path);
                Some(Self::load_traits(path, config)?)
            }
            None => None,
        };

        let species = match &paths.species {
            Some(path) => {
                tracing::info!("Loading species list: {:?}", path);
                Some(Self::load_species(path, config)?)
            }
            None => None,
        };

        tracing::info!("  Observations: {}", observations.len());
        tracing::info!("  Species observed: {}", observations.species_ids().len());
        tracing::info!("  Sampling events: {}", observations.event_count());
        if let Some(t) = &traits {
            tracing::info!("  Trait records: {} ({} fields)", t.len(), t.columns().len());
        }
        if let Some(s) = &species {
            tracing::info!("  Species of interest: {}", s.len());
        }

        Ok(HabitatData {
            observations,
            traits,
            species,
        })
    }

    pub fn load_observations(path: &Path, config: &HabitatConfig) -> Result<ObservationTable> {
        let df = read_table(path, &config.null_values)?;
        observations_from_frame(&df, config)
            .with_context(|| format!("Invalid observation table: {:?}", path))
    }

    pub fn load_traits(path: &Path, config: &HabitatConfig) -> Result<TraitTable> {
        let df = read_table(path, &config.null_values)?;
        traits_from_frame(&df, config)
            .with_context(|| format!("Invalid trait table: {:?}", path))
    }

    pub fn load_species(path: &Path, config: &HabitatConfig) -> Result<SpeciesList> {
        let df = read_table(path, &config.null_values)?;
        species_from_frame(&df, config)
            .with_context(|| format!("Invalid species list: {:?}", path))
    }
}

/// Convert an observation DataFrame into typed rows
pub fn observations_from_frame(df: &DataFrame, config: &HabitatConfig) -> Result<ObservationTable> {
    const CONTEXT: &str = "observations";
    let schema = config.schema();
    let cols = &config.columns;

    let mut required: Vec<&str> = vec![cols.species.as_str(), cols.event.as_str(), cols.abundance.as_str()];
    required.extend(schema.continuous().iter().map(String::as_str));
    required.extend(schema.categorical().iter().map(String::as_str));
    require_columns(df, &required, CONTEXT)?;

    let species = string_values(df, &cols.species, CONTEXT)?;
    let events = string_values(df, &cols.event, CONTEXT)?;
    let abundance = float_values(df, &cols.abundance, CONTEXT)?;

    let continuous: Vec<Vec<Option<f64>>> = schema
        .continuous()
        .iter()
        .map(|name| float_values(df, name, CONTEXT))
        .collect::<std::result::Result<_, _>>()?;

    let categorical: Vec<Vec<Option<String>>> = schema
        .categorical()
        .iter()
        .map(|name| string_values(df, name, CONTEXT))
        .collect::<std::result::Result<_, _>>()?;

    let mut rows = Vec::with_capacity(df.height());
    let mut dropped_abundance = 0usize;
    let mut dropped_ids = 0usize;

    for idx in 0..df.height() {
        let (Some(species_id), Some(event_id)) = (&species[idx], &events[idx]) else {
            dropped_ids += 1;
            continue;
        };

        let abundance = match abundance[idx] {
            Some(a) if a.is_finite() && a > 0.0 => a,
            _ => {
                dropped_abundance += 1;
                continue;
            }
        };

        let continuous_row: ContinuousValues = continuous.iter().map(|c| c[idx]).collect();
        let categorical_row: CategoricalValues = categorical
            .iter()
            .map(|c| c[idx].clone().filter(|s| !s.trim().is_empty()))
            .collect();

        rows.push(Observation {
            species_id: species_id.clone(),
            event_id: event_id.clone(),
            abundance,
            continuous: continuous_row,
            categorical: categorical_row,
        });
    }

    if dropped_abundance > 0 {
        tracing::warn!("Dropped {} observations with zero or missing abundance", dropped_abundance);
    }
    if dropped_ids > 0 {
        tracing::warn!("Dropped {} observations without species or event identifier", dropped_ids);
    }

    Ok(ObservationTable::new(schema, rows)?)
}

/// Typed values of one trait column
fn trait_column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<TraitValue>>> {
    const CONTEXT: &str = "traits";
    let dtype = df.column(name)?.dtype().clone();

    let values = match dtype {
        DataType::Boolean => bool_values(df, name, CONTEXT)?
            .into_iter()
            .map(|v| v.map(TraitValue::Flag))
            .collect(),
        DataType::String => string_values(df, name, CONTEXT)?
            .into_iter()
            .map(|v| v.map(TraitValue::Text))
            .collect(),
        _ => match float_values(df, name, CONTEXT) {
            Ok(numbers) => numbers.into_iter().map(|v| v.map(TraitValue::Number)).collect(),
            Err(_) => string_values(df, name, CONTEXT)?
                .into_iter()
                .map(|v| v.map(TraitValue::Text))
                .collect(),
        },
    };

    Ok(values)
}

/// Convert a trait DataFrame into a lookup keyed by species identifier
///
/// Trait columns are the configured trait names when any are configured,
/// otherwise every column except the species identifier and name.
pub fn traits_from_frame(df: &DataFrame, config: &HabitatConfig) -> Result<TraitTable> {
    const CONTEXT: &str = "traits";
    let cols = &config.columns;
    require_columns(df, &[cols.species.as_str()], CONTEXT)?;

    let trait_names: Vec<String> = if config.traits.is_empty() {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|n| n != &cols.species && n != &cols.species_name)
            .collect()
    } else {
        let names: Vec<&str> = config.traits.iter().map(|t| t.name.as_str()).collect();
        require_columns(df, &names, CONTEXT)?;
        names.into_iter().map(str::to_string).collect()
    };

    let species = string_values(df, &cols.species, CONTEXT)?;
    let columns: Vec<Vec<Option<TraitValue>>> = trait_names
        .iter()
        .map(|name| trait_column_values(df, name))
        .collect::<Result<_>>()?;

    let mut table = TraitTable::new(trait_names);
    let mut duplicates = 0usize;

    for (idx, id) in species.iter().enumerate() {
        let Some(id) = id else { continue };
        let values: Vec<Option<TraitValue>> = columns.iter().map(|c| c[idx].clone()).collect();
        if !table.insert(id, values)? {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        tracing::warn!("Ignored {} duplicate trait records (first record kept)", duplicates);
    }

    Ok(table)
}

/// Convert a species-list DataFrame; the name column is optional
pub fn species_from_frame(df: &DataFrame, config: &HabitatConfig) -> Result<SpeciesList> {
    const CONTEXT: &str = "species list";
    let cols = &config.columns;
    require_columns(df, &[cols.species.as_str()], CONTEXT)?;

    let ids = string_values(df, &cols.species, CONTEXT)?;
    let names: Vec<Option<String>> = if df.column(&cols.species_name).is_ok() {
        string_values(df, &cols.species_name, CONTEXT)?
    } else {
        vec![None; ids.len()]
    };

    let entries = ids
        .into_iter()
        .zip(names)
        .filter_map(|(id, name)| id.map(|id| SpeciesEntry { id, name }));

    Ok(SpeciesList::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttributeSpec;

    fn config() -> HabitatConfig {
        HabitatConfig {
            continuous: vec![AttributeSpec::new("MudPercent", "Mud (%)", "")],
            categorical: vec![AttributeSpec::new("Substrate", "Substrate", "")],
            families: Vec::new(),
            ..HabitatConfig::default()
        }
    }

    #[test]
    fn test_observations_from_frame() {
        let df = df![
            "aphia_id" => &[103228i64, 103228, 141433, 141433],
            "event_id" => &["X", "Y", "X", "Z"],
            "abundance" => &[Some(5.0), Some(15.0), Some(0.0), None],
            "MudPercent" => &[Some(20.0), Some(40.0), None, Some(1.0)],
            "Substrate" => &[Some("Sand"), Some("Sand"), Some("Mud"), Some("")],
        ].unwrap();

        let table = observations_from_frame(&df, &config()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].species_id, "103228");
        assert_eq!(table.rows()[1].continuous[0], Some(40.0));
        assert_eq!(table.rows()[1].categorical[0].as_deref(), Some("Sand"));
    }

    #[test]
    fn test_blank_category_is_missing() {
        let df = df![
            "aphia_id" => &["1"],
            "event_id" => &["e"],
            "abundance" => &[2.0],
            "MudPercent" => &[Some(1.0)],
            "Substrate" => &[Some("  ")],
        ].unwrap();

        let table = observations_from_frame(&df, &config()).unwrap();
        assert_eq!(table.rows()[0].categorical[0], None);
    }

    #[test]
    fn test_observations_missing_attribute_column() {
        let df = df![
            "aphia_id" => &["1"],
            "event_id" => &["e"],
            "abundance" => &[1.0],
            "MudPercent" => &[1.0],
        ].unwrap();

        let err = observations_from_frame(&df, &config()).unwrap_err();
        assert!(err.to_string().contains("Substrate"));
    }

    #[test]
    fn test_observations_reject_malformed_abundance() {
        let df = df![
            "aphia_id" => &["1", "2"],
            "event_id" => &["e", "f"],
            "abundance" => &["3", "many"],
            "MudPercent" => &[1.0, 2.0],
            "Substrate" => &["Sand", "Mud"],
        ].unwrap();

        assert!(observations_from_frame(&df, &config()).is_err());
    }

    #[test]
    fn test_traits_from_frame_typed_columns() {
        let df = df![
            "aphia_id" => &[103228i64, 141433, 103228],
            "soft_substrate" => &[Some(true), Some(false), Some(false)],
            "max_depth_m" => &[Some(50i64), None, Some(1)],
            "zone" => &[Some("shelf"), Some("littoral"), None],
        ].unwrap();

        let traits = traits_from_frame(&df, &config()).unwrap();
        assert_eq!(traits.columns(), &["soft_substrate", "max_depth_m", "zone"]);
        assert_eq!(traits.len(), 2);

        let first = traits.get("103228").unwrap();
        assert_eq!(first[0], Some(TraitValue::Flag(true)));
        assert_eq!(first[1], Some(TraitValue::Number(50.0)));
        assert_eq!(first[2], Some(TraitValue::Text("shelf".into())));
        assert_eq!(traits.get("141433").unwrap()[1], None);
    }

    #[test]
    fn test_traits_restricted_to_configured_names() {
        let df = df![
            "aphia_id" => &["1"],
            "soft_substrate" => &[true],
            "ignored" => &["x"],
        ].unwrap();

        let mut cfg = config();
        cfg.traits.push(AttributeSpec::new("soft_substrate", "Soft sediment", "BIOTIC"));

        let traits = traits_from_frame(&df, &cfg).unwrap();
        assert_eq!(traits.columns(), &["soft_substrate"]);
    }

    #[test]
    fn test_species_from_frame_with_and_without_names() {
        let with_names = df![
            "aphia_id" => &[Some("2"), None, Some("1")],
            "scientific_name" => &[Some("Abra alba"), Some("ghost"), None],
        ].unwrap();

        let list = species_from_frame(&with_names, &config()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.name_of("2"), Some("Abra alba"));

        let bare = df!["aphia_id" => &[5i64, 6]].unwrap();
        let list = species_from_frame(&bare, &config()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(!list.has_names());
    }
}
