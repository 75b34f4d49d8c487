//! Core input types
//!
//! Observations, the trait reference and the species list, held as typed
//! in-memory tables once loaded. Nothing here is mutated after construction.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{HabitatError, HabitatResult};

/// Continuous attribute values of one observation, aligned with the schema
pub type ContinuousValues = SmallVec<[Option<f64>; 4]>;

/// Categorical attribute values of one observation, aligned with the schema
pub type CategoricalValues = SmallVec<[Option<String>; 6]>;

/// Ordered names of the continuous and categorical attributes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributeSchema {
    continuous: Vec<String>,
    categorical: Vec<String>,
}

impl AttributeSchema {
    pub fn new(continuous: Vec<String>, categorical: Vec<String>) -> Self {
        Self { continuous, categorical }
    }

    pub fn continuous(&self) -> &[String] {
        &self.continuous
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    pub fn continuous_index(&self, name: &str) -> Option<usize> {
        self.continuous.iter().position(|n| n == name)
    }

    pub fn categorical_index(&self, name: &str) -> Option<usize> {
        self.categorical.iter().position(|n| n == name)
    }
}

/// Abundance of one species at one sampling event, annotated with habitat
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub species_id: String,
    pub event_id: String,
    pub abundance: f64,
    pub continuous: ContinuousValues,
    pub categorical: CategoricalValues,
}

/// All observations plus the schema their attribute vectors follow
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    schema: AttributeSchema,
    rows: Vec<Observation>,
}

impl ObservationTable {
    /// Build a table, checking every row against the schema
    ///
    /// Abundance must be finite and > 0; zero or missing abundances are
    /// expected to have been dropped by the loader.
    pub fn new(schema: AttributeSchema, rows: Vec<Observation>) -> HabitatResult<Self> {
        for (row, obs) in rows.iter().enumerate() {
            if !(obs.abundance.is_finite() && obs.abundance > 0.0) {
                return Err(HabitatError::MalformedObservation {
                    row,
                    reason: format!("abundance must be > 0, got {}", obs.abundance),
                });
            }
            if obs.continuous.len() != schema.continuous.len() {
                return Err(HabitatError::MalformedObservation {
                    row,
                    reason: format!(
                        "expected {} continuous values, got {}",
                        schema.continuous.len(),
                        obs.continuous.len()
                    ),
                });
            }
            if obs.categorical.len() != schema.categorical.len() {
                return Err(HabitatError::MalformedObservation {
                    row,
                    reason: format!(
                        "expected {} categorical values, got {}",
                        schema.categorical.len(),
                        obs.categorical.len()
                    ),
                });
            }
        }

        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct species identifiers, ascending
    pub fn species_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self.rows.iter().map(|o| o.species_id.as_str()).collect();
        ids.into_iter().map(str::to_string).collect()
    }

    /// Number of distinct sampling events
    pub fn event_count(&self) -> usize {
        let events: BTreeSet<&str> = self.rows.iter().map(|o| o.event_id.as_str()).collect();
        events.len()
    }

    pub fn observations_for<'a>(&'a self, species_id: &'a str) -> impl Iterator<Item = &'a Observation> + 'a {
        self.rows.iter().filter(move |o| o.species_id == species_id)
    }
}

/// One field of a species trait record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for TraitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitValue::Flag(b) => write!(f, "{}", b),
            TraitValue::Number(n) => write!(f, "{}", n),
            TraitValue::Text(s) => f.write_str(s),
        }
    }
}

/// Sparse species trait reference keyed by species identifier
#[derive(Debug, Clone, Default)]
pub struct TraitTable {
    columns: Vec<String>,
    records: FxHashMap<String, Vec<Option<TraitValue>>>,
}

impl TraitTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: FxHashMap::default(),
        }
    }

    /// Add a record; a repeated species identifier keeps the first record
    pub fn insert(&mut self, species_id: &str, values: Vec<Option<TraitValue>>) -> HabitatResult<bool> {
        if values.len() != self.columns.len() {
            return Err(HabitatError::TraitArity {
                species: species_id.to_string(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        if self.records.contains_key(species_id) {
            return Ok(false);
        }
        self.records.insert(species_id.to_string(), values);
        Ok(true)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, species_id: &str) -> Option<&[Option<TraitValue>]> {
        self.records.get(species_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A species of interest, with an optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesEntry {
    pub id: String,
    pub name: Option<String>,
}

/// Ordered, de-duplicated list of species to summarize
#[derive(Debug, Clone, Default)]
pub struct SpeciesList {
    entries: Vec<SpeciesEntry>,
    index: FxHashMap<String, usize>,
}

impl SpeciesList {
    pub fn new(entries: impl IntoIterator<Item = SpeciesEntry>) -> Self {
        let mut list = Self::default();
        for entry in entries {
            if list.index.contains_key(&entry.id) {
                continue;
            }
            list.index.insert(entry.id.clone(), list.entries.len());
            list.entries.push(entry);
        }
        list
    }

    /// Species list without names, in the given order
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Self {
        Self::new(ids.iter().map(|id| SpeciesEntry {
            id: id.as_ref().to_string(),
            name: None,
        }))
    }

    pub fn entries(&self) -> &[SpeciesEntry] {
        &self.entries
    }

    pub fn name_of(&self, species_id: &str) -> Option<&str> {
        self.index
            .get(species_id)
            .and_then(|&i| self.entries[i].name.as_deref())
    }

    pub fn has_names(&self) -> bool {
        self.entries.iter().any(|e| e.name.is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
