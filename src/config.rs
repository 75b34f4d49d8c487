//! Summarizer Configuration
//!
//! Names the input columns, the closed catalogue of continuous and categorical
//! habitat attributes, the curated families used to order output columns, and
//! descriptions/provenance for the metadata table.
//!
//! Loaded from JSON; `HabitatConfig::default()` describes the marine
//! sediment + seabed-habitat dataset.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};

use crate::error::{HabitatError, HabitatResult};
use crate::types::AttributeSchema;

pub const SEDIMENT_SOURCE: &str = "Seabed sediment grain-size layer (spatially matched to sampling events)";
pub const HABITAT_SOURCE: &str = "EUSeaMap broad-scale seabed habitat map (spatially matched to sampling events)";
pub const ABUNDANCE_SOURCE: &str = "Species abundance records";

/// One named habitat attribute (or trait) with its metadata
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AttributeSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub source: String,
}

impl AttributeSpec {
    pub fn new(name: &str, description: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            source: source.to_string(),
        }
    }
}

/// Curated group of attributes, laid out together in the wide table
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ColumnFamily {
    pub name: String,
    pub attributes: Vec<String>,
}

/// Names of the identifier and abundance columns in the input tables
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputColumns {
    /// Species identifier (observations, traits, species list)
    pub species: String,
    /// Sampling-event identifier (observations)
    pub event: String,
    /// Abundance (observations)
    pub abundance: String,
    /// Optional display name (species list)
    pub species_name: String,
}

impl Default for InputColumns {
    fn default() -> Self {
        Self {
            species: "aphia_id".to_string(),
            event: "event_id".to_string(),
            abundance: "abundance".to_string(),
            species_name: "scientific_name".to_string(),
        }
    }
}

/// Complete summarizer configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HabitatConfig {
    #[serde(default)]
    pub columns: InputColumns,

    /// Continuous attributes (weighted means)
    #[serde(default)]
    pub continuous: Vec<AttributeSpec>,

    /// Categorical attributes (weighted frequencies)
    #[serde(default)]
    pub categorical: Vec<AttributeSpec>,

    /// Output column grouping, in presentation order
    #[serde(default)]
    pub families: Vec<ColumnFamily>,

    /// Descriptions for trait columns; unlisted trait columns get a generic entry
    #[serde(default)]
    pub traits: Vec<AttributeSpec>,

    /// Tokens read as missing in CSV inputs
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
}

fn default_null_values() -> Vec<String> {
    vec!["NA".to_string(), "".to_string()]
}

impl Default for HabitatConfig {
    fn default() -> Self {
        Self {
            columns: InputColumns::default(),
            continuous: vec![
                AttributeSpec::new("MudPercent", "Mud fraction of the seabed sediment (%)", SEDIMENT_SOURCE),
                AttributeSpec::new("SandPercent", "Sand fraction of the seabed sediment (%)", SEDIMENT_SOURCE),
                AttributeSpec::new("GravelPercent", "Gravel fraction of the seabed sediment (%)", SEDIMENT_SOURCE),
            ],
            categorical: vec![
                AttributeSpec::new("Folk", "Folk sediment class", SEDIMENT_SOURCE),
                AttributeSpec::new("Substrate", "Broad seabed substrate type", HABITAT_SOURCE),
                AttributeSpec::new("MSFD_BBHT", "MSFD broad benthic habitat type", HABITAT_SOURCE),
                AttributeSpec::new("Biozone", "Biological depth zone", HABITAT_SOURCE),
                AttributeSpec::new("Energy", "Seabed kinetic energy class", HABITAT_SOURCE),
            ],
            families: vec![
                ColumnFamily {
                    name: "sediment".to_string(),
                    attributes: vec![
                        "MudPercent".to_string(),
                        "SandPercent".to_string(),
                        "GravelPercent".to_string(),
                        "Folk".to_string(),
                    ],
                },
                ColumnFamily {
                    name: "seabed_habitat".to_string(),
                    attributes: vec!["Substrate".to_string(), "MSFD_BBHT".to_string()],
                },
                ColumnFamily {
                    name: "physical_setting".to_string(),
                    attributes: vec!["Biozone".to_string(), "Energy".to_string()],
                },
            ],
            traits: Vec::new(),
            null_values: default_null_values(),
        }
    }
}

impl HabitatConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: HabitatConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Check the attribute catalogue and family layout are consistent
    pub fn validate(&self) -> HabitatResult<()> {
        if self.continuous.is_empty() && self.categorical.is_empty() {
            return Err(HabitatError::Config(
                "at least one continuous or categorical attribute is required".to_string(),
            ));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for spec in self.continuous.iter().chain(&self.categorical) {
            if spec.name.trim().is_empty() {
                return Err(HabitatError::Config("attribute names must not be empty".to_string()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(HabitatError::DuplicateAttribute(spec.name.clone()));
            }
        }

        let mut placed: HashSet<&str> = HashSet::new();
        for family in &self.families {
            for attribute in &family.attributes {
                if !seen.contains(attribute.as_str()) {
                    return Err(HabitatError::UnknownFamilyAttribute {
                        family: family.name.clone(),
                        attribute: attribute.clone(),
                    });
                }
                if !placed.insert(attribute.as_str()) {
                    return Err(HabitatError::Config(format!(
                        "attribute '{}' is assigned to more than one family",
                        attribute
                    )));
                }
            }
        }

        Ok(())
    }

    /// Attribute names in configuration order
    pub fn schema(&self) -> AttributeSchema {
        AttributeSchema::new(
            self.continuous.iter().map(|s| s.name.clone()).collect(),
            self.categorical.iter().map(|s| s.name.clone()).collect(),
        )
    }

    /// Look up a continuous or categorical attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.continuous
            .iter()
            .chain(&self.categorical)
            .find(|s| s.name == name)
    }

    pub fn trait_spec(&self, name: &str) -> Option<&AttributeSpec> {
        self.traits.iter().find(|s| s.name == name)
    }

    /// Attributes in presentation order: families first, then unassigned ones
    pub fn ordered_attributes(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = self
            .families
            .iter()
            .flat_map(|f| f.attributes.iter().map(String::as_str))
            .collect();

        let placed: HashSet<&str> = ordered.iter().copied().collect();
        for spec in self.continuous.iter().chain(&self.categorical) {
            if !placed.contains(spec.name.as_str()) {
                ordered.push(spec.name.as_str());
            }
        }

        ordered
    }
}
