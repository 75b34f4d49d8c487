//! Species Report Generator
//!
//! Builds `SpeciesReport`s from summaries and writes them as JSON, one file
//! per species.
//!
//! Public API (consumed by the summarize_habitats binary):
//! - build_species_report(config, summary, baseline) -> SpeciesReport
//! - write_reports(dir, config, summaries, baseline) -> Result<usize>

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::affinity::{category_affinities, continuous_shifts};
use crate::config::HabitatConfig;
use crate::report::{
    BaselineInfo, CategoricalPanel, CategoryBar, ContinuousPanel, OccurrencePanel, SpeciesReport,
};
use crate::summarizer::{EventHabitatSummary, HabitatProfile, SpeciesHabitatSummary};
use crate::table::category_column;

fn label_for(config: &HabitatConfig, attribute: &str) -> String {
    config
        .attribute(attribute)
        .map(|s| s.description.clone())
        .unwrap_or_else(|| attribute.to_string())
}

/// Assemble the report for one species, panels in curated attribute order
pub fn build_species_report(
    config: &HabitatConfig,
    summary: &SpeciesHabitatSummary,
    baseline: &EventHabitatSummary,
) -> SpeciesReport {
    let shifts = continuous_shifts(summary, baseline);
    let affinities = category_affinities(summary, baseline);

    let mut continuous = Vec::new();
    let mut categorical = Vec::new();

    for attribute in config.ordered_attributes() {
        if let Some(shift) = shifts.iter().find(|s| s.attribute == attribute) {
            continuous.push(ContinuousPanel {
                attribute: attribute.to_string(),
                label: label_for(config, attribute),
                species_mean: shift.species_mean,
                baseline_mean: shift.baseline_mean,
                difference: shift.difference,
            });
            continue;
        }

        if let Some(freq) = summary.categories(attribute) {
            let bars = affinities
                .iter()
                .filter(|a| a.attribute == attribute)
                .map(|a| CategoryBar {
                    category: a.category.clone(),
                    column: category_column(attribute, &a.category),
                    species_frequency: a.species_frequency,
                    baseline_frequency: a.baseline_frequency,
                    affinity: a.affinity,
                })
                .collect();

            categorical.push(CategoricalPanel {
                attribute: attribute.to_string(),
                label: label_for(config, attribute),
                bars,
                missing: freq.missing,
            });
        }
    }

    SpeciesReport {
        species_id: summary.species_id.clone(),
        species_name: summary.species_name.clone(),
        occurrence: OccurrencePanel {
            total_occ: summary.total_occ,
            total_abund: summary.total_abund,
            mean_abund: summary.mean_abund,
        },
        continuous,
        categorical,
        traits: summary.traits.clone(),
        baseline: BaselineInfo {
            weighting: baseline.weighting,
            n_events: baseline.n_events,
            n_rows: baseline.n_rows,
        },
    }
}

/// File name for a species report; identifier characters outside
/// `[A-Za-z0-9_-]` become `_`
pub fn report_file_name(species_id: &str) -> String {
    let safe: String = species_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.json", safe)
}

/// One file name per summary
///
/// Identifiers that sanitize to the same name get `_<hash>` of the raw
/// identifier appended, so no report overwrites another.
pub fn report_file_names(summaries: &[SpeciesHabitatSummary]) -> Result<Vec<String>> {
    let mut ids_by_name: FxHashMap<String, FxHashSet<&str>> = FxHashMap::default();
    for summary in summaries {
        ids_by_name
            .entry(report_file_name(&summary.species_id))
            .or_default()
            .insert(summary.species_id.as_str());
    }

    let names: Vec<String> = summaries
        .iter()
        .map(|summary| {
            let name = report_file_name(&summary.species_id);
            let shared = ids_by_name.get(&name).map_or(false, |ids| ids.len() > 1);
            if !shared {
                return name;
            }
            let mut hasher = FxHasher::default();
            summary.species_id.hash(&mut hasher);
            let stem = name.trim_end_matches(".json");
            format!("{}_{:08x}.json", stem, hasher.finish() as u32)
        })
        .collect();

    let mut owner: FxHashMap<&str, &str> = FxHashMap::default();
    for (name, summary) in names.iter().zip(summaries) {
        if let Some(other) = owner.insert(name.as_str(), summary.species_id.as_str()) {
            if other != summary.species_id {
                bail!(
                    "Species '{}' and '{}' map to the same report file '{}'",
                    other,
                    summary.species_id,
                    name
                );
            }
        }
    }

    Ok(names)
}

/// Write one pretty-printed JSON report per species into `dir`
///
/// Returns the number of files written.
pub fn write_reports(
    dir: &Path,
    config: &HabitatConfig,
    summaries: &[SpeciesHabitatSummary],
    baseline: &EventHabitatSummary,
) -> Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory: {:?}", dir))?;

    let names = report_file_names(summaries)?;

    summaries
        .par_iter()
        .zip(names.par_iter())
        .map(|(summary, name)| {
            let report = build_species_report(config, summary, baseline);
            let path = dir.join(name);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create report: {:?}", path))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &report)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
            writer
                .flush()
                .with_context(|| format!("Failed to flush report: {:?}", path))
        })
        .collect::<Result<Vec<()>>>()?;

    let written: FxHashSet<&str> = names.iter().map(String::as_str).collect();
    tracing::info!("Wrote {} species reports to {:?}", written.len(), dir);
    Ok(written.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarizer::{summarize_all, summarize_events, EventWeighting};
    use crate::types::{Observation, ObservationTable};
    use approx::assert_relative_eq;
    use smallvec::smallvec;

    fn table(config: &HabitatConfig) -> ObservationTable {
        let schema = config.schema();
        let mk = |species: &str, event: &str, abundance: f64, substrate: &str| {
            let mut categorical: crate::types::CategoricalValues =
                smallvec![None; schema.categorical().len()];
            categorical[1] = Some(substrate.to_string());
            Observation {
                species_id: species.to_string(),
                event_id: event.to_string(),
                abundance,
                continuous: smallvec![Some(25.0), Some(70.0), Some(5.0)],
                categorical,
            }
        };

        ObservationTable::new(
            schema.clone(),
            vec![
                mk("103228", "X", 5.0, "Sand"),
                mk("103228", "Y", 15.0, "Sand"),
                mk("141433", "Z", 1.0, "Mud"),
            ],
        ).unwrap()
    }

    #[test]
    fn test_report_panels_follow_family_order() {
        let config = HabitatConfig::default();
        let t = table(&config);
        let baseline = summarize_events(&t, EventWeighting::PerEvent);
        let summaries = summarize_all(&t, None);

        let report = build_species_report(&config, &summaries[0], &baseline);
        assert_eq!(report.species_id, "103228");
        assert_eq!(report.occurrence.total_occ, 2);

        let cont: Vec<&str> = report.continuous.iter().map(|p| p.attribute.as_str()).collect();
        assert_eq!(cont, vec!["MudPercent", "SandPercent", "GravelPercent"]);

        let cats: Vec<&str> = report.categorical.iter().map(|p| p.attribute.as_str()).collect();
        assert_eq!(cats, vec!["Folk", "Substrate", "MSFD_BBHT", "Biozone", "Energy"]);

        let substrate = &report.categorical[1];
        let sand = substrate.bars.iter().find(|b| b.category == "Sand").unwrap();
        assert_eq!(sand.column, "Substrate_Sand");
        assert_relative_eq!(sand.species_frequency, 1.0);
        assert_relative_eq!(sand.baseline_frequency, 2.0 / 3.0);
        assert_relative_eq!(sand.affinity.unwrap(), 1.5);

        // Unmatched habitat layers show up as a full missing share
        assert_relative_eq!(report.categorical[0].missing, 1.0);
    }

    #[test]
    fn test_report_file_name_sanitized() {
        assert_eq!(report_file_name("103228"), "103228.json");
        assert_eq!(report_file_name("urn:lsid/1"), "urn_lsid_1.json");
    }

    #[test]
    fn test_colliding_ids_get_distinct_report_files() {
        let config = HabitatConfig::default();
        let t = table(&config);
        let baseline = summarize_events(&t, EventWeighting::PerEvent);

        let mut first = summarize_all(&t, None).remove(0);
        first.species_id = "a:1".to_string();
        let mut second = first.clone();
        second.species_id = "a_1".to_string();
        let plain = summarize_all(&t, None).remove(1);
        let summaries = vec![first, second, plain];

        let names = report_file_names(&summaries).unwrap();
        assert_ne!(names[0], names[1]);
        assert!(names[0].starts_with("a_1_") && names[1].starts_with("a_1_"));
        assert_eq!(names[2], "141433.json");

        let dir = tempfile::tempdir().unwrap();
        let n = write_reports(dir.path(), &config, &summaries, &baseline).unwrap();
        assert_eq!(n, 3);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);

        let text = fs::read_to_string(dir.path().join(&names[0])).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["species_id"], "a:1");
    }

    #[test]
    fn test_write_reports() {
        let config = HabitatConfig::default();
        let t = table(&config);
        let baseline = summarize_events(&t, EventWeighting::PerEvent);
        let summaries = summarize_all(&t, None);

        let dir = tempfile::tempdir().unwrap();
        let n = write_reports(dir.path(), &config, &summaries, &baseline).unwrap();
        assert_eq!(n, 2);

        let text = fs::read_to_string(dir.path().join("141433.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["occurrence"]["total_occ"], 1);
        assert_eq!(json["baseline"]["weighting"], "per-event");
    }
}
