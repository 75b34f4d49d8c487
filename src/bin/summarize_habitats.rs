//! Batch habitat summarization
//!
//! Loads observations (plus optional traits and species list), writes the
//! all-species wide table, its metadata table, the event baseline and,
//! optionally, one JSON report per species.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use habitat_summarizer_rust::report::{build_species_report, write_reports};
use habitat_summarizer_rust::{
    build_wide_table, describe_columns, event_baseline_frame, metadata_frame, DataPaths,
    EventWeighting, HabitatConfig, HabitatData, HabitatSummarizer,
};
use habitat_summarizer_rust::utils::write_table;

#[derive(Parser, Debug)]
#[command(name = "summarize_habitats", about = "Abundance-weighted habitat summaries per species")]
struct Args {
    /// Observation table (CSV or Parquet)
    #[arg(long)]
    observations: PathBuf,

    /// Species trait reference keyed by species id
    #[arg(long)]
    traits: Option<PathBuf>,

    /// Species of interest (id, optional name); defaults to every observed species
    #[arg(long)]
    species: Option<PathBuf>,

    /// JSON configuration; defaults to the built-in marine attribute catalogue
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wide summary table (.csv or .parquet)
    #[arg(short, long, default_value = "output/species_habitat_summary.csv")]
    output: PathBuf,

    /// Column metadata table
    #[arg(long, default_value = "output/species_habitat_metadata.csv")]
    metadata: PathBuf,

    /// Event-level baseline table
    #[arg(long, default_value = "output/event_habitat_baseline.csv")]
    events_output: PathBuf,

    /// Baseline weighting: per-event or per-occurrence
    #[arg(long, default_value_t = EventWeighting::PerEvent)]
    event_weighting: EventWeighting,

    /// Write one JSON report per species into this directory
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Print the JSON report for a single species to stdout and exit
    #[arg(long)]
    species_id: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habitat_summarizer_rust=info,summarize_habitats=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let start = Instant::now();

    let config = match &args.config {
        Some(path) => HabitatConfig::load(path)?,
        None => HabitatConfig::default(),
    };

    let paths = DataPaths {
        observations: args.observations.clone(),
        traits: args.traits.clone(),
        species: args.species.clone(),
    };
    let data = HabitatData::load(&paths, &config)?;

    let mut summarizer = HabitatSummarizer::new(&data.observations);
    if let Some(traits) = &data.traits {
        summarizer = summarizer.with_traits(traits);
    }

    let baseline = summarizer.summarize_events(args.event_weighting);
    tracing::info!(
        "Event baseline ({}): {} events, {} rows",
        baseline.weighting,
        baseline.n_events,
        baseline.n_rows
    );

    if let Some(species_id) = &args.species_id {
        let mut summary = summarizer.summarize_species(species_id);
        if summary.total_occ == 0 {
            tracing::warn!("Species '{}' has no observations", species_id);
        }
        summary.species_name = data
            .species
            .as_ref()
            .and_then(|s| s.name_of(species_id))
            .map(str::to_string);

        let report = build_species_report(&config, &summary, &baseline);
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize species report")?;
        println!("{}", json);
        return Ok(());
    }

    let summaries = summarizer.summarize_all(data.species.as_ref());
    if summaries.is_empty() {
        bail!("No species to summarize: observation table and species list are both empty");
    }

    let mut wide = build_wide_table(&config, &summaries)?;
    write_table(&mut wide.frame, &args.output)?;
    tracing::info!("Wide table written: {:?}", args.output);

    let mut metadata = metadata_frame(&describe_columns(&config, &wide.plan))?;
    write_table(&mut metadata, &args.metadata)?;
    tracing::info!("Metadata written: {:?} ({} columns described)", args.metadata, metadata.height());

    let mut events = event_baseline_frame(&baseline)?;
    write_table(&mut events, &args.events_output)?;
    tracing::info!("Event baseline written: {:?}", args.events_output);

    if let Some(dir) = &args.reports_dir {
        write_reports(dir, &config, &summaries, &baseline)?;
    }

    tracing::info!("Done in {:.2?}", start.elapsed());
    Ok(())
}
