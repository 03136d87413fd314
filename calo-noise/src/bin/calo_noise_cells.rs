//! Apply histogram-based noise to a JSON map of calorimeter cell energies

use std::path::PathBuf;

use anyhow::{Context, Result};
use calo_geometry::Detector;
use calo_noise::{CellEnergies, CellProcessor, NoiseConfig};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Add Gaussian noise to calorimeter cells and filter below threshold")]
struct Args {
    /// Noise configuration (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Detector geometry description (JSON)
    #[arg(long)]
    geometry: PathBuf,

    /// Input cell energies, a JSON map of cell id to energy
    #[arg(long)]
    cells: PathBuf,

    /// Output file for the processed cell energies
    #[arg(long, default_value = "cells_noisy.json")]
    output: PathBuf,

    /// Seed for the Gaussian noise generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Do not add random noise to the cells
    #[arg(long, default_value_t = false)]
    skip_noise: bool,

    /// Do not remove cells below the noise threshold
    #[arg(long, default_value_t = false)]
    skip_filter: bool,

    /// Override the configured filter threshold (in units of sigma)
    #[arg(long)]
    threshold: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NoiseConfig::load_from_file(path)
            .with_context(|| format!("loading noise config {}", path.display()))?,
        None => NoiseConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.filter_threshold = threshold;
    }

    let detector = Detector::load_from_file(&args.geometry)
        .with_context(|| format!("loading geometry {}", args.geometry.display()))?;
    let mut processor = CellProcessor::from_config(&config, &detector, None, args.seed)?;

    let json = std::fs::read_to_string(&args.cells)
        .with_context(|| format!("reading cells {}", args.cells.display()))?;
    let mut cells: CellEnergies = serde_json::from_str(&json)
        .with_context(|| format!("parsing cells {}", args.cells.display()))?;
    info!("Read {} cells from {}", cells.len(), args.cells.display());

    if !args.skip_noise {
        processor.add_random_cell_noise(&mut cells);
        info!("Added noise to {} cells", cells.len());
    }
    if !args.skip_filter {
        let removed = processor.filter_cell_noise(&mut cells);
        info!(
            "Filtered {removed} cells below {}*sigma, {} remain",
            processor.filter_threshold(),
            cells.len()
        );
    }

    std::fs::write(&args.output, serde_json::to_string_pretty(&cells)?)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("Wrote {} cells to {}", cells.len(), args.output.display());

    Ok(())
}
