//! calo-noise - Histogram-based noise for calorimeter cells
//!
//! Noise constants are stored per radial layer as 1D histograms in |eta|.
//! This crate turns them into per-cell noise levels and applies them to
//! batches of cell energies:
//!
//! - **NoiseTable** - Electronics and pileup noise histograms, one per layer
//! - **CellLocator** - Resolves a cell identifier into (layer, eta)
//! - **NoiseEvaluator** - Electronics and pileup noise added in quadrature
//! - **CellProcessor** - Gaussian noise injection and sigma-threshold filtering
//!
//! # Example
//!
//! ```text
//! use calo_geometry::Detector;
//! use calo_noise::{CellEnergies, CellProcessor, NoiseConfig};
//!
//! let config = NoiseConfig::load_from_file("noise.json".as_ref())?;
//! let detector = Detector::load_from_file("detector.json".as_ref())?;
//! let mut processor = CellProcessor::from_config(&config, &detector, None, 42)?;
//!
//! let mut cells = CellEnergies::new();
//! cells.insert(0x1234, 0.8);
//! processor.noise_then_filter(&mut cells);
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod histogram;
pub mod locator;
pub mod noise_table;
pub mod processor;

pub use calo_geometry::{CellEnergies, CellId};
pub use config::NoiseConfig;
pub use error::{ConfigError, InitError, LoadError};
pub use evaluator::{NoiseEvaluator, NoiseLevel};
pub use histogram::{Histogram1D, HistogramSet, HistogramSource};
pub use locator::{CellCoordinates, CellLocator, LocatorMode};
pub use noise_table::{layer_histogram_name, NoiseSource, NoiseTable};
pub use processor::CellProcessor;
