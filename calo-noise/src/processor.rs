//! Batch operations on cell energies: Gaussian noise injection and
//! sigma-threshold filtering.
//!
//! Both operations take the noise sigma of each cell from a [`NoiseLevel`],
//! usually a [`NoiseEvaluator`] built from the noise histograms.
//!
//! # Core Operations
//!
//! ## Noise Injection
//! Every cell energy is shifted by `sigma * N(0, 1)`, one independent draw
//! per cell. Draws come from the generator owned by the processor, in cell
//! identifier order, so a fixed seed reproduces the same noisy batch.
//!
//! ## Noise Filtering
//! Cells with `energy < threshold * sigma` are removed from the batch. Cells
//! with zero sigma are kept whenever their energy is non-negative.
//!
//! # Usage
//!
//! Reproducing detector behaviour usually means injecting noise first and
//! filtering afterwards, see [`CellProcessor::noise_then_filter`].

use std::sync::Arc;

use calo_geometry::{CellEnergies, CellPositionProvider, GeometryProvider};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use crate::config::NoiseConfig;
use crate::error::InitError;
use crate::evaluator::{NoiseEvaluator, NoiseLevel};

/// Applies per-cell noise levels to cell energy maps.
///
/// Owns its random number generator, so each processing context gets its
/// own reproducible noise sequence.
#[derive(Debug, Clone)]
pub struct CellProcessor<N, R = StdRng> {
    noise: N,
    filter_threshold: f64,
    rng: R,
}

impl<N: NoiseLevel> CellProcessor<N, StdRng> {
    /// Processor with a `StdRng` seeded from `seed`.
    ///
    /// # Arguments
    /// * `noise` - Source of per-cell noise sigma
    /// * `filter_threshold` - Cut in units of sigma
    /// * `seed` - Random seed for deterministic output
    pub fn with_seed(noise: N, filter_threshold: f64, seed: u64) -> Self {
        Self::new(noise, filter_threshold, StdRng::seed_from_u64(seed))
    }
}

impl CellProcessor<NoiseEvaluator, StdRng> {
    /// Build the evaluator from `config` and use its `filter_threshold`.
    ///
    /// # Returns
    /// * `Ok(CellProcessor)` - Ready to process batches of the configured readout
    /// * `Err(InitError)` - Invalid configuration, geometry or histograms
    pub fn from_config<G: GeometryProvider + ?Sized>(
        config: &NoiseConfig,
        geometry: &G,
        position_tool: Option<Arc<dyn CellPositionProvider>>,
        seed: u64,
    ) -> Result<Self, InitError> {
        let evaluator = NoiseEvaluator::from_config(config, geometry, position_tool)?;
        Ok(Self::with_seed(evaluator, config.filter_threshold, seed))
    }
}

impl<N: NoiseLevel, R: Rng> CellProcessor<N, R> {
    /// # Arguments
    /// * `noise` - Source of per-cell noise sigma
    /// * `filter_threshold` - Cells below `filter_threshold * sigma` are removed
    /// * `rng` - Generator for the Gaussian draws
    pub fn new(noise: N, filter_threshold: f64, rng: R) -> Self {
        debug!("Filter noise threshold: {filter_threshold}*sigma");
        Self {
            noise,
            filter_threshold,
            rng,
        }
    }

    pub fn noise(&self) -> &N {
        &self.noise
    }

    pub fn filter_threshold(&self) -> f64 {
        self.filter_threshold
    }

    /// Add `sigma * N(0, 1)` to every cell energy, one independent draw per cell.
    ///
    /// Cells are visited in identifier order, so the result depends only on
    /// the generator state and the map contents.
    pub fn add_random_cell_noise(&mut self, cells: &mut CellEnergies) {
        for (&cell, energy) in cells.iter_mut() {
            let draw: f64 = StandardNormal.sample(&mut self.rng);
            *energy += self.noise.noise_level(cell) * draw;
        }
    }

    /// Remove every cell with `energy < filter_threshold * sigma`.
    ///
    /// # Returns
    /// Number of removed cells
    pub fn filter_cell_noise(&self, cells: &mut CellEnergies) -> usize {
        let before = cells.len();
        cells.retain(|&cell, energy| {
            *energy >= self.filter_threshold * self.noise.noise_level(cell)
        });
        let removed = before - cells.len();
        debug!("Noise filter removed {removed} of {before} cells");
        removed
    }

    /// Inject noise, then filter.
    ///
    /// # Returns
    /// Number of cells removed by the filter
    pub fn noise_then_filter(&mut self, cells: &mut CellEnergies) -> usize {
        self.add_random_cell_noise(cells);
        self.filter_cell_noise(cells)
    }
}
