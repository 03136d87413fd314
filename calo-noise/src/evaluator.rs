//! Per-cell noise: electronics and pileup added in quadrature.
//!
//! A cell identifier is first resolved into its radial layer and
//! pseudorapidity by the [`CellLocator`]. The noise constants of that layer
//! are then read from the [`NoiseTable`] at |eta| and combined as
//!
//! ```text
//! sigma = sqrt(electronics² + pileup²)
//! ```
//!
//! Cells that cannot be located, and lookups without a stored constant,
//! contribute zero noise. Evaluation only reads shared state, so a single
//! evaluator serves any number of threads.

use std::sync::Arc;

use calo_geometry::{CellId, CellPositionProvider, GeometryProvider};
use log::debug;
use rayon::prelude::*;

use crate::config::NoiseConfig;
use crate::error::InitError;
use crate::locator::CellLocator;
use crate::noise_table::{NoiseSource, NoiseTable};

/// Totals below this are reported as zero noise in the debug log
const ZERO_NOISE_LEVEL: f64 = 1e-3;

/// Anything that can tell the noise sigma of a cell.
pub trait NoiseLevel: Send + Sync {
    fn noise_level(&self, cell: CellId) -> f64;
}

impl<F> NoiseLevel for F
where
    F: Fn(CellId) -> f64 + Send + Sync,
{
    fn noise_level(&self, cell: CellId) -> f64 {
        self(cell)
    }
}

/// Combines cell location and the noise table into one noise value per cell.
#[derive(Debug, Clone)]
pub struct NoiseEvaluator {
    table: NoiseTable,
    locator: CellLocator,
    add_pileup: bool,
}

impl NoiseEvaluator {
    /// Pileup is included whenever the table was loaded with it.
    pub fn new(table: NoiseTable, locator: CellLocator) -> Self {
        let add_pileup = table.has_pileup();
        Self {
            table,
            locator,
            add_pileup,
        }
    }

    /// Validate the configuration, resolve the readout and load the histograms.
    ///
    /// # Arguments
    /// * `config` - Histogram names, layer count and readout selection
    /// * `geometry` - Provider of the configured readout
    /// * `position_tool` - Optional cell positions, used when segmentation eta is not
    ///
    /// # Returns
    /// * `Ok(NoiseEvaluator)` - Evaluator for cells of the configured readout
    /// * `Err(InitError)` - Configuration, geometry or histogram problem
    pub fn from_config<G: GeometryProvider + ?Sized>(
        config: &NoiseConfig,
        geometry: &G,
        position_tool: Option<Arc<dyn CellPositionProvider>>,
    ) -> Result<Self, InitError> {
        config.validate()?;
        let table = config.load_noise_table()?;
        let locator = CellLocator::from_config(geometry, config, position_tool)?;
        Ok(Self::new(table, locator))
    }

    pub fn table(&self) -> &NoiseTable {
        &self.table
    }

    pub fn locator(&self) -> &CellLocator {
        &self.locator
    }

    /// Total noise of a cell, `sqrt(electronics² + pileup²)`.
    ///
    /// # Returns
    /// Noise sigma of the cell; 0 for cells that cannot be located
    pub fn evaluate(&self, cell: CellId) -> f64 {
        let Some(coords) = self.locator.resolve(cell) else {
            return 0.0;
        };
        let abs_eta = coords.eta.abs();

        let elec_noise = self
            .table
            .lookup(NoiseSource::Electronics, coords.layer, abs_eta);
        let pileup_noise = if self.add_pileup {
            self.table.lookup(NoiseSource::Pileup, coords.layer, abs_eta)
        } else {
            0.0
        };

        let total_noise = (elec_noise * elec_noise + pileup_noise * pileup_noise).sqrt();
        if total_noise < ZERO_NOISE_LEVEL {
            debug!(
                "Zero noise: cell eta {} layer {} noise {total_noise}",
                coords.eta, coords.layer
            );
        }
        total_noise
    }

    /// Evaluate many cells in parallel.
    ///
    /// # Returns
    /// One noise value per cell, in the order of `cells`
    pub fn evaluate_many(&self, cells: &[CellId]) -> Vec<f64> {
        cells.par_iter().map(|&cell| self.evaluate(cell)).collect()
    }
}

impl NoiseLevel for NoiseEvaluator {
    fn noise_level(&self, cell: CellId) -> f64 {
        self.evaluate(cell)
    }
}
