//! Cell positions in detector coordinates.
//!
//! Positions are in millimetres with `z` along the beam axis. Providers
//! return `None` for cells they cannot place.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use nalgebra::Vector3;
use serde::Serialize;

use crate::bitfield::{BitField, BitFieldDecoder, CellId};
use crate::error::GeometryError;
use crate::segmentation::GridPhiEta;
use crate::CellEnergies;

/// Maps a cell identifier to the 3D position of the cell centre.
pub trait CellPositionProvider: Send + Sync {
    fn xyz_position(&self, cell: CellId) -> Option<Vector3<f64>>;
}

/// Pseudorapidity of a point seen from the origin, `asinh(z / rho)`.
///
/// # Returns
/// Pseudorapidity of `position`; 0 at the origin and ±∞ on the beam axis
pub fn pseudorapidity(position: &Vector3<f64>) -> f64 {
    let rho = position.x.hypot(position.y);
    if rho == 0.0 && position.z == 0.0 {
        return 0.0;
    }
    (position.z / rho).asinh()
}

/// Azimuthal angle of a point.
///
/// # Returns
/// Angle from the x axis in (-π, π]
pub fn azimuth(position: &Vector3<f64>) -> f64 {
    position.y.atan2(position.x)
}

/// Cylindrical barrel where every layer sits at a fixed radius.
///
/// Eta and phi come from an eta-phi grid; the radius comes from the layer
/// field of the identifier.
#[derive(Debug, Clone)]
pub struct BarrelLayerPositions {
    grid: GridPhiEta,
    layer: BitField,
    radii: Vec<f64>,
}

impl BarrelLayerPositions {
    /// # Arguments
    /// * `grid` - Eta-phi segmentation of the barrel
    /// * `decoder` - Decoder of the barrel readout
    /// * `layer_field` - Name of the layer field in the identifier
    /// * `radii` - Radius of each layer centre in mm, indexed by layer value
    pub fn new(
        grid: GridPhiEta,
        decoder: &BitFieldDecoder,
        layer_field: &str,
        radii: Vec<f64>,
    ) -> Result<Self, GeometryError> {
        if radii.is_empty() || radii.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(GeometryError::InvalidSegmentation(
                "layer radii must be positive".to_string(),
            ));
        }
        Ok(Self {
            grid,
            layer: decoder.require_field(layer_field)?.clone(),
            radii,
        })
    }
}

impl CellPositionProvider for BarrelLayerPositions {
    fn xyz_position(&self, cell: CellId) -> Option<Vector3<f64>> {
        let layer = usize::try_from(self.layer.value(cell)).ok()?;
        let radius = *self.radii.get(layer)?;
        let phi = self.grid.phi(cell);
        Some(Vector3::new(
            radius * phi.cos(),
            radius * phi.sin(),
            radius * self.grid.eta(cell).sinh(),
        ))
    }
}

/// A cell together with its energy and position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedCell {
    pub cell_id: CellId,
    pub energy: f64,
    pub position: Option<Vector3<f64>>,
}

/// Routes each cell to the position provider of its calorimeter system.
///
/// The system is read from a field of the identifier (usually `system`);
/// cells of systems without a registered provider have no position.
pub struct SystemDispatchPositions {
    system: BitField,
    providers: BTreeMap<i64, Arc<dyn CellPositionProvider>>,
}

impl SystemDispatchPositions {
    pub fn new(decoder: &BitFieldDecoder, system_field: &str) -> Result<Self, GeometryError> {
        Ok(Self {
            system: decoder.require_field(system_field)?.clone(),
            providers: BTreeMap::new(),
        })
    }

    /// Register the provider for one system id, replacing any previous one.
    pub fn with_provider(mut self, system_id: i64, provider: Arc<dyn CellPositionProvider>) -> Self {
        self.providers.insert(system_id, provider);
        self
    }

    pub fn systems(&self) -> impl Iterator<Item = i64> + '_ {
        self.providers.keys().copied()
    }

    /// Attach positions to a batch of cells.
    ///
    /// # Returns
    /// One entry per cell in cell id order; `position` is `None` for cells
    /// of systems without a provider
    pub fn position_cells(&self, cells: &CellEnergies) -> Vec<PositionedCell> {
        debug!("Positioning {} cells", cells.len());
        cells
            .iter()
            .map(|(&cell_id, &energy)| {
                let position = self.xyz_position(cell_id);
                if let Some(p) = &position {
                    debug!(
                        "Cell {cell_id} energy {energy} at ({:.1}, {:.1}, {:.1}) mm",
                        p.x, p.y, p.z
                    );
                }
                PositionedCell {
                    cell_id,
                    energy,
                    position,
                }
            })
            .collect()
    }
}

impl CellPositionProvider for SystemDispatchPositions {
    fn xyz_position(&self, cell: CellId) -> Option<Vector3<f64>> {
        let system = self.system.value(cell);
        match self.providers.get(&system) {
            Some(provider) => provider.xyz_position(cell),
            None => {
                debug!("No position provider for system {system} (cell {cell})");
                None
            }
        }
    }
}
