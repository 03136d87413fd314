//! Uniform eta-phi grid segmentation.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::bitfield::{BitField, BitFieldDecoder, CellId};
use crate::error::GeometryError;

fn default_eta_field() -> String {
    "eta".to_string()
}

fn default_phi_field() -> String {
    "phi".to_string()
}

/// Serialized parameters of a [`GridPhiEta`] segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPhiEtaDescription {
    /// Cell size in pseudorapidity
    pub grid_size_eta: f64,
    /// Pseudorapidity of the centre of eta bin 0
    #[serde(default)]
    pub offset_eta: f64,
    /// Number of cells covering the full 2π in phi
    pub phi_bins: u32,
    /// Azimuth of the centre of phi bin 0
    #[serde(default)]
    pub offset_phi: f64,
    #[serde(default = "default_eta_field")]
    pub eta_field: String,
    #[serde(default = "default_phi_field")]
    pub phi_field: String,
}

impl GridPhiEtaDescription {
    /// Grid with the default `eta`/`phi` field names
    pub fn new(grid_size_eta: f64, offset_eta: f64, phi_bins: u32, offset_phi: f64) -> Self {
        Self {
            grid_size_eta,
            offset_eta,
            phi_bins,
            offset_phi,
            eta_field: default_eta_field(),
            phi_field: default_phi_field(),
        }
    }
}

/// Segmentation where the cell identifier carries eta and phi bin indices.
///
/// Bin centres are `index * size + offset`, with the phi size fixed to
/// `2π / phi_bins`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPhiEta {
    eta_field: BitField,
    phi_field: BitField,
    grid_size_eta: f64,
    offset_eta: f64,
    phi_bins: u32,
    offset_phi: f64,
}

impl GridPhiEta {
    /// Bind the grid parameters to the fields of a readout decoder.
    ///
    /// # Errors
    /// Fails if the eta or phi field is missing from the decoder, the eta cell
    /// size is not a positive finite number, or `phi_bins` is zero.
    pub fn new(
        decoder: &BitFieldDecoder,
        description: &GridPhiEtaDescription,
    ) -> Result<Self, GeometryError> {
        if !(description.grid_size_eta.is_finite() && description.grid_size_eta > 0.0) {
            return Err(GeometryError::InvalidSegmentation(format!(
                "eta cell size must be positive, got {}",
                description.grid_size_eta
            )));
        }
        if description.phi_bins == 0 {
            return Err(GeometryError::InvalidSegmentation(
                "phi_bins must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            eta_field: decoder.require_field(&description.eta_field)?.clone(),
            phi_field: decoder.require_field(&description.phi_field)?.clone(),
            grid_size_eta: description.grid_size_eta,
            offset_eta: description.offset_eta,
            phi_bins: description.phi_bins,
            offset_phi: description.offset_phi,
        })
    }

    pub fn grid_size_eta(&self) -> f64 {
        self.grid_size_eta
    }

    pub fn offset_eta(&self) -> f64 {
        self.offset_eta
    }

    pub fn phi_bins(&self) -> u32 {
        self.phi_bins
    }

    pub fn offset_phi(&self) -> f64 {
        self.offset_phi
    }

    /// Phi cell size in radians
    pub fn grid_size_phi(&self) -> f64 {
        TAU / self.phi_bins as f64
    }

    /// Pseudorapidity of the cell centre
    pub fn eta(&self, cell: CellId) -> f64 {
        self.eta_field.value(cell) as f64 * self.grid_size_eta + self.offset_eta
    }

    /// Azimuth of the cell centre in radians
    pub fn phi(&self, cell: CellId) -> f64 {
        self.phi_field.value(cell) as f64 * self.grid_size_phi() + self.offset_phi
    }
}
