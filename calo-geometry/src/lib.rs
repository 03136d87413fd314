//! calo-geometry - Readout geometry for calorimeter cells
//!
//! This crate provides the geometry pieces needed to interpret calorimeter
//! cell identifiers:
//!
//! - **Bitfield** - Decoding named fields out of 64-bit cell identifiers
//! - **Segmentation** - Eta-phi grids and multi-segmentation dispatch
//! - **Readout** - Readouts, detectors and the [`GeometryProvider`] trait
//! - **Position** - 3D cell positions and pseudorapidity

pub mod bitfield;
pub mod error;
pub mod position;
pub mod readout;
pub mod segmentation;

use std::collections::BTreeMap;

pub use bitfield::{BitField, BitFieldDecoder, CellId};
pub use error::GeometryError;
pub use position::{
    azimuth, pseudorapidity, BarrelLayerPositions, CellPositionProvider, PositionedCell,
    SystemDispatchPositions,
};
pub use readout::{Detector, DetectorDescription, GeometryProvider, Readout, ReadoutDescription};
pub use segmentation::{
    GridPhiEta, GridPhiEtaDescription, MultiSegmentation, MultiSegmentationEntryDescription,
    Segmentation, SegmentationDescription,
};

/// Energy deposited per cell, ordered by cell identifier
pub type CellEnergies = BTreeMap<CellId, f64>;
