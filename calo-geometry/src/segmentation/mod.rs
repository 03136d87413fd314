//! Readout segmentations.
//!
//! Only the eta-phi grid and the multi-segmentation wrapper are modelled.
//! Any other segmentation kind found in a detector description is kept as
//! [`Segmentation::Other`] so consumers can report it by name.

pub mod grid_phi_eta;
pub mod multi;

use serde::{Deserialize, Serialize};

pub use grid_phi_eta::{GridPhiEta, GridPhiEtaDescription};
pub use multi::{MultiSegmentation, MultiSegmentationEntry, MultiSegmentationEntryDescription};

use crate::bitfield::BitFieldDecoder;
use crate::error::GeometryError;

/// Serialized form of a segmentation, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SegmentationDescription {
    GridPhiEta(GridPhiEtaDescription),
    MultiSegmentation {
        key: String,
        entries: Vec<MultiSegmentationEntryDescription>,
    },
    Other {
        type_name: String,
    },
}

/// A segmentation bound to its readout's decoder
#[derive(Debug, Clone, PartialEq)]
pub enum Segmentation {
    GridPhiEta(GridPhiEta),
    Multi(MultiSegmentation),
    Other { type_name: String },
}

impl Segmentation {
    pub fn from_description(
        description: &SegmentationDescription,
        decoder: &BitFieldDecoder,
    ) -> Result<Self, GeometryError> {
        Ok(match description {
            SegmentationDescription::GridPhiEta(grid) => {
                Segmentation::GridPhiEta(GridPhiEta::new(decoder, grid)?)
            }
            SegmentationDescription::MultiSegmentation { key, entries } => {
                Segmentation::Multi(MultiSegmentation::new(decoder, key, entries)?)
            }
            SegmentationDescription::Other { type_name } => Segmentation::Other {
                type_name: type_name.clone(),
            },
        })
    }

    /// Human readable kind, used in diagnostics
    pub fn type_name(&self) -> &str {
        match self {
            Segmentation::GridPhiEta(_) => "GridPhiEta",
            Segmentation::Multi(_) => "MultiSegmentation",
            Segmentation::Other { type_name } => type_name,
        }
    }

    pub fn as_grid_phi_eta(&self) -> Option<&GridPhiEta> {
        match self {
            Segmentation::GridPhiEta(grid) => Some(grid),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&MultiSegmentation> {
        match self {
            Segmentation::Multi(multi) => Some(multi),
            _ => None,
        }
    }
}
