//! Resolution of cell identifiers to (layer, eta).
//!
//! The strategy is picked once when the locator is built:
//!
//! 1. the readout uses an eta-phi grid, and either segmentation eta is
//!    preferred or no position tool is given: eta comes from the grid
//! 2. a position tool is given: eta comes from the cell position
//! 3. the readout uses a multi-segmentation made only of eta-phi grids: eta
//!    comes from the grid covering the cell
//!
//! Anything else is a configuration error.

use std::fmt;
use std::sync::Arc;

use calo_geometry::{
    pseudorapidity, BitField, CellId, CellPositionProvider, GeometryProvider, GridPhiEta,
    MultiSegmentation, Segmentation,
};
use log::{debug, info};

use crate::config::NoiseConfig;
use crate::error::ConfigError;

/// Where a cell sits, as needed for a noise lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCoordinates {
    pub layer: usize,
    pub eta: f64,
}

/// The eta source chosen at construction
#[derive(Clone)]
pub enum LocatorMode {
    Segmentation(GridPhiEta),
    MultiSegmentation(MultiSegmentation),
    ExternalPosition(Arc<dyn CellPositionProvider>),
}

impl LocatorMode {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorMode::Segmentation(_) => "eta-phi segmentation",
            LocatorMode::MultiSegmentation(_) => "multi-segmentation",
            LocatorMode::ExternalPosition(_) => "cell position tool",
        }
    }
}

impl fmt::Debug for LocatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorMode::Segmentation(grid) => f.debug_tuple("Segmentation").field(grid).finish(),
            LocatorMode::MultiSegmentation(multi) => {
                f.debug_tuple("MultiSegmentation").field(multi).finish()
            }
            LocatorMode::ExternalPosition(_) => f.write_str("ExternalPosition(..)"),
        }
    }
}

/// Maps cell identifiers of one readout to layer and pseudorapidity.
#[derive(Debug, Clone)]
pub struct CellLocator {
    readout: String,
    layer: BitField,
    mode: LocatorMode,
}

impl CellLocator {
    /// Resolve the readout and pick the eta strategy.
    ///
    /// # Arguments
    /// * `geometry` - Provider of readout definitions
    /// * `readout_name` - Readout of the cells to locate
    /// * `layer_field` - Bitfield holding the radial layer
    /// * `position_tool` - Optional provider of cell positions
    /// * `use_segmentation` - Prefer grid eta over the position tool
    ///
    /// # Errors
    /// * [`ConfigError::MissingReadout`] - readout unknown to the geometry
    /// * [`ConfigError::MissingField`] - no `layer_field` in the readout
    /// * [`ConfigError::UnsupportedSegmentation`] - no usable eta strategy
    pub fn new<G: GeometryProvider + ?Sized>(
        geometry: &G,
        readout_name: &str,
        layer_field: &str,
        position_tool: Option<Arc<dyn CellPositionProvider>>,
        use_segmentation: bool,
    ) -> Result<Self, ConfigError> {
        let readout = geometry
            .readout(readout_name)
            .ok_or_else(|| ConfigError::MissingReadout(readout_name.to_string()))?;
        let layer = readout
            .decoder()
            .field(layer_field)
            .ok_or_else(|| ConfigError::MissingField {
                readout: readout_name.to_string(),
                field: layer_field.to_string(),
            })?
            .clone();

        let unsupported = |reason: String| ConfigError::UnsupportedSegmentation {
            readout: readout_name.to_string(),
            reason,
        };

        let mode = match (readout.segmentation(), position_tool) {
            (Segmentation::GridPhiEta(grid), tool) if use_segmentation || tool.is_none() => {
                LocatorMode::Segmentation(grid.clone())
            }
            (_, Some(tool)) => LocatorMode::ExternalPosition(tool),
            (Segmentation::Multi(multi), None) => {
                if let Some(other) = multi
                    .sub_segmentations()
                    .find(|s| s.as_grid_phi_eta().is_none())
                {
                    return Err(unsupported(format!(
                        "at least one sub-segmentation is not a phi-eta grid ({})",
                        other.type_name()
                    )));
                }
                LocatorMode::MultiSegmentation(multi.clone())
            }
            (other, None) => {
                return Err(unsupported(format!(
                    "no phi-eta or multi-segmentation, found {}",
                    other.type_name()
                )))
            }
        };

        info!("Readout {readout_name}: cell eta from {}", mode.name());
        Ok(Self {
            readout: readout_name.to_string(),
            layer,
            mode,
        })
    }

    /// Build from the readout, layer field and segmentation flag of a config.
    pub fn from_config<G: GeometryProvider + ?Sized>(
        geometry: &G,
        config: &NoiseConfig,
        position_tool: Option<Arc<dyn CellPositionProvider>>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            geometry,
            &config.readout_name,
            &config.active_field_name,
            position_tool,
            config.use_segmentation,
        )
    }

    pub fn readout_name(&self) -> &str {
        &self.readout
    }

    pub fn mode(&self) -> &LocatorMode {
        &self.mode
    }

    /// Layer and eta of a cell, or `None` when the cell cannot be placed.
    pub fn resolve(&self, cell: CellId) -> Option<CellCoordinates> {
        let raw_layer = self.layer.value(cell);
        let Ok(layer) = usize::try_from(raw_layer) else {
            debug!("Cell {cell} has negative layer {raw_layer}");
            return None;
        };

        let eta = match &self.mode {
            LocatorMode::Segmentation(grid) => grid.eta(cell),
            LocatorMode::MultiSegmentation(multi) => {
                match multi.subsegmentation(cell).and_then(Segmentation::as_grid_phi_eta) {
                    Some(grid) => grid.eta(cell),
                    None => {
                        debug!(
                            "Cell {cell} not covered by any sub-segmentation of {}",
                            self.readout
                        );
                        return None;
                    }
                }
            }
            LocatorMode::ExternalPosition(tool) => match tool.xyz_position(cell) {
                Some(position) => pseudorapidity(&position),
                None => {
                    debug!("No position for cell {cell}");
                    return None;
                }
            },
        };

        Some(CellCoordinates { layer, eta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use calo_geometry::{
        BitFieldDecoder, Detector, GridPhiEtaDescription, MultiSegmentationEntryDescription,
        Readout, SegmentationDescription,
    };
    use nalgebra::Vector3;

    const SPEC: &str = "system:4,layer:8,eta:-10,phi:10";

    struct FixedEta(f64);

    impl CellPositionProvider for FixedEta {
        fn xyz_position(&self, _cell: CellId) -> Option<Vector3<f64>> {
            Some(Vector3::new(1000.0, 0.0, 1000.0 * self.0.sinh()))
        }
    }

    struct Nowhere;

    impl CellPositionProvider for Nowhere {
        fn xyz_position(&self, _cell: CellId) -> Option<Vector3<f64>> {
            None
        }
    }

    fn grid() -> SegmentationDescription {
        SegmentationDescription::GridPhiEta(GridPhiEtaDescription::new(0.1, 0.05, 64, 0.0))
    }

    fn multi(second: SegmentationDescription) -> SegmentationDescription {
        SegmentationDescription::MultiSegmentation {
            key: "layer".to_string(),
            entries: vec![
                MultiSegmentationEntryDescription {
                    key_min: 0,
                    key_max: 1,
                    segmentation: grid(),
                },
                MultiSegmentationEntryDescription {
                    key_min: 2,
                    key_max: 3,
                    segmentation: second,
                },
            ],
        }
    }

    fn detector(segmentation: SegmentationDescription) -> Detector {
        let decoder = BitFieldDecoder::parse(SPEC).unwrap();
        let segmentation = Segmentation::from_description(&segmentation, &decoder).unwrap();
        let mut detector = Detector::new();
        detector
            .add_readout(Readout::new("ECal", decoder, segmentation))
            .unwrap();
        detector
    }

    fn cell(layer: i64, eta: i64) -> CellId {
        BitFieldDecoder::parse(SPEC)
            .unwrap()
            .encode(&[("layer", layer), ("eta", eta)])
            .unwrap()
    }

    #[test]
    fn test_segmentation_mode() {
        let locator = CellLocator::new(&detector(grid()), "ECal", "layer", None, true).unwrap();
        assert!(matches!(locator.mode(), LocatorMode::Segmentation(_)));

        let coords = locator.resolve(cell(3, -4)).unwrap();
        assert_eq!(coords.layer, 3);
        assert_relative_eq!(coords.eta, -0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_used_without_tool_even_if_not_preferred() {
        let locator = CellLocator::new(&detector(grid()), "ECal", "layer", None, false).unwrap();
        assert!(matches!(locator.mode(), LocatorMode::Segmentation(_)));
    }

    #[test]
    fn test_position_tool_mode() {
        let tool: Arc<dyn CellPositionProvider> = Arc::new(FixedEta(1.25));

        let preferred =
            CellLocator::new(&detector(grid()), "ECal", "layer", Some(tool.clone()), true).unwrap();
        assert!(matches!(preferred.mode(), LocatorMode::Segmentation(_)));

        let locator =
            CellLocator::new(&detector(grid()), "ECal", "layer", Some(tool), false).unwrap();
        assert!(matches!(locator.mode(), LocatorMode::ExternalPosition(_)));
        let coords = locator.resolve(cell(2, 0)).unwrap();
        assert_eq!(coords.layer, 2);
        assert_relative_eq!(coords.eta, 1.25, epsilon = 1e-12);
    }

    #[test]
    fn test_tool_takes_precedence_over_multi_segmentation() {
        let tool: Arc<dyn CellPositionProvider> = Arc::new(Nowhere);
        let locator =
            CellLocator::new(&detector(multi(grid())), "ECal", "layer", Some(tool), true).unwrap();
        assert!(matches!(locator.mode(), LocatorMode::ExternalPosition(_)));
        assert!(locator.resolve(cell(0, 1)).is_none());
    }

    #[test]
    fn test_multi_segmentation_mode() {
        let locator =
            CellLocator::new(&detector(multi(grid())), "ECal", "layer", None, true).unwrap();
        assert!(matches!(locator.mode(), LocatorMode::MultiSegmentation(_)));

        assert_relative_eq!(locator.resolve(cell(3, 2)).unwrap().eta, 0.25, epsilon = 1e-12);
        assert!(locator.resolve(cell(7, 2)).is_none());
    }

    #[test]
    fn test_multi_with_non_grid_sub_segmentation_rejected() {
        let other = SegmentationDescription::Other {
            type_name: "CartesianGridXY".to_string(),
        };
        let result = CellLocator::new(&detector(multi(other)), "ECal", "layer", None, true);
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedSegmentation { reason, .. }) if reason.contains("CartesianGridXY")
        ));
    }

    #[test]
    fn test_unsupported_segmentation_without_tool() {
        let other = SegmentationDescription::Other {
            type_name: "CartesianGridXY".to_string(),
        };
        assert!(matches!(
            CellLocator::new(&detector(other), "ECal", "layer", None, true),
            Err(ConfigError::UnsupportedSegmentation { .. })
        ));
    }

    #[test]
    fn test_missing_readout_and_field() {
        let detector = detector(grid());
        assert!(matches!(
            CellLocator::new(&detector, "HCal", "layer", None, true),
            Err(ConfigError::MissingReadout(name)) if name == "HCal"
        ));
        assert!(matches!(
            CellLocator::new(&detector, "ECal", "active_layer", None, true),
            Err(ConfigError::MissingField { field, .. }) if field == "active_layer"
        ));
    }

    #[test]
    fn test_negative_layer_unresolved() {
        let decoder = BitFieldDecoder::parse("layer:-4,eta:-10,phi:10").unwrap();
        let segmentation = Segmentation::from_description(&grid(), &decoder).unwrap();
        let mut detector = Detector::new();
        detector
            .add_readout(Readout::new("ECal", decoder.clone(), segmentation))
            .unwrap();

        let locator = CellLocator::new(&detector, "ECal", "layer", None, true).unwrap();
        let cell = decoder.encode(&[("layer", -2)]).unwrap();
        assert!(locator.resolve(cell).is_none());
    }
}
