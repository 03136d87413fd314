//! Common fixtures for calo-noise integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use calo_geometry::{
    CellId, Detector, DetectorDescription, GeometryProvider, GridPhiEtaDescription,
    ReadoutDescription, SegmentationDescription,
};
use calo_noise::{Histogram1D, HistogramSet, NoiseConfig};
use test_helpers::write_json_fixture;

pub const READOUT: &str = "ECalBarrelPhiEta";
pub const ID_SPEC: &str = "system:4,cryo:1,type:3,subtype:3,layer:8,eta:-10,phi:10";
pub const ECAL_SYSTEM: i64 = 5;
pub const LAYERS: usize = 2;

/// Barrel readout with 0.5 wide eta cells centred at 0.25 + k * 0.5
pub fn detector_description() -> DetectorDescription {
    DetectorDescription {
        readouts: vec![ReadoutDescription {
            name: READOUT.to_string(),
            id_spec: ID_SPEC.to_string(),
            segmentation: SegmentationDescription::GridPhiEta(GridPhiEtaDescription::new(
                0.5, 0.25, 64, 0.0,
            )),
        }],
    }
}

pub fn detector() -> Detector {
    Detector::from_description(&detector_description()).unwrap()
}

/// Identifier of an ECal barrel cell
pub fn cell(detector: &Detector, layer: i64, eta_index: i64) -> CellId {
    detector
        .readout(READOUT)
        .unwrap()
        .decoder()
        .encode(&[("system", ECAL_SYSTEM), ("layer", layer), ("eta", eta_index)])
        .unwrap()
}

/// Electronics noise of layer `l` (0-based) is `[1, 2, 3] * (l + 1)` over
/// three unit bins in |eta|; pileup is a flat `pileup` in every layer.
pub fn histograms(pileup: f64) -> HistogramSet {
    let mut set = HistogramSet::new();
    for layer in 0..LAYERS {
        let scale = (layer + 1) as f64;
        set.insert(
            format!("h_elecNoise_fcc_{}", layer + 1),
            Histogram1D::new(0.0, 3.0, vec![scale, 2.0 * scale, 3.0 * scale]),
        );
        set.insert(
            format!("h_pileup_layer{}", layer + 1),
            Histogram1D::new(0.0, 3.0, vec![pileup; 3]),
        );
    }
    set
}

/// Write histograms and geometry under `test_output/<prefix>_*.json` and
/// return a config pointing at them, together with the geometry path.
pub fn write_fixtures(prefix: &str, pileup: Option<f64>) -> (NoiseConfig, PathBuf) {
    let noise_file = write_json_fixture(
        &format!("{prefix}_noise.json"),
        &histograms(pileup.unwrap_or(0.0)),
    )
    .unwrap();
    let geometry = write_json_fixture(&format!("{prefix}_geometry.json"), &detector_description())
        .unwrap();

    let config = NoiseConfig {
        noise_file,
        num_radial_layers: LAYERS,
        add_pileup: pileup.is_some(),
        ..Default::default()
    };
    (config, geometry)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
