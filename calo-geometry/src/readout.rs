//! Readouts and the detector geometry that owns them.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::bitfield::BitFieldDecoder;
use crate::error::GeometryError;
use crate::segmentation::{Segmentation, SegmentationDescription};

/// Source of readout definitions, looked up by readout name.
pub trait GeometryProvider {
    fn readout(&self, name: &str) -> Option<&Readout>;
}

/// Serialized readout: name, cell identifier layout and segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadoutDescription {
    pub name: String,
    /// Bitfield descriptor, e.g. `system:4,layer:8,eta:-10,phi:10`
    pub id_spec: String,
    pub segmentation: SegmentationDescription,
}

/// Serialized detector geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorDescription {
    pub readouts: Vec<ReadoutDescription>,
}

/// A readout with its decoder and segmentation resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    name: String,
    decoder: BitFieldDecoder,
    segmentation: Segmentation,
}

impl Readout {
    pub fn new(name: impl Into<String>, decoder: BitFieldDecoder, segmentation: Segmentation) -> Self {
        Self {
            name: name.into(),
            decoder,
            segmentation,
        }
    }

    pub fn from_description(description: &ReadoutDescription) -> Result<Self, GeometryError> {
        let decoder = BitFieldDecoder::parse(&description.id_spec)?;
        let segmentation = Segmentation::from_description(&description.segmentation, &decoder)?;
        Ok(Self::new(description.name.clone(), decoder, segmentation))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decoder(&self) -> &BitFieldDecoder {
        &self.decoder
    }

    pub fn segmentation(&self) -> &Segmentation {
        &self.segmentation
    }
}

/// In-memory detector geometry keyed by readout name.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    readouts: BTreeMap<String, Readout>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a readout. Names must be unique.
    pub fn add_readout(&mut self, readout: Readout) -> Result<(), GeometryError> {
        if self.readouts.contains_key(readout.name()) {
            return Err(GeometryError::DuplicateReadout(readout.name().to_string()));
        }
        self.readouts.insert(readout.name().to_string(), readout);
        Ok(())
    }

    pub fn from_description(description: &DetectorDescription) -> Result<Self, GeometryError> {
        let mut detector = Self::new();
        for readout in &description.readouts {
            detector.add_readout(Readout::from_description(readout)?)?;
        }
        Ok(detector)
    }

    /// Load a detector description from a JSON file and build it.
    pub fn load_from_file(path: &Path) -> Result<Self, GeometryError> {
        let json = std::fs::read_to_string(path)?;
        let description: DetectorDescription = serde_json::from_str(&json)?;
        let detector = Self::from_description(&description)?;
        debug!(
            "Loaded {} readout(s) from {}",
            detector.readouts.len(),
            path.display()
        );
        Ok(detector)
    }

    pub fn readout_names(&self) -> impl Iterator<Item = &str> {
        self.readouts.keys().map(String::as_str)
    }
}

impl GeometryProvider for Detector {
    fn readout(&self, name: &str) -> Option<&Readout> {
        self.readouts.get(name)
    }
}
