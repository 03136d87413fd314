use std::path::PathBuf;

use calo_geometry::GeometryError;
use thiserror::Error;

/// Fatal problems with the configuration or geometry, raised at initialization.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The geometry has no readout with the configured name.
    #[error("readout '{0}' not found in the geometry")]
    MissingReadout(String),

    /// The readout's cell identifiers have no field with the configured name.
    #[error("readout '{readout}' has no bitfield named '{field}'")]
    MissingField { readout: String, field: String },

    /// Neither an eta-phi grid, a position tool, nor a multi-segmentation of
    /// eta-phi grids is available for the readout.
    #[error("readout '{readout}' has unsupported segmentation: {reason}")]
    UnsupportedSegmentation { readout: String, reason: String },

    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal problems loading the noise histograms.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The histogram file could not be opened or parsed.
    #[error("cannot open noise constants at {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("histogram '{0}' not found")]
    MissingHistogram(String),

    #[error("histogram '{0}' has 0 bins")]
    EmptyHistogram(String),

    /// Histogram edges are not increasing and finite.
    #[error("histogram '{name}' has invalid binning [{low_edge}, {high_edge})")]
    InvalidBinning {
        name: String,
        low_edge: f64,
        high_edge: f64,
    },

    #[error("different number of histograms for electronics noise ({electronics}) and pileup ({pileup})")]
    LayerCountMismatch { electronics: usize, pileup: usize },

    #[error("no histograms with noise constants requested")]
    NoHistograms,

    #[error("pileup requested but no pileup histogram name given")]
    MissingPileupName,
}

/// Any failure while setting up noise evaluation from a configuration.
#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),
}
