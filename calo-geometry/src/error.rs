use thiserror::Error;

/// Errors raised while building or querying readout geometry.
#[derive(Error, Debug)]
pub enum GeometryError {
    /// The cell identifier descriptor could not be parsed.
    #[error("invalid bitfield descriptor '{descriptor}': {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },

    /// A field name is not part of the readout's descriptor.
    #[error("unknown bitfield '{0}'")]
    UnknownField(String),

    /// A value does not fit in the bits reserved for its field.
    #[error("value {value} does not fit field '{field}' [{min}, {max}]")]
    ValueOutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Segmentation parameters are unusable.
    #[error("invalid segmentation: {0}")]
    InvalidSegmentation(String),

    /// Two readouts share the same name.
    #[error("duplicate readout '{0}'")]
    DuplicateReadout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
