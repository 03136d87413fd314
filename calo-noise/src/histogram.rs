//! One-dimensional noise histograms and the sources they are read from.
//!
//! Histogram files are JSON objects mapping histogram names to
//! `{"low_edge": .., "high_edge": .., "contents": [..]}` records. Bins are
//! uniform, so the bin width is `(high_edge - low_edge) / contents.len()`.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistogramRecord {
    low_edge: f64,
    high_edge: f64,
    contents: Vec<f64>,
}

/// Histogram with uniform bins over `[low_edge, high_edge)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HistogramRecord", into = "HistogramRecord")]
pub struct Histogram1D {
    low_edge: f64,
    high_edge: f64,
    contents: Array1<f64>,
}

impl From<HistogramRecord> for Histogram1D {
    fn from(record: HistogramRecord) -> Self {
        Self::new(record.low_edge, record.high_edge, record.contents)
    }
}

impl From<Histogram1D> for HistogramRecord {
    fn from(histogram: Histogram1D) -> Self {
        Self {
            low_edge: histogram.low_edge,
            high_edge: histogram.high_edge,
            contents: histogram.contents.to_vec(),
        }
    }
}

impl Histogram1D {
    /// Create a histogram; the bin count is the length of `contents`.
    ///
    /// No validation happens here, see [`Histogram1D::validate`].
    pub fn new(low_edge: f64, high_edge: f64, contents: Vec<f64>) -> Self {
        Self {
            low_edge,
            high_edge,
            contents: Array1::from(contents),
        }
    }

    pub fn n_bins(&self) -> usize {
        self.contents.len()
    }

    /// Lower edge of the first bin
    pub fn low_edge(&self) -> f64 {
        self.low_edge
    }

    /// Upper edge of the last bin
    pub fn high_edge(&self) -> f64 {
        self.high_edge
    }

    /// Width of every bin, 0 for an empty histogram
    pub fn bin_width(&self) -> f64 {
        if self.contents.is_empty() {
            return 0.0;
        }
        (self.high_edge - self.low_edge) / self.n_bins() as f64
    }

    /// Lower edge of the 0-based bin `index`
    pub fn bin_low_edge(&self, index: usize) -> f64 {
        self.low_edge + index as f64 * self.bin_width()
    }

    /// Content of the 0-based bin `index`
    pub fn bin_content(&self, index: usize) -> Option<f64> {
        self.contents.get(index).copied()
    }

    pub fn contents(&self) -> &Array1<f64> {
        &self.contents
    }

    /// Check the histogram is usable for lookups.
    ///
    /// # Errors
    /// * [`LoadError::EmptyHistogram`] - no bins
    /// * [`LoadError::InvalidBinning`] - edges not finite or not increasing
    pub fn validate(&self, name: &str) -> Result<(), LoadError> {
        if self.contents.is_empty() {
            return Err(LoadError::EmptyHistogram(name.to_string()));
        }
        let finite = self.low_edge.is_finite() && self.high_edge.is_finite();
        if !finite || self.high_edge <= self.low_edge {
            return Err(LoadError::InvalidBinning {
                name: name.to_string(),
                low_edge: self.low_edge,
                high_edge: self.high_edge,
            });
        }
        Ok(())
    }
}

/// Named container of histograms.
pub trait HistogramSource {
    fn histogram(&self, name: &str) -> Option<Histogram1D>;
}

/// In-memory histogram collection, serialized as a JSON object keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistogramSet {
    histograms: BTreeMap<String, Histogram1D>,
}

impl HistogramSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a histogram
    pub fn insert(&mut self, name: impl Into<String>, histogram: Histogram1D) {
        self.histograms.insert(name.into(), histogram);
    }

    /// Builder-style [`HistogramSet::insert`]
    pub fn with(mut self, name: impl Into<String>, histogram: Histogram1D) -> Self {
        self.insert(name, histogram);
        self
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Read a histogram file.
    ///
    /// Any I/O or parse failure is reported as [`LoadError::SourceUnavailable`].
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let unavailable = |reason: String| LoadError::SourceUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let json = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        let set: Self = serde_json::from_str(&json).map_err(|e| unavailable(e.to_string()))?;
        info!(
            "Opened file with noise constants: {} ({} histograms)",
            path.display(),
            set.len()
        );
        Ok(set)
    }
}

impl HistogramSource for HistogramSet {
    fn histogram(&self, name: &str) -> Option<Histogram1D> {
        self.histograms.get(name).cloned()
    }
}
