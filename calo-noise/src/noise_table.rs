//! Per-layer noise constants binned in |eta|.
//!
//! The table is built once from a [`HistogramSource`] and never changes
//! afterwards. All lookups share the binning of the first electronics
//! histogram:
//!
//! ```text
//! bin_width = (high_edge - low_edge) / n_bins
//! bin       = floor((|eta| - low_edge) / bin_width)      (0-based)
//! ```
//!
//! Cells beyond the last bin use the last bin. Cells below the first edge
//! have no constant and get zero noise, as do layers without histograms.

use log::{debug, info};

use crate::error::LoadError;
use crate::histogram::{Histogram1D, HistogramSource, HistogramSet};

/// Which noise contribution to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseSource {
    Electronics,
    Pileup,
}

/// Name of the histogram for a 0-based layer: base name plus 1-based index.
pub fn layer_histogram_name(base: &str, layer: usize) -> String {
    format!("{base}{}", layer + 1)
}

/// Immutable electronics (and optionally pileup) noise histograms per layer.
#[derive(Debug, Clone)]
pub struct NoiseTable {
    electronics: Vec<Histogram1D>,
    pileup: Option<Vec<Histogram1D>>,
    first_edge: f64,
    bin_width: f64,
    n_bins: usize,
}

impl NoiseTable {
    /// Load `layer_count` layers of noise histograms from `source`.
    ///
    /// Electronics histograms are named `electronics_name` followed by the
    /// 1-based layer number; pileup histograms likewise with `pileup_name`
    /// when `add_pileup` is set.
    ///
    /// # Errors
    /// * [`LoadError::NoHistograms`] - `layer_count` is zero
    /// * [`LoadError::MissingPileupName`] - pileup requested without a name
    /// * [`LoadError::MissingHistogram`] - a named histogram is absent
    /// * [`LoadError::EmptyHistogram`] / [`LoadError::InvalidBinning`] - unusable histogram
    pub fn load<S: HistogramSource + ?Sized>(
        source: &S,
        layer_count: usize,
        electronics_name: &str,
        pileup_name: Option<&str>,
        add_pileup: bool,
    ) -> Result<Self, LoadError> {
        if layer_count == 0 {
            return Err(LoadError::NoHistograms);
        }

        let electronics = load_layers(source, electronics_name, layer_count)?;
        let pileup = if add_pileup {
            let name = pileup_name.ok_or(LoadError::MissingPileupName)?;
            Some(load_layers(source, name, layer_count)?)
        } else {
            None
        };

        Self::from_histograms(electronics, pileup)
    }

    /// Open a histogram file and load the table from it.
    pub fn load_from_file(
        path: &std::path::Path,
        layer_count: usize,
        electronics_name: &str,
        pileup_name: Option<&str>,
        add_pileup: bool,
    ) -> Result<Self, LoadError> {
        let source = HistogramSet::open(path)?;
        Self::load(&source, layer_count, electronics_name, pileup_name, add_pileup)
    }

    /// Build a table from already loaded histograms, index = layer.
    pub fn from_histograms(
        electronics: Vec<Histogram1D>,
        pileup: Option<Vec<Histogram1D>>,
    ) -> Result<Self, LoadError> {
        let (first_edge, bin_width, n_bins) = electronics
            .first()
            .map(|h| (h.low_edge(), h.bin_width(), h.n_bins()))
            .ok_or(LoadError::NoHistograms)?;
        for (layer, histogram) in electronics.iter().enumerate() {
            histogram.validate(&format!("electronics layer {layer}"))?;
        }

        if let Some(pileup) = &pileup {
            if pileup.len() != electronics.len() {
                return Err(LoadError::LayerCountMismatch {
                    electronics: electronics.len(),
                    pileup: pileup.len(),
                });
            }
            for (layer, histogram) in pileup.iter().enumerate() {
                histogram.validate(&format!("pileup layer {layer}"))?;
            }
        }

        let table = Self {
            electronics,
            pileup,
            first_edge,
            bin_width,
            n_bins,
        };
        info!(
            "Noise table: {} layers, {} eta bins of width {} from {}, pileup {}",
            table.layer_count(),
            table.n_bins,
            table.bin_width,
            table.first_edge,
            if table.has_pileup() { "on" } else { "off" }
        );
        Ok(table)
    }

    /// Number of layers with noise constants
    pub fn layer_count(&self) -> usize {
        self.electronics.len()
    }

    pub fn has_pileup(&self) -> bool {
        self.pileup.is_some()
    }

    /// Number of eta bins in the reference binning
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// |eta| range covered by the reference binning
    pub fn eta_range(&self) -> (f64, f64) {
        (
            self.first_edge,
            self.first_edge + self.bin_width * self.n_bins as f64,
        )
    }

    /// 0-based eta bin for `abs_eta`.
    ///
    /// Values at or beyond the upper edge are clamped to the last bin.
    ///
    /// # Returns
    /// * `Some(bin)` - Bin in the reference binning
    /// * `None` - `abs_eta` lies below the first edge or is NaN
    pub fn bin_index(&self, abs_eta: f64) -> Option<usize> {
        let bin = ((abs_eta - self.first_edge) / self.bin_width).floor();
        if bin.is_nan() || bin < 0.0 {
            None
        } else if bin >= self.n_bins as f64 {
            debug!(
                "eta outside range of the histograms! Cell |eta|: {abs_eta} Nbins in histogram: {}",
                self.n_bins
            );
            Some(self.n_bins - 1)
        } else {
            Some(bin as usize)
        }
    }

    /// Noise constant of `source` for a layer and pseudorapidity.
    ///
    /// # Arguments
    /// * `source` - Electronics or pileup contribution
    /// * `layer` - 0-based radial layer
    /// * `abs_eta` - Pseudorapidity of the cell; the sign is ignored
    ///
    /// # Returns
    /// The stored constant, or 0 for layers without histograms, for |eta|
    /// below the first bin edge, and for pileup when the table was loaded
    /// without it.
    pub fn lookup(&self, source: NoiseSource, layer: usize, abs_eta: f64) -> f64 {
        let histograms = match (source, &self.pileup) {
            (NoiseSource::Electronics, _) => &self.electronics,
            (NoiseSource::Pileup, Some(pileup)) => pileup,
            (NoiseSource::Pileup, None) => return 0.0,
        };

        let Some(histogram) = histograms.get(layer) else {
            debug!(
                "More radial layers than we have noise for: layer {layer}, {} layers with noise constants",
                histograms.len()
            );
            return 0.0;
        };

        let abs_eta = abs_eta.abs();
        let Some(bin) = self.bin_index(abs_eta) else {
            debug!(
                "eta below range of the histograms! Cell |eta|: {abs_eta}, first edge {}",
                self.first_edge
            );
            return 0.0;
        };
        histogram
            .bin_content(bin.min(histogram.n_bins() - 1))
            .unwrap_or(0.0)
    }
}

fn load_layers<S: HistogramSource + ?Sized>(
    source: &S,
    base: &str,
    layer_count: usize,
) -> Result<Vec<Histogram1D>, LoadError> {
    (0..layer_count)
        .map(|layer| {
            let name = layer_histogram_name(base, layer);
            debug!("Getting histogram with a name {name}");
            let histogram = source
                .histogram(&name)
                .ok_or_else(|| LoadError::MissingHistogram(name.clone()))?;
            histogram.validate(&name)?;
            Ok(histogram)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn source(layers: usize, with_pileup: bool) -> HistogramSet {
        let mut set = HistogramSet::new();
        for layer in 0..layers {
            let offset = layer as f64 * 10.0;
            set.insert(
                layer_histogram_name("h_elecNoise_fcc_", layer),
                Histogram1D::new(0.0, 3.0, vec![offset + 1.0, offset + 2.0, offset + 3.0]),
            );
            if with_pileup {
                set.insert(
                    layer_histogram_name("h_pileup_layer", layer),
                    Histogram1D::new(0.0, 3.0, vec![0.5, 0.5, 0.5]),
                );
            }
        }
        set
    }

    fn table(layers: usize) -> NoiseTable {
        NoiseTable::load(&source(layers, false), layers, "h_elecNoise_fcc_", None, false).unwrap()
    }

    #[test]
    fn test_histogram_names_are_one_based() {
        assert_eq!(layer_histogram_name("h_elecNoise_fcc_", 0), "h_elecNoise_fcc_1");
        assert_eq!(layer_histogram_name("h_pileup_layer", 7), "h_pileup_layer8");
    }

    #[test]
    fn test_lookup_in_range() {
        let table = table(2);
        assert_eq!(table.layer_count(), 2);
        assert_eq!(table.n_bins(), 3);
        assert_eq!(table.eta_range(), (0.0, 3.0));

        assert_eq!(table.lookup(NoiseSource::Electronics, 0, 0.5), 1.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, 1.0), 2.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 1, 2.5), 13.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 1, -2.5), 13.0);
    }

    #[test]
    fn test_eta_clamped_to_last_bin() {
        let table = table(2);
        assert_eq!(table.bin_index(3.0), Some(2));
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, 3.0), 3.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, 42.0), 3.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, f64::INFINITY), 3.0);
    }

    #[test]
    fn test_eta_below_first_edge() {
        let set = HistogramSet::new().with("e1", Histogram1D::new(1.0, 2.0, vec![7.0, 8.0]));
        let table = NoiseTable::load(&set, 1, "e", None, false).unwrap();
        assert_eq!(table.bin_index(0.2), None);
        assert_eq!(table.bin_index(f64::NAN), None);
        assert_eq!(table.bin_index(1.0), Some(0));
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, 0.2), 0.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, -0.2), 0.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, f64::NAN), 0.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, 1.0), 7.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 0, 1.6), 8.0);
    }

    #[test]
    fn test_layer_out_of_range_is_zero() {
        let table = table(2);
        assert_eq!(table.lookup(NoiseSource::Electronics, 2, 0.5), 0.0);
        assert_eq!(table.lookup(NoiseSource::Electronics, 5, 0.5), 0.0);
    }

    #[test]
    fn test_pileup_lookup() {
        let table = NoiseTable::load(
            &source(2, true),
            2,
            "h_elecNoise_fcc_",
            Some("h_pileup_layer"),
            true,
        )
        .unwrap();
        assert!(table.has_pileup());
        assert_relative_eq!(table.lookup(NoiseSource::Pileup, 1, 1.5), 0.5);

        let without = self::table(1);
        assert_eq!(without.lookup(NoiseSource::Pileup, 0, 1.5), 0.0);
    }

    #[test]
    fn test_missing_histogram() {
        let result = NoiseTable::load(&source(2, false), 3, "h_elecNoise_fcc_", None, false);
        assert!(matches!(
            result,
            Err(LoadError::MissingHistogram(name)) if name == "h_elecNoise_fcc_3"
        ));

        let result = NoiseTable::load(
            &source(2, false),
            2,
            "h_elecNoise_fcc_",
            Some("h_pileup_layer"),
            true,
        );
        assert!(matches!(
            result,
            Err(LoadError::MissingHistogram(name)) if name == "h_pileup_layer1"
        ));
    }

    #[test]
    fn test_empty_histogram() {
        let set = source(1, false).with("h_elecNoise_fcc_2", Histogram1D::new(0.0, 3.0, vec![]));
        assert!(matches!(
            NoiseTable::load(&set, 2, "h_elecNoise_fcc_", None, false),
            Err(LoadError::EmptyHistogram(name)) if name == "h_elecNoise_fcc_2"
        ));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            NoiseTable::load(&source(1, false), 0, "h_elecNoise_fcc_", None, false),
            Err(LoadError::NoHistograms)
        ));
        assert!(matches!(
            NoiseTable::load(&source(1, true), 1, "h_elecNoise_fcc_", None, true),
            Err(LoadError::MissingPileupName)
        ));
    }

    #[test]
    fn test_layer_count_mismatch() {
        let histogram = || Histogram1D::new(0.0, 1.0, vec![1.0]);
        let result = NoiseTable::from_histograms(
            vec![histogram(), histogram()],
            Some(vec![histogram()]),
        );
        assert!(matches!(
            result,
            Err(LoadError::LayerCountMismatch {
                electronics: 2,
                pileup: 1
            })
        ));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let result = NoiseTable::load_from_file(
            std::path::Path::new("/nonexistent/noise_constants.json"),
            1,
            "h_elecNoise_fcc_",
            None,
            false,
        );
        assert!(matches!(result, Err(LoadError::SourceUnavailable { .. })));
    }
}
