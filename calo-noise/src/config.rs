use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LoadError};
use crate::noise_table::NoiseTable;

/// Configuration for histogram-based cell noise
///
/// Missing keys in a JSON file fall back to the [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// JSON file with the noise histograms
    pub noise_file: PathBuf,
    /// Base name of electronics noise histograms; the 1-based layer number is appended
    pub elec_noise_histo_name: String,
    /// Base name of pileup noise histograms; the 1-based layer number is appended
    pub pileup_histo_name: Option<String>,
    /// Number of radial layers with noise constants
    pub num_radial_layers: usize,
    /// Add pileup noise in quadrature to electronics noise
    pub add_pileup: bool,
    /// Cells below `filter_threshold * noise` are removed (e.g. 3.0 for 3-sigma)
    pub filter_threshold: f64,
    /// Readout whose cells are processed
    pub readout_name: String,
    /// Bitfield holding the radial layer of a cell
    pub active_field_name: String,
    /// Take eta from the segmentation instead of the cell position tool
    pub use_segmentation: bool,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            noise_file: PathBuf::from("noise_constants.json"),
            elec_noise_histo_name: "h_elecNoise_fcc_".to_string(),
            pileup_histo_name: Some("h_pileup_layer".to_string()),
            num_radial_layers: 8,
            add_pileup: true,
            filter_threshold: 3.0,
            readout_name: "ECalBarrelPhiEta".to_string(),
            active_field_name: "layer".to_string(),
            use_segmentation: true,
        }
    }
}

impl NoiseConfig {
    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check values that would otherwise only fail deep inside initialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::InvalidConfig(msg.to_string()));

        if self.noise_file.as_os_str().is_empty() {
            return invalid("name of the file with noise values not set");
        }
        if self.elec_noise_histo_name.is_empty() {
            return invalid("electronics noise histogram name not set");
        }
        if self.add_pileup && self.pileup_histo_name.as_deref().map_or(true, str::is_empty) {
            return invalid("add_pileup is set but pileup_histo_name is missing");
        }
        if self.num_radial_layers == 0 {
            return invalid("num_radial_layers must be at least 1");
        }
        if !(self.filter_threshold.is_finite() && self.filter_threshold >= 0.0) {
            return Err(ConfigError::InvalidConfig(format!(
                "filter_threshold must be a non-negative number, got {}",
                self.filter_threshold
            )));
        }
        if self.readout_name.is_empty() || self.active_field_name.is_empty() {
            return invalid("readout_name and active_field_name must be set");
        }
        Ok(())
    }

    /// Load the noise histograms named by this configuration.
    pub fn load_noise_table(&self) -> Result<NoiseTable, LoadError> {
        NoiseTable::load_from_file(
            &self.noise_file,
            self.num_radial_layers,
            &self.elec_noise_histo_name,
            self.pileup_histo_name.as_deref(),
            self.add_pileup,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(NoiseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NoiseConfig = serde_json::from_str(
            r#"{"noise_file": "ecal_noise.json", "num_radial_layers": 12, "add_pileup": false}"#,
        )
        .unwrap();
        assert_eq!(config.noise_file, PathBuf::from("ecal_noise.json"));
        assert_eq!(config.num_radial_layers, 12);
        assert!(!config.add_pileup);
        assert_eq!(config.filter_threshold, 3.0);
        assert_eq!(config.elec_noise_histo_name, "h_elecNoise_fcc_");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<NoiseConfig> = vec![
            NoiseConfig {
                noise_file: PathBuf::new(),
                ..Default::default()
            },
            NoiseConfig {
                num_radial_layers: 0,
                ..Default::default()
            },
            NoiseConfig {
                filter_threshold: -1.0,
                ..Default::default()
            },
            NoiseConfig {
                filter_threshold: f64::NAN,
                ..Default::default()
            },
            NoiseConfig {
                pileup_histo_name: None,
                ..Default::default()
            },
            NoiseConfig {
                active_field_name: String::new(),
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_pileup_name_optional_without_pileup() {
        let config = NoiseConfig {
            add_pileup: false,
            pileup_histo_name: None,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
