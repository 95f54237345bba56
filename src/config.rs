use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectError};

/// Directory the survey files are read from when no config overrides it.
pub const DEFAULT_DATA_DIR: &str = "/media/apogee/starnet/aug17/";

// ---------------------------------------------------------------------------
// Quality cuts
// ---------------------------------------------------------------------------

/// Thresholds applied when selecting stars.
///
/// Ranges are exclusive on both ends; `snr_min` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCuts {
    pub teff_min: f64,
    pub teff_max: f64,
    pub vscatter_max: f64,
    pub snr_min: f64,
    pub metal_min: f64,
    pub metal_max: f64,
    /// Placeholder written where no surface gravity was derived.
    pub logg_sentinel: f64,
}

impl Default for QualityCuts {
    fn default() -> Self {
        Self {
            teff_min: 4000.0,
            teff_max: 5500.0,
            vscatter_max: 1.0,
            snr_min: 200.0,
            metal_min: -3.0,
            metal_max: 10.0,
            logg_sentinel: -9999.0,
        }
    }
}

impl QualityCuts {
    /// Reject empty ranges and non-finite bounds.
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("teff_min", self.teff_min),
            ("teff_max", self.teff_max),
            ("vscatter_max", self.vscatter_max),
            ("snr_min", self.snr_min),
            ("metal_min", self.metal_min),
            ("metal_max", self.metal_max),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SelectError::InvalidConfig(format!("{name} is not finite")));
        }
        if self.teff_min >= self.teff_max {
            return Err(SelectError::InvalidConfig(format!(
                "teff range is empty: ({}, {})",
                self.teff_min, self.teff_max
            )));
        }
        if self.metal_min >= self.metal_max {
            return Err(SelectError::InvalidConfig(format!(
                "metal range is empty: ({}, {})",
                self.metal_min, self.metal_max
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Survey configuration
// ---------------------------------------------------------------------------

/// Where the survey lives and how stars are cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub data_dir: PathBuf,
    pub cuts: QualityCuts,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cuts: QualityCuts::default(),
        }
    }
}

impl SurveyConfig {
    /// Read a JSON config. Missing fields fall back to their defaults.
    ///
    /// ```json
    /// { "data_dir": "/data/apogee", "cuts": { "snr_min": 150.0 } }
    /// ```
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SurveyConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        config.cuts.validate()?;
        Ok(config)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolve a survey file name against [`data_dir`](Self::data_dir).
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}
