//! JSON configuration for the scanner tools.

use crate::core::{
    ClassifierKind, ColorClassifier, ConfidenceThresholds, DEFAULT_FACE_SIZE, DEFAULT_INSET_FRAC,
};
use crate::detect::DetectParams;
use crate::pipeline::FacePipeline;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub detect: DetectParams,
    /// Edge length of the rectified face in pixels.
    pub face_size: usize,
    /// Fraction of each sticker cell trimmed before sampling.
    pub inset_frac: f32,
    pub thresholds: ConfidenceThresholds,
    pub calibration_path: PathBuf,
    pub scans_dir: PathBuf,
    /// External solver program; receives the facelet string as its argument.
    pub solver_command: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detect: DetectParams::default(),
            face_size: DEFAULT_FACE_SIZE,
            inset_frac: DEFAULT_INSET_FRAC,
            thresholds: ConfidenceThresholds::default(),
            calibration_path: PathBuf::from("calibration.json"),
            scans_dir: PathBuf::from("scans"),
            solver_command: None,
        }
    }
}

impl ScanConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn classifier(&self, kind: ClassifierKind) -> ColorClassifier {
        ColorClassifier::new(kind, self.thresholds)
    }

    /// Frame pipeline using the perceptual classifier.
    pub fn pipeline(&self) -> FacePipeline {
        FacePipeline {
            detect: self.detect.clone(),
            face_size: self.face_size,
            inset_frac: self.inset_frac,
            classifier: self.classifier(ClassifierKind::Perceptual),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ScanConfig =
            serde_json::from_str(r#"{"face_size": 240, "thresholds": {"high": 8.0, "low": 20.0}}"#)
                .expect("parse");
        assert_eq!(cfg.face_size, 240);
        assert_eq!(cfg.thresholds.high, 8.0);
        assert_eq!(cfg.detect, DetectParams::default());
        assert_eq!(cfg.calibration_path, PathBuf::from("calibration.json"));
        assert!(cfg.solver_command.is_none());
        assert_eq!(cfg.pipeline().face_size, 240);
    }

    #[test]
    fn default_pipeline_matches_library_defaults() {
        assert_eq!(ScanConfig::default().pipeline(), FacePipeline::default());
    }
}
