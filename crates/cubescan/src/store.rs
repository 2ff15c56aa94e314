//! Calibration persistence and scan artifacts.
//!
//! Calibration files are flat JSON objects, `{"U": [h, s, v], ...}`, with
//! 8-bit HSV triples. A missing file means "no calibration yet".

use crate::core::{Calibration, ColorImage, FaceLabel, Hsv, Rgb};
use crate::detect::to_rgb_image;
use crate::pipeline::StickerColors;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("preview buffer does not match its {0}x{0} size")]
    Preview(usize),
}

/// Load/save the process-wide calibration.
pub trait CalibrationStore {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Calibration>, StoreError>;
    fn save(&mut self, calibration: &Calibration) -> Result<(), StoreError>;
}

/// Calibration kept in a JSON file.
#[derive(Clone, Debug)]
pub struct JsonCalibrationStore {
    path: PathBuf,
}

impl JsonCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for JsonCalibrationStore {
    fn load(&self) -> Result<Option<Calibration>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let centers: BTreeMap<FaceLabel, Hsv> = serde_json::from_str(&raw)?;
        log::debug!(
            "loaded {} calibration centers from {}",
            centers.len(),
            self.path.display()
        );
        Ok(Some(Calibration::new(centers)))
    }

    fn save(&mut self, calibration: &Calibration) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(calibration.centers())?;
        fs::write(&self.path, json)?;
        log::info!(
            "saved calibration v{} to {}",
            calibration.version(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store that counts writes.
#[derive(Clone, Debug, Default)]
pub struct MemoryCalibrationStore {
    pub current: Option<Calibration>,
    pub writes: usize,
}

impl MemoryCalibrationStore {
    pub fn with(calibration: Calibration) -> Self {
        Self {
            current: Some(calibration),
            writes: 0,
        }
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&self) -> Result<Option<Calibration>, StoreError> {
        Ok(self.current.clone())
    }

    fn save(&mut self, calibration: &Calibration) -> Result<(), StoreError> {
        self.current = Some(calibration.clone());
        self.writes += 1;
        Ok(())
    }
}

/// One committed face as written to the artifact store.
#[derive(Clone, Debug, Serialize)]
pub struct FaceArtifact<'a> {
    pub label: FaceLabel,
    /// Classified label per sticker; `None` when no calibration was available.
    pub mapped: Vec<Option<FaceLabel>>,
    pub colors: &'a [Rgb],
    #[serde(skip)]
    pub preview: &'a ColorImage,
}

/// Write-only sink for per-face previews and the final facelet string.
pub trait ArtifactStore {
    fn save_face(&mut self, face: &FaceArtifact<'_>) -> Result<(), StoreError>;
    fn save_facelets(&mut self, facelets: &str) -> Result<(), StoreError>;
}

/// Timestamped files under one directory.
#[derive(Clone, Debug)]
pub struct DirArtifactStore {
    dir: PathBuf,
}

impl DirArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn prepare(&self) -> Result<u64, StoreError> {
        fs::create_dir_all(&self.dir)?;
        Ok(unix_timestamp())
    }
}

impl ArtifactStore for DirArtifactStore {
    fn save_face(&mut self, face: &FaceArtifact<'_>) -> Result<(), StoreError> {
        let ts = self.prepare()?;
        let stem = format!("{}_{ts}", face.label);

        let preview = to_rgb_image(face.preview).ok_or(StoreError::Preview(face.preview.width))?;
        preview.save(self.dir.join(format!("{stem}.png")))?;

        let json = serde_json::to_string_pretty(face)?;
        fs::write(self.dir.join(format!("{stem}.json")), json)?;
        log::debug!("wrote face artifacts {stem}.{{png,json}}");
        Ok(())
    }

    fn save_facelets(&mut self, facelets: &str) -> Result<(), StoreError> {
        let ts = self.prepare()?;
        let path = self.dir.join(format!("facelets_{ts}.txt"));
        fs::write(&path, facelets)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

/// Discards every artifact.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullArtifactStore;

impl ArtifactStore for NullArtifactStore {
    fn save_face(&mut self, _face: &FaceArtifact<'_>) -> Result<(), StoreError> {
        Ok(())
    }

    fn save_facelets(&mut self, _facelets: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Build the artifact record of a committed face.
pub fn face_artifact<'a>(
    label: FaceLabel,
    colors: &'a StickerColors,
    mapped: Vec<Option<FaceLabel>>,
    preview: &'a ColorImage,
) -> FaceArtifact<'a> {
    FaceArtifact {
        label,
        mapped,
        colors,
        preview,
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
