//! Calibration centers and the builder that derives them from scanned faces.

use crate::{FaceLabel, Hsv, Rgb, CENTER_STICKER, FACE_ORDER};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Center cell is kept unless its S+V falls below this share of the median's.
pub const CENTER_SV_RATIO: f32 = 0.6;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("face {0} has no color samples")]
    EmptyFace(FaceLabel),
}

/// Versioned set of reference colors, one per face label.
///
/// Iteration follows the canonical face order; classifiers rely on that order
/// to break exact distance ties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calibration {
    centers: BTreeMap<FaceLabel, Hsv>,
    version: u64,
}

impl Calibration {
    /// Calibration with no centers; classifying against it yields no label.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(centers: BTreeMap<FaceLabel, Hsv>) -> Self {
        Self {
            centers,
            version: 1,
        }
    }

    /// Replace all centers, bumping the version.
    pub fn refreshed(&self, centers: BTreeMap<FaceLabel, Hsv>) -> Self {
        Self {
            centers,
            version: self.version + 1,
        }
    }

    pub fn centers(&self) -> &BTreeMap<FaceLabel, Hsv> {
        &self.centers
    }

    pub fn get(&self, label: FaceLabel) -> Option<Hsv> {
        self.centers.get(&label).copied()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// True once every face label has a center.
    pub fn is_complete(&self) -> bool {
        FACE_ORDER.iter().all(|l| self.centers.contains_key(l))
    }
}

/// Derive one HSV center per label from its raw (row-major) sticker colors.
///
/// The middle sticker is preferred; when it looks washed out or shadowed
/// compared to the element-wise median of all samples, the median is used.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(raw_faces), fields(faces = raw_faces.len()))
)]
pub fn build_calibration(
    raw_faces: &BTreeMap<FaceLabel, Vec<Rgb>>,
) -> Result<BTreeMap<FaceLabel, Hsv>, CalibrationError> {
    let mut centers = BTreeMap::new();
    for (&label, samples) in raw_faces {
        let center = canonical_center(samples).ok_or(CalibrationError::EmptyFace(label))?;
        log::debug!("calibration center {label}: {:?}", center.0);
        centers.insert(label, center);
    }
    Ok(centers)
}

fn canonical_center(samples: &[Rgb]) -> Option<Hsv> {
    let middle = samples
        .get(CENTER_STICKER)
        .or_else(|| samples.get(samples.len() / 2))?;
    let center = middle.to_hsv();

    let hsvs: Vec<Hsv> = samples.iter().map(|s| s.to_hsv()).collect();
    let median = median_hsv(&hsvs)?;

    let sv_center = center.saturation() as f32 + center.value() as f32;
    let sv_median = median.saturation() as f32 + median.value() as f32;
    if sv_center >= sv_median * CENTER_SV_RATIO {
        Some(center)
    } else {
        Some(median)
    }
}

/// Element-wise median; even counts average the two middle values (truncated).
pub fn median_hsv(samples: &[Hsv]) -> Option<Hsv> {
    if samples.is_empty() {
        return None;
    }
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let mut channel: Vec<u8> = samples.iter().map(|s| s.0[c]).collect();
        channel.sort_unstable();
        let n = channel.len();
        *slot = if n % 2 == 1 {
            channel[n / 2]
        } else {
            ((channel[n / 2 - 1] as u16 + channel[n / 2] as u16) / 2) as u8
        };
    }
    Some(Hsv(out))
}

/// Element-wise mean (truncated).
pub fn average_hsv(samples: &[Hsv]) -> Option<Hsv> {
    if samples.is_empty() {
        return None;
    }
    let mut sum = [0u32; 3];
    for s in samples {
        for c in 0..3 {
            sum[c] += s.0[c] as u32;
        }
    }
    let n = samples.len() as u32;
    Some(Hsv(sum.map(|v| (v / n) as u8)))
}
