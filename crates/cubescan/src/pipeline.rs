//! Per-frame scan: detect → rectify → sample → classify.

use crate::core::{
    rectify_face, sample_regions, sticker_regions, Calibration, ColorClassifier, ColorImage,
    ColorMatch, Quad, Rgb, DEFAULT_FACE_SIZE, DEFAULT_GRID, DEFAULT_INSET_FRAC, STICKERS_PER_FACE,
};
use crate::detect::{color_view, find_face_quad, DetectParams};
use image::RgbImage;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Nine sticker colors of one face, row-major.
pub type StickerColors = [Rgb; STICKERS_PER_FACE];

/// Sticker region centers mapped back into frame pixels, row-major.
pub type StickerCenters = [Point2<f32>; STICKERS_PER_FACE];

/// Located, rectified and sampled face, before classification.
#[derive(Clone, Debug)]
pub struct SampledFace {
    pub quad: Quad,
    /// Rectified face, `face_size`×`face_size`.
    pub preview: ColorImage,
    pub colors: StickerColors,
    pub centers: StickerCenters,
}

/// A face found in a frame with all nine stickers labeled.
#[derive(Clone, Debug)]
pub struct FaceCapture {
    pub quad: Quad,
    /// Rectified face, `face_size`×`face_size`.
    pub preview: ColorImage,
    pub colors: StickerColors,
    pub centers: StickerCenters,
    pub matches: [ColorMatch; STICKERS_PER_FACE],
}

/// Result of scanning one frame.
#[derive(Clone, Debug)]
pub enum FrameScan {
    /// No quadrilateral in view.
    NoFace,
    /// A face was sampled but at least one sticker has no label (no calibration).
    Unclassified(SampledFace),
    Face(FaceCapture),
}

impl FrameScan {
    pub fn capture(self) -> Option<FaceCapture> {
        match self {
            FrameScan::Face(capture) => Some(capture),
            _ => None,
        }
    }
}

/// Detection, rectification and sampling settings bundled with a classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct FacePipeline {
    pub detect: DetectParams,
    pub face_size: usize,
    pub inset_frac: f32,
    pub classifier: ColorClassifier,
}

impl Default for FacePipeline {
    fn default() -> Self {
        Self {
            detect: DetectParams::default(),
            face_size: DEFAULT_FACE_SIZE,
            inset_frac: DEFAULT_INSET_FRAC,
            classifier: ColorClassifier::default(),
        }
    }
}

impl FacePipeline {
    /// Locate and rectify the face, then sample its nine stickers.
    pub fn sample_face(&self, frame: &RgbImage) -> Option<SampledFace> {
        let quad = find_face_quad(frame, &self.detect)?;
        let rectified = match rectify_face(&color_view(frame), &quad, self.face_size) {
            Ok(r) => r,
            Err(err) => {
                log::debug!("skipping quad {:?}: {err}", quad.corners);
                return None;
            }
        };
        let regions = sticker_regions(
            rectified.size,
            rectified.size,
            DEFAULT_GRID,
            self.inset_frac,
        );
        let samples = sample_regions(&rectified.image.view(), &regions);
        let colors = std::array::from_fn(|i| samples.get(i).copied().unwrap_or(Rgb::BLACK));
        let centers = std::array::from_fn(|i| {
            regions
                .get(i)
                .map_or(quad.centroid(), |r| rectified.frame_point(r.center()))
        });
        Some(SampledFace {
            quad,
            preview: rectified.image,
            colors,
            centers,
        })
    }

    /// Full per-frame scan against `calibration`.
    ///
    /// Detection misses and classification gaps are values, not errors.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(calibration = calibration.version()))
    )]
    pub fn scan_frame(&self, frame: &RgbImage, calibration: &Calibration) -> FrameScan {
        let Some(face) = self.sample_face(frame) else {
            return FrameScan::NoFace;
        };
        let matches: Option<Vec<ColorMatch>> = self
            .classifier
            .classify_all(&face.colors, calibration)
            .into_iter()
            .collect();
        match matches.and_then(|m| <[ColorMatch; STICKERS_PER_FACE]>::try_from(m).ok()) {
            Some(matches) => FrameScan::Face(FaceCapture {
                quad: face.quad,
                preview: face.preview,
                colors: face.colors,
                centers: face.centers,
                matches,
            }),
            None => FrameScan::Unclassified(face),
        }
    }
}
