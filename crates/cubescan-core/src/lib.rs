//! Core building blocks for scanning Rubik's-cube faces.
//!
//! This crate is purely geometric and colorimetric. It does *not* depend on
//! any concrete image type or edge detector; frames are passed as borrowed
//! RGB views.
//!
//! Pipeline pieces, leaf first:
//! - [`rectify_face`]: perspective-correct a detected [`Quad`] into a square.
//! - [`sticker_regions`] / [`sample_regions`]: 3×3 inset grid, mean color per cell.
//! - [`ColorClassifier`]: nearest calibration center with confidence grading.
//! - [`build_calibration`]: centers from six scanned faces.

mod calibration;
mod classify;
mod color;
mod homography;
mod image;
mod label;
mod logger;
mod quad;
mod rectify;
mod sampler;

pub use calibration::{
    average_hsv, build_calibration, median_hsv, Calibration, CalibrationError, CENTER_SV_RATIO,
};
pub use classify::{
    ClassifierKind, ColorClassifier, ColorMatch, Confidence, ConfidenceThresholds,
};
pub use color::{Hsv, Lab, Rgb};
pub use homography::{homography_from_4pt, warp_perspective_rgb, Homography};
pub use image::{sample_bilinear_rgb, sample_bilinear_rgb_u8, ColorImage, ColorImageView};
pub use label::{FaceLabel, ParseFaceLabelError, CENTER_STICKER, FACE_ORDER, STICKERS_PER_FACE};
pub use quad::{polygon_area, Quad};
pub use rectify::{rectify_face, RectifiedFace, RectifyError, DEFAULT_FACE_SIZE};
pub use sampler::{
    sample_regions, sticker_regions, StickerRegion, DEFAULT_GRID, DEFAULT_INSET_FRAC,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
