use crate::{
    homography_from_4pt, warp_perspective_rgb, ColorImage, ColorImageView, Homography, Quad,
};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Default edge length of the rectified face image.
pub const DEFAULT_FACE_SIZE: usize = 300;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RectifyError {
    #[error("rectified face size must be positive")]
    ZeroSize,
    #[error("homography estimation failed (degenerate quad)")]
    HomographyFailed,
}

/// Perspective-corrected, axis-aligned square view of a detected face.
#[derive(Clone, Debug)]
pub struct RectifiedFace {
    pub image: ColorImage,
    pub size: usize,
    pub h_img_from_rect: Homography,
}

impl RectifiedFace {
    /// Map a point in rectified-face pixels back into the source frame.
    #[inline]
    pub fn frame_point(&self, p: Point2<f32>) -> Point2<f32> {
        self.h_img_from_rect.apply(p)
    }
}

/// Warp the region inside `quad` onto a `size`×`size` square.
///
/// The quad corners land on the square's corners in TL, TR, BR, BL order.
/// Output is a pure function of the inputs.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, quad), fields(width = src.width, height = src.height))
)]
pub fn rectify_face(
    src: &ColorImageView<'_>,
    quad: &Quad,
    size: usize,
) -> Result<RectifiedFace, RectifyError> {
    if size == 0 {
        return Err(RectifyError::ZeroSize);
    }
    let s = size as f32;
    let square = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];

    let h_img_from_rect =
        homography_from_4pt(&square, &quad.corners).ok_or(RectifyError::HomographyFailed)?;
    let image = warp_perspective_rgb(src, h_img_from_rect, size, size);

    Ok(RectifiedFace {
        image,
        size,
        h_img_from_rect,
    })
}
