//! Face outline detection on full camera frames.
//!
//! Intensity → Gaussian smoothing → Canny edges → external contours →
//! polygon approximation; the largest 4-vertex polygon is the face.

use crate::core::{ColorImage, ColorImageView, Quad};
use image::RgbImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Edge and contour settings for [`find_face_quad`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectParams {
    /// Gaussian sigma applied to the intensity image before edge detection.
    /// Values `<= 0` skip the extra smoothing.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_frac: f64,
    /// Quads with an area at or below this (in pixels²) are ignored.
    pub min_area: f32,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            canny_low: 50.0,
            canny_high: 150.0,
            approx_epsilon_frac: 0.02,
            min_area: 0.0,
        }
    }
}

/// Borrow an `image::RgbImage` as a core color view.
pub fn color_view(img: &RgbImage) -> ColorImageView<'_> {
    ColorImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Convert a core color image back into an `image::RgbImage`.
pub fn to_rgb_image(img: &ColorImage) -> Option<RgbImage> {
    RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

/// Find the largest quadrilateral outline in `frame`.
///
/// Returns `None` when no external contour approximates to exactly four
/// vertices; that is the normal "no face in view" state. Equal-area
/// candidates are resolved by the leftmost, then topmost, centroid.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(frame, params),
        fields(width = frame.width(), height = frame.height())
    )
)]
pub fn find_face_quad(frame: &RgbImage, params: &DetectParams) -> Option<Quad> {
    let gray = image::imageops::grayscale(frame);
    let smoothed = if params.blur_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&gray, params.blur_sigma)
    } else {
        gray
    };
    let edges = imageproc::edges::canny(&smoothed, params.canny_low, params.canny_high);
    let contours = find_contours::<i32>(&edges);

    let quads = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| approximate_quad(c, params.approx_epsilon_frac));

    let best = select_largest(quads, params.min_area);
    if best.is_none() {
        log::debug!("no 4-vertex contour among {} contours", contours.len());
    }
    best
}

fn approximate_quad(contour: &Contour<i32>, epsilon_frac: f64) -> Option<Quad> {
    if contour.points.len() < 4 {
        return None;
    }
    let epsilon = epsilon_frac * arc_length(&contour.points, true);
    if epsilon <= 0.0 {
        return None;
    }
    let poly = approximate_closed(&contour.points, epsilon);
    let pts: [Point2<f32>; 4] = poly.try_into().ok()?;
    Some(Quad::from_unordered(pts))
}

/// Douglas-Peucker on a closed contour.
///
/// The loop is cut at its two mutually distant points so neither open half
/// starts at an arbitrary raster position, then each half is simplified.
fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point2<f32>> {
    let n = points.len();
    let centroid = points.iter().fold((0.0f64, 0.0f64), |(sx, sy), p| {
        (sx + p.x as f64, sy + p.y as f64)
    });
    let centroid = (centroid.0 / n as f64, centroid.1 / n as f64);

    let a = farthest_from(points, (centroid.0, centroid.1));
    let b = farthest_from(points, (points[a].x as f64, points[a].y as f64));
    if a == b {
        return Vec::new();
    }
    let (lo, hi) = (a.min(b), a.max(b));

    let first: Vec<Point<i32>> = points[lo..=hi].to_vec();
    let second: Vec<Point<i32>> = points[hi..]
        .iter()
        .chain(points[..=lo].iter())
        .copied()
        .collect();

    let mut out = Vec::new();
    for half in [first, second] {
        let mut simplified = approximate_polygon_dp(&half, epsilon, false);
        simplified.pop();
        out.extend(
            simplified
                .into_iter()
                .map(|p| Point2::new(p.x as f32, p.y as f32)),
        );
    }
    out
}

fn farthest_from(points: &[Point<i32>], origin: (f64, f64)) -> usize {
    let mut best = 0;
    let mut best_d = f64::MIN;
    for (i, p) in points.iter().enumerate() {
        let dx = p.x as f64 - origin.0;
        let dy = p.y as f64 - origin.1;
        let d = dx * dx + dy * dy;
        if d > best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

fn select_largest(quads: impl Iterator<Item = Quad>, min_area: f32) -> Option<Quad> {
    let mut best: Option<(Quad, f32)> = None;
    for quad in quads {
        let area = quad.area();
        if area <= min_area {
            continue;
        }
        let better = match &best {
            None => true,
            Some((current, best_area)) => {
                area > *best_area || (area == *best_area && precedes(&quad, current))
            }
        };
        if better {
            best = Some((quad, area));
        }
    }
    best.map(|(q, _)| q)
}

/// Leftmost centroid first, then topmost.
fn precedes(a: &Quad, b: &Quad) -> bool {
    let (ca, cb) = (a.centroid(), b.centroid());
    ca.x < cb.x || (ca.x == cb.x && ca.y < cb.y)
}
