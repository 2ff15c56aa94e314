use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Cube-face outline with corners in canonical order: top-left, top-right,
/// bottom-right, bottom-left (image coordinates, y pointing down).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
}

impl Quad {
    /// Canonicalize four polygon vertices.
    ///
    /// `x + y` is smallest at the top-left and largest at the bottom-right;
    /// `y - x` is smallest at the top-right and largest at the bottom-left.
    /// First index wins on ties.
    pub fn from_unordered(pts: [Point2<f32>; 4]) -> Self {
        let sum = pts.map(|p| p.x + p.y);
        let diff = pts.map(|p| p.y - p.x);

        let tl = pts[argmin(&sum)];
        let br = pts[argmax(&sum)];
        let tr = pts[argmin(&diff)];
        let bl = pts[argmax(&diff)];

        Self {
            corners: [tl, tr, br, bl],
        }
    }

    /// Enclosed area (shoelace), always non-negative.
    pub fn area(&self) -> f32 {
        polygon_area(&self.corners)
    }

    pub fn centroid(&self) -> Point2<f32> {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2::new(sx / 4.0, sy / 4.0)
    }
}

/// Absolute shoelace area of a closed polygon.
pub fn polygon_area(pts: &[Point2<f32>]) -> f32 {
    if pts.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for (i, p) in pts.iter().enumerate() {
        let q = pts[(i + 1) % pts.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (acc.abs() * 0.5) as f32
}

fn argmin(v: &[f32; 4]) -> usize {
    let mut best = 0;
    for i in 1..4 {
        if v[i] < v[best] {
            best = i;
        }
    }
    best
}

fn argmax(v: &[f32; 4]) -> usize {
    let mut best = 0;
    for i in 1..4 {
        if v[i] > v[best] {
            best = i;
        }
    }
    best
}
