//! Sticker grid partitioning and per-cell mean color sampling.
//!
//! Regions and samples are always row-major: index = `row * grid + col`.

use crate::{ColorImageView, Rgb};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRID: usize = 3;

/// Fraction of a cell trimmed from each side to skip sticker borders and grout.
pub const DEFAULT_INSET_FRAC: f32 = 0.15;

/// Axis-aligned sampling rectangle in rectified-face pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl StickerRegion {
    pub fn center(&self) -> Point2<f32> {
        Point2::new(
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        )
    }
}

/// Split a `width`×`height` face into `grid`×`grid` cells, each shrunk by
/// `inset_frac` of the cell size on every side.
pub fn sticker_regions(
    width: usize,
    height: usize,
    grid: usize,
    inset_frac: f32,
) -> Vec<StickerRegion> {
    if grid == 0 {
        return Vec::new();
    }
    let cell_w = width / grid;
    let cell_h = height / grid;
    let pad_w = (cell_w as f32 * inset_frac) as usize;
    let pad_h = (cell_h as f32 * inset_frac) as usize;

    let mut regions = Vec::with_capacity(grid * grid);
    for r in 0..grid {
        for c in 0..grid {
            regions.push(StickerRegion {
                x: c * cell_w + pad_w,
                y: r * cell_h + pad_h,
                width: cell_w.saturating_sub(2 * pad_w),
                height: cell_h.saturating_sub(2 * pad_h),
            });
        }
    }
    regions
}

/// Mean color over each region (integer-truncated), clipped to the image.
///
/// A region with no pixels inside the image yields black.
pub fn sample_regions(img: &ColorImageView<'_>, regions: &[StickerRegion]) -> Vec<Rgb> {
    regions.iter().map(|r| mean_color(img, r)).collect()
}

fn mean_color(img: &ColorImageView<'_>, region: &StickerRegion) -> Rgb {
    let x1 = (region.x + region.width).min(img.width);
    let y1 = (region.y + region.height).min(img.height);
    if region.x >= x1 || region.y >= y1 {
        return Rgb::BLACK;
    }

    let mut sum = [0u64; 3];
    for y in region.y..y1 {
        for x in region.x..x1 {
            let p = img.pixel(x, y);
            for c in 0..3 {
                sum[c] += p[c] as u64;
            }
        }
    }
    let n = ((x1 - region.x) * (y1 - region.y)) as u64;
    Rgb(sum.map(|s| (s / n) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColorImage;

    #[test]
    fn region_centers_sit_mid_cell() {
        let regions = sticker_regions(300, 300, DEFAULT_GRID, DEFAULT_INSET_FRAC);
        assert_eq!(regions[0].center(), Point2::new(50.0, 50.0));
        assert_eq!(regions[5].center(), Point2::new(250.0, 150.0));
    }

    #[test]
    fn default_regions_are_inset_and_disjoint() {
        let regions = sticker_regions(300, 300, DEFAULT_GRID, DEFAULT_INSET_FRAC);
        assert_eq!(regions.len(), 9);
        assert_eq!(
            regions[0],
            StickerRegion {
                x: 15,
                y: 15,
                width: 70,
                height: 70
            }
        );
        assert_eq!(regions[5].x, 215);
        assert_eq!(regions[5].y, 115);

        for (i, a) in regions.iter().enumerate() {
            let (row, col) = (i / 3, i % 3);
            assert!(a.x >= col * 100 && a.x + a.width <= (col + 1) * 100);
            assert!(a.y >= row * 100 && a.y + a.height <= (row + 1) * 100);
            for b in &regions[i + 1..] {
                let overlap_x = a.x < b.x + b.width && b.x < a.x + a.width;
                let overlap_y = a.y < b.y + b.height && b.y < a.y + a.height;
                assert!(!(overlap_x && overlap_y), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn flat_image_samples_its_color() {
        let img = ColorImage::filled(300, 300, [12, 200, 99]);
        let regions = sticker_regions(300, 300, 3, 0.15);
        let colors = sample_regions(&img.view(), &regions);
        assert_eq!(colors, vec![Rgb([12, 200, 99]); 9]);
    }

    #[test]
    fn samples_follow_row_major_order() {
        let mut img = ColorImage::filled(300, 300, [0, 0, 0]);
        for y in 0..300 {
            for x in 0..300 {
                let idx = (y / 100) * 3 + x / 100;
                img.put_pixel(x, y, [idx as u8 * 20, 0, 0]);
            }
        }
        let colors = sample_regions(&img.view(), &sticker_regions(300, 300, 3, 0.15));
        for (i, c) in colors.iter().enumerate() {
            assert_eq!(c.0[0], i as u8 * 20);
        }
    }

    #[test]
    fn empty_region_samples_black() {
        let img = ColorImage::filled(10, 10, [255, 255, 255]);
        let empty = StickerRegion {
            x: 3,
            y: 3,
            width: 0,
            height: 4,
        };
        let outside = StickerRegion {
            x: 20,
            y: 20,
            width: 5,
            height: 5,
        };
        assert_eq!(
            sample_regions(&img.view(), &[empty, outside]),
            vec![Rgb::BLACK, Rgb::BLACK]
        );
    }
}
