#![allow(dead_code)]

use cubescan::{Calibration, FaceLabel, Rgb, FACE_ORDER};
use image::RgbImage;
use std::collections::BTreeMap;

pub const FRAME: u32 = 320;
pub const BODY: (u32, u32) = (40, 280);
pub const STICKER: u32 = 72;
pub const GAP: u32 = 6;

pub fn face_color(label: FaceLabel) -> Rgb {
    match label {
        FaceLabel::U => Rgb([245, 245, 245]),
        FaceLabel::R => Rgb([200, 20, 30]),
        FaceLabel::F => Rgb([20, 170, 60]),
        FaceLabel::D => Rgb([240, 220, 20]),
        FaceLabel::L => Rgb([250, 120, 20]),
        FaceLabel::B => Rgb([20, 60, 200]),
    }
}

/// Light background, dark cube body, 3×3 stickers in row-major order.
pub fn cube_frame(stickers: [Rgb; 9]) -> RgbImage {
    let mut img = RgbImage::from_pixel(FRAME, FRAME, image::Rgb([200, 200, 200]));
    for y in BODY.0..BODY.1 {
        for x in BODY.0..BODY.1 {
            img.put_pixel(x, y, image::Rgb([20, 20, 20]));
        }
    }
    for (i, color) in stickers.iter().enumerate() {
        let (row, col) = (i as u32 / 3, i as u32 % 3);
        let x0 = BODY.0 + GAP + col * (STICKER + GAP);
        let y0 = BODY.0 + GAP + row * (STICKER + GAP);
        for y in y0..y0 + STICKER {
            for x in x0..x0 + STICKER {
                img.put_pixel(x, y, image::Rgb(color.0));
            }
        }
    }
    img
}

pub fn solid_face(label: FaceLabel) -> RgbImage {
    cube_frame([face_color(label); 9])
}

/// Calibration from darkened face colors, close enough to classify every sticker.
pub fn rough_calibration() -> Calibration {
    let centers: BTreeMap<FaceLabel, _> = FACE_ORDER
        .iter()
        .map(|&l| {
            let c = face_color(l).0.map(|v| v.saturating_sub(15));
            (l, Rgb(c).to_hsv())
        })
        .collect();
    Calibration::new(centers)
}
