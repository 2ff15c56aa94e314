//! Color triples and the conversions between camera RGB, 8-bit HSV and CIE Lab.
//!
//! HSV follows the 8-bit convention used by calibration files: hue is stored
//! as degrees / 2 (`0..180`), saturation and value span `0..=255`.

use palette::{FromColor, Hsv as PaletteHsv, Lab as PaletteLab, Srgb};
use serde::{Deserialize, Serialize};

/// Camera color sample, one byte per channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

/// 8-bit hue/saturation/value triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsv(pub [u8; 3]);

/// CIE L*a*b* (D65), native units: L in `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lab {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    pub fn to_hsv(self) -> Hsv {
        let hsv: PaletteHsv = PaletteHsv::from_color(self.to_srgb());
        let hue = (hsv.hue.into_positive_degrees() / 2.0).round() as u32 % 180;
        Hsv([
            hue as u8,
            unit_to_byte(hsv.saturation),
            unit_to_byte(hsv.value),
        ])
    }

    pub fn to_lab(self) -> Lab {
        Lab::from_srgb(self.to_srgb())
    }

    fn to_srgb(self) -> Srgb {
        Srgb::new(self.0[0], self.0[1], self.0[2]).into_format::<f32>()
    }
}

impl Hsv {
    pub fn hue(self) -> u8 {
        self.0[0]
    }

    pub fn saturation(self) -> u8 {
        self.0[1]
    }

    pub fn value(self) -> u8 {
        self.0[2]
    }

    pub fn to_rgb(self) -> Rgb {
        let rgb: Srgb = Srgb::from_color(self.to_palette());
        let rgb = rgb.into_format::<u8>();
        Rgb([rgb.red, rgb.green, rgb.blue])
    }

    pub fn to_lab(self) -> Lab {
        Lab::from_srgb(Srgb::from_color(self.to_palette()))
    }

    /// Plain Euclidean distance over the three raw channels (no hue wrap).
    pub fn distance(self, other: Hsv) -> f32 {
        let d: f32 = (0..3)
            .map(|c| {
                let diff = self.0[c] as f32 - other.0[c] as f32;
                diff * diff
            })
            .sum();
        d.sqrt()
    }

    fn to_palette(self) -> PaletteHsv {
        PaletteHsv::new(
            self.hue() as f32 * 2.0,
            self.saturation() as f32 / 255.0,
            self.value() as f32 / 255.0,
        )
    }
}

impl Lab {
    fn from_srgb(rgb: Srgb) -> Self {
        let lab: PaletteLab = PaletteLab::from_color(rgb);
        Self {
            l: lab.l,
            a: lab.a,
            b: lab.b,
        }
    }

    /// CIE76 color difference.
    pub fn distance(self, other: Lab) -> f32 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        (dl * dl + da * da + db * db).sqrt()
    }
}

#[inline]
fn unit_to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
