use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Face-label alphabet. Declaration order is the facelet order U, R, F, D, L, B
/// and the order used for ordered maps keyed by label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FaceLabel {
    U,
    R,
    F,
    D,
    L,
    B,
}

pub const FACE_ORDER: [FaceLabel; 6] = [
    FaceLabel::U,
    FaceLabel::R,
    FaceLabel::F,
    FaceLabel::D,
    FaceLabel::L,
    FaceLabel::B,
];

/// Number of stickers on one face.
pub const STICKERS_PER_FACE: usize = 9;

/// Index of the physical middle sticker in row-major order.
pub const CENTER_STICKER: usize = 4;

impl FaceLabel {
    pub fn as_char(self) -> char {
        match self {
            FaceLabel::U => 'U',
            FaceLabel::R => 'R',
            FaceLabel::F => 'F',
            FaceLabel::D => 'D',
            FaceLabel::L => 'L',
            FaceLabel::B => 'B',
        }
    }

    /// Case-insensitive parse of a single face symbol.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'U' => Some(FaceLabel::U),
            'R' => Some(FaceLabel::R),
            'F' => Some(FaceLabel::F),
            'D' => Some(FaceLabel::D),
            'L' => Some(FaceLabel::L),
            'B' => Some(FaceLabel::B),
            _ => None,
        }
    }
}

impl fmt::Display for FaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown face label {0:?} (expected one of U, R, F, D, L, B)")]
pub struct ParseFaceLabelError(pub String);

impl FromStr for FaceLabel {
    type Err = ParseFaceLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or_else(|| ParseFaceLabelError(s.into())),
            _ => Err(ParseFaceLabelError(s.into())),
        }
    }
}
