//! Nearest-center sticker classification.
//!
//! Two variants share one contract: [`ClassifierKind::Perceptual`] compares in
//! CIE Lab and is used for committed faces; [`ClassifierKind::Hsv`] compares
//! raw HSV triples and serves live calibration feedback.

use crate::{Calibration, FaceLabel, Hsv, Lab, Rgb};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Perceptual,
    Hsv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Distance cut-offs for confidence grading (inclusive upper bounds).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub high: f32,
    pub low: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 10.0,
            low: 25.0,
        }
    }
}

impl ConfidenceThresholds {
    pub fn grade(&self, distance: f32) -> Confidence {
        if distance <= self.high {
            Confidence::High
        } else if distance <= self.low {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorMatch {
    pub label: FaceLabel,
    pub distance: f32,
    pub confidence: Confidence,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorClassifier {
    pub kind: ClassifierKind,
    pub thresholds: ConfidenceThresholds,
}

enum References {
    Lab(Vec<(FaceLabel, Lab)>),
    Hsv(Vec<(FaceLabel, Hsv)>),
}

#[derive(Clone, Copy)]
enum Probe {
    Rgb(Rgb),
    Hsv(Hsv),
}

impl Probe {
    fn to_lab(self) -> Lab {
        match self {
            Probe::Rgb(c) => c.to_lab(),
            Probe::Hsv(c) => c.to_lab(),
        }
    }

    fn to_hsv(self) -> Hsv {
        match self {
            Probe::Rgb(c) => c.to_hsv(),
            Probe::Hsv(c) => c,
        }
    }
}

impl ColorClassifier {
    pub fn new(kind: ClassifierKind, thresholds: ConfidenceThresholds) -> Self {
        Self { kind, thresholds }
    }

    /// Nearest calibration center for one sample, or `None` without centers.
    pub fn classify(&self, color: Rgb, calibration: &Calibration) -> Option<ColorMatch> {
        self.nearest(Probe::Rgb(color), &self.references(calibration))
    }

    /// Same as [`ColorClassifier::classify`] for a sample already in 8-bit HSV.
    pub fn classify_hsv(&self, color: Hsv, calibration: &Calibration) -> Option<ColorMatch> {
        self.nearest(Probe::Hsv(color), &self.references(calibration))
    }

    /// Classify a batch against the same calibration, converting centers once.
    pub fn classify_all(
        &self,
        colors: &[Rgb],
        calibration: &Calibration,
    ) -> Vec<Option<ColorMatch>> {
        let refs = self.references(calibration);
        colors
            .iter()
            .map(|&c| self.nearest(Probe::Rgb(c), &refs))
            .collect()
    }

    fn references(&self, calibration: &Calibration) -> References {
        let centers = calibration.centers().iter();
        match self.kind {
            ClassifierKind::Perceptual => {
                References::Lab(centers.map(|(&l, hsv)| (l, hsv.to_lab())).collect())
            }
            ClassifierKind::Hsv => References::Hsv(centers.map(|(&l, &hsv)| (l, hsv)).collect()),
        }
    }

    fn nearest(&self, probe: Probe, refs: &References) -> Option<ColorMatch> {
        let best = match refs {
            References::Lab(refs) => {
                let lab = probe.to_lab();
                pick_nearest(refs.iter().map(|(l, c)| (*l, lab.distance(*c))))
            }
            References::Hsv(refs) => {
                let hsv = probe.to_hsv();
                pick_nearest(refs.iter().map(|(l, c)| (*l, hsv.distance(*c))))
            }
        }?;
        Some(ColorMatch {
            label: best.0,
            distance: best.1,
            confidence: self.thresholds.grade(best.1),
        })
    }
}

/// First strictly-smallest distance wins.
fn pick_nearest(candidates: impl Iterator<Item = (FaceLabel, f32)>) -> Option<(FaceLabel, f32)> {
    let mut best: Option<(FaceLabel, f32)> = None;
    for (label, d) in candidates {
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((label, d));
        }
    }
    best
}
