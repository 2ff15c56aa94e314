//! Live calibration recording.
//!
//! The operator holds each face's center sticker inside a fixed patch in the
//! middle of the frame and records samples per label. Saved centers are the
//! per-label mean of the recorded HSV samples. Test mode classifies the patch
//! with the HSV classifier against the current calibration.

use crate::core::{
    average_hsv, Calibration, ClassifierKind, ColorClassifier, ColorMatch, ConfidenceThresholds,
    FaceLabel, Hsv, Rgb,
};
use crate::device::{DeviceGuard, FrameSourceOpener};
use crate::input::{Command, OperatorInput};
use crate::runner::ScanError;
use crate::store::{CalibrationStore, StoreError};
use image::RgbImage;
use std::collections::BTreeMap;

/// Half the edge length of the sampled center patch, in pixels.
pub const PATCH_HALF_SIZE: u32 = 30;

/// Mean HSV of the square patch centered in `frame`, clamped to its bounds.
pub fn center_patch_hsv(frame: &RgbImage, half: u32) -> Option<Hsv> {
    let (w, h) = frame.dimensions();
    let (cx, cy) = (w / 2, h / 2);
    let x0 = cx.saturating_sub(half);
    let y0 = cy.saturating_sub(half);
    let x1 = (cx + half).min(w);
    let y1 = (cy + half).min(h);

    let mut pixels = Vec::with_capacity(((x1 - x0) * (y1 - y0)) as usize);
    for y in y0..y1 {
        for x in x0..x1 {
            pixels.push(Rgb(frame.get_pixel(x, y).0).to_hsv());
        }
    }
    average_hsv(&pixels)
}

pub struct CalibrationRecorder {
    samples: BTreeMap<FaceLabel, Vec<Hsv>>,
    classifier: ColorClassifier,
    half_size: u32,
    test_mode: bool,
    unsaved: bool,
}

impl CalibrationRecorder {
    pub fn new(thresholds: ConfidenceThresholds) -> Self {
        Self {
            samples: BTreeMap::new(),
            classifier: ColorClassifier::new(ClassifierKind::Hsv, thresholds),
            half_size: PATCH_HALF_SIZE,
            test_mode: false,
            unsaved: false,
        }
    }

    /// Record the center patch of `frame` for `label`.
    pub fn record(&mut self, label: FaceLabel, frame: &RgbImage) -> Option<Hsv> {
        let hsv = center_patch_hsv(frame, self.half_size)?;
        self.samples.entry(label).or_default().push(hsv);
        self.unsaved = true;
        log::info!("recorded sample for {label}: {:?}", hsv.0);
        Some(hsv)
    }

    pub fn sample_count(&self, label: FaceLabel) -> usize {
        self.samples.get(&label).map_or(0, Vec::len)
    }

    pub fn has_unsaved(&self) -> bool {
        self.unsaved
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn toggle_test_mode(&mut self) -> bool {
        self.test_mode = !self.test_mode;
        self.test_mode
    }

    /// Averaged center per recorded label.
    pub fn centers(&self) -> BTreeMap<FaceLabel, Hsv> {
        self.samples
            .iter()
            .filter_map(|(&label, s)| average_hsv(s).map(|hsv| (label, hsv)))
            .collect()
    }

    /// Classify the center patch of `frame` with the HSV classifier.
    pub fn test_sample(
        &self,
        frame: &RgbImage,
        calibration: &Calibration,
    ) -> Option<(Hsv, Option<ColorMatch>)> {
        let hsv = center_patch_hsv(frame, self.half_size)?;
        Some((hsv, self.classifier.classify_hsv(hsv, calibration)))
    }

    /// Write the averaged centers as the next version of `previous`.
    pub fn save(
        &mut self,
        store: &mut dyn CalibrationStore,
        previous: &Calibration,
    ) -> Result<Calibration, StoreError> {
        let calibration = previous.refreshed(self.centers());
        store.save(&calibration)?;
        self.unsaved = false;
        Ok(calibration)
    }
}

/// Drive a [`CalibrationRecorder`] from a frame source and operator commands.
///
/// Face selectors record, `store` saves, `test` toggles live feedback and
/// `quit` or the end of the stream stops. Unsaved samples are written on the
/// way out only with `save_on_quit`. Returns the last saved calibration.
pub fn run_calibration<O: FrameSourceOpener>(
    opener: &O,
    input: &mut dyn OperatorInput,
    store: &mut dyn CalibrationStore,
    thresholds: ConfidenceThresholds,
    save_on_quit: bool,
) -> Result<Option<Calibration>, ScanError> {
    let mut device = DeviceGuard::new(opener.open().map_err(ScanError::Setup)?);
    let mut current = store.load()?.unwrap_or_else(Calibration::empty);
    let mut saved = None;
    let mut recorder = CalibrationRecorder::new(thresholds);

    while let Some(frame) = device.next_frame().map_err(ScanError::Device)? {
        if recorder.test_mode() {
            match recorder.test_sample(&frame, &current) {
                Some((hsv, Some(m))) => {
                    log::info!("test {:?} -> {} ({:.1})", hsv.0, m.label, m.distance)
                }
                Some((hsv, None)) => log::info!("test {:?} (no calibration loaded)", hsv.0),
                None => {}
            }
        }

        match input.next_command() {
            Some(Command::Face(label)) => {
                recorder.record(label, &frame);
            }
            Some(Command::Store) => {
                current = recorder.save(store, &current)?;
                saved = Some(current.clone());
            }
            Some(Command::Test) => {
                let on = recorder.toggle_test_mode();
                log::info!("test mode {}", if on { "on" } else { "off" });
            }
            Some(Command::Quit) => break,
            Some(_) | None => {}
        }
    }

    if recorder.has_unsaved() {
        if save_on_quit {
            saved = Some(recorder.save(store, &current)?);
        } else {
            log::warn!("discarding unsaved calibration samples");
        }
    }
    Ok(saved)
}
