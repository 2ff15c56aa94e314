//! Six-face capture session.
//!
//! The session is an explicit state machine driven by discrete operator
//! events. It owns the per-label accumulation buffers and committed face
//! records, and holds the calibration it classifies against. Completion runs
//! one load-refresh-save cycle: build centers from the committed faces, save
//! them, then re-classify every face with the fresh centers.

use crate::core::{
    build_calibration, Calibration, CalibrationError, ColorClassifier, ColorImage, FaceLabel, Rgb,
    FACE_ORDER, STICKERS_PER_FACE,
};
use crate::pipeline::{FaceCapture, StickerColors};
use crate::solver::Solver;
use crate::store::{CalibrationStore, StoreError};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("session ended with {committed} of 6 faces committed")]
    Incomplete { committed: usize },
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("calibration store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, Default)]
pub enum SessionState {
    #[default]
    AwaitingFace,
    /// One face proposed for `label`, waiting for the operator.
    PreviewPending { label: FaceLabel, capture: FaceCapture },
}

/// Committed colors for one label.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRecord {
    pub colors: StickerColors,
    /// Number of stored captures averaged into `colors` (1 for a direct commit).
    pub samples: usize,
    pub preview: ColorImage,
}

/// Observable effect of one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Proposed(FaceLabel),
    Refreshed(FaceLabel),
    Stored { label: FaceLabel, count: usize },
    Finalized { label: FaceLabel, samples: usize },
    Rejected(FaceLabel),
    Unfinalized { label: FaceLabel, removed: bool },
    /// Event has no effect in the current state.
    Ignored,
}

/// Facelet string: 54 labels, faces in U,R,F,D,L,B order, each row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Facelets(String);

impl Facelets {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The nine symbols of one face.
    pub fn face(&self, label: FaceLabel) -> &str {
        let i = FACE_ORDER.iter().position(|&l| l == label).unwrap_or(0) * STICKERS_PER_FACE;
        &self.0[i..i + STICKERS_PER_FACE]
    }
}

impl fmt::Display for Facelets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a completed session.
#[derive(Clone, Debug)]
pub struct ScanOutcome {
    pub facelets: Facelets,
    /// Move sequence from the solver, when one ran and succeeded.
    pub solution: Option<String>,
    /// Solver failure message; the facelets remain valid.
    pub solver_error: Option<String>,
    /// The calibration built from this session's faces.
    pub calibration: Calibration,
}

type CellSamples = Vec<Vec<Rgb>>;

pub struct CaptureSession {
    state: SessionState,
    buffers: BTreeMap<FaceLabel, CellSamples>,
    faces: BTreeMap<FaceLabel, FaceRecord>,
    classifier: ColorClassifier,
    calibration: Calibration,
    completed: bool,
}

impl CaptureSession {
    pub fn new(classifier: ColorClassifier, calibration: Calibration) -> Self {
        Self {
            state: SessionState::AwaitingFace,
            buffers: BTreeMap::new(),
            faces: BTreeMap::new(),
            classifier,
            calibration,
            completed: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn pending_label(&self) -> Option<FaceLabel> {
        match &self.state {
            SessionState::PreviewPending { label, .. } => Some(*label),
            SessionState::AwaitingFace => None,
        }
    }

    /// Stored capture count for `label` since its last finalize.
    pub fn buffered(&self, label: FaceLabel) -> usize {
        self.buffers
            .get(&label)
            .and_then(|cells| cells.first())
            .map_or(0, Vec::len)
    }

    pub fn record(&self, label: FaceLabel) -> Option<&FaceRecord> {
        self.faces.get(&label)
    }

    /// Number of labels with a committed record.
    pub fn committed(&self) -> usize {
        self.faces.len()
    }

    pub fn is_full(&self) -> bool {
        FACE_ORDER.iter().all(|l| self.faces.contains_key(l))
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Labels of a committed face under the current calibration.
    pub fn mapped(&self, label: FaceLabel) -> Vec<Option<FaceLabel>> {
        self.faces.get(&label).map_or_else(Vec::new, |rec| {
            self.classifier
                .classify_all(&rec.colors, &self.calibration)
                .into_iter()
                .map(|m| m.map(|m| m.label))
                .collect()
        })
    }

    /// Propose `capture` for `label`, replacing any pending preview.
    pub fn propose(&mut self, label: FaceLabel, capture: FaceCapture) -> Transition {
        if self.completed {
            return Transition::Ignored;
        }
        self.state = SessionState::PreviewPending { label, capture };
        Transition::Proposed(label)
    }

    /// Replace the pending capture with a fresh one of the same label.
    pub fn refresh(&mut self, capture: FaceCapture) -> Transition {
        match &mut self.state {
            SessionState::PreviewPending { label, capture: c } if !self.completed => {
                *c = capture;
                Transition::Refreshed(*label)
            }
            _ => Transition::Ignored,
        }
    }

    /// Append the pending capture's colors to its label's buffer.
    pub fn store(&mut self) -> Transition {
        let SessionState::PreviewPending { label, capture } = &self.state else {
            return Transition::Ignored;
        };
        if self.completed {
            return Transition::Ignored;
        }
        let label = *label;
        let cells = self
            .buffers
            .entry(label)
            .or_insert_with(|| vec![Vec::new(); STICKERS_PER_FACE]);
        for (cell, &color) in cells.iter_mut().zip(capture.colors.iter()) {
            cell.push(color);
        }
        let count = cells[0].len();
        log::debug!("stored sample {count} for {label}");
        Transition::Stored { label, count }
    }

    /// Commit the buffered mean (or the pending capture) as the label's record.
    pub fn finalize(&mut self) -> Transition {
        if self.completed {
            return Transition::Ignored;
        }
        let SessionState::PreviewPending { label, capture } = std::mem::take(&mut self.state)
        else {
            return Transition::Ignored;
        };

        let (colors, samples) = match self.buffers.remove(&label) {
            Some(cells) if !cells.iter().all(Vec::is_empty) => {
                let avg = average_samples_per_cell(&cells);
                let colors = std::array::from_fn(|i| avg.get(i).copied().unwrap_or(Rgb::BLACK));
                (colors, cells[0].len())
            }
            _ => (capture.colors, 1),
        };
        let replaced = self
            .faces
            .insert(
                label,
                FaceRecord {
                    colors,
                    samples,
                    preview: capture.preview,
                },
            )
            .is_some();
        log::info!(
            "finalized {label} from {samples} sample(s){} ({}/6)",
            if replaced { ", replacing previous" } else { "" },
            self.faces.len()
        );
        Transition::Finalized { label, samples }
    }

    /// Drop the pending capture.
    pub fn reject(&mut self) -> Transition {
        if self.completed {
            return Transition::Ignored;
        }
        match std::mem::take(&mut self.state) {
            SessionState::PreviewPending { label, .. } => {
                log::debug!("rejected capture for {label}");
                Transition::Rejected(label)
            }
            SessionState::AwaitingFace => Transition::Ignored,
        }
    }

    /// Remove the pending label's committed record, if any.
    pub fn unfinalize(&mut self) -> Transition {
        if self.completed {
            return Transition::Ignored;
        }
        let SessionState::PreviewPending { label, .. } = std::mem::take(&mut self.state) else {
            return Transition::Ignored;
        };
        self.buffers.remove(&label);
        let removed = self.faces.remove(&label).is_some();
        if removed {
            log::info!("unfinalized {label} ({}/6)", self.faces.len());
        }
        Transition::Unfinalized { label, removed }
    }

    /// Close the session once all six faces are committed.
    ///
    /// Builds and saves the new calibration (one store write), re-classifies
    /// every face with it and assembles the facelet string. A solver failure
    /// is logged and reported in the outcome.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(committed = self.faces.len()))
    )]
    pub fn complete(
        &mut self,
        store: &mut dyn CalibrationStore,
        solver: Option<&dyn Solver>,
    ) -> Result<ScanOutcome, SessionError> {
        if !self.is_full() {
            return Err(SessionError::Incomplete {
                committed: self.faces.len(),
            });
        }

        let raw: BTreeMap<FaceLabel, Vec<Rgb>> = self
            .faces
            .iter()
            .map(|(&label, rec)| (label, rec.colors.to_vec()))
            .collect();
        let centers = build_calibration(&raw)?;
        let calibration = self.calibration.refreshed(centers);
        store.save(&calibration)?;

        let mut facelets = String::with_capacity(FACE_ORDER.len() * STICKERS_PER_FACE);
        for label in FACE_ORDER {
            let rec = &self.faces[&label];
            for m in self.classifier.classify_all(&rec.colors, &calibration) {
                facelets.push(m.map_or(label, |m| m.label).as_char());
            }
        }
        let facelets = Facelets(facelets);
        log::info!("facelets: {facelets}");

        let (solution, solver_error) = match solver.map(|s| s.solve(facelets.as_str())) {
            Some(Ok(moves)) => (Some(moves), None),
            Some(Err(err)) => {
                log::warn!("solver failed: {err}");
                (None, Some(err.to_string()))
            }
            None => (None, None),
        };

        self.state = SessionState::AwaitingFace;
        self.calibration = calibration.clone();
        self.completed = true;

        Ok(ScanOutcome {
            facelets,
            solution,
            solver_error,
            calibration,
        })
    }
}

/// Per-cell mean of stored samples (truncated); an empty cell yields black.
pub fn average_samples_per_cell(cells: &[Vec<Rgb>]) -> Vec<Rgb> {
    cells
        .iter()
        .map(|samples| {
            if samples.is_empty() {
                return Rgb::BLACK;
            }
            let mut sum = [0u32; 3];
            for s in samples {
                for c in 0..3 {
                    sum[c] += s.0[c] as u32;
                }
            }
            let n = samples.len() as u32;
            Rgb(sum.map(|v| (v / n) as u8))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColorMatch, Confidence, Quad};
    use crate::solver::SolverError;
    use crate::store::MemoryCalibrationStore;
    use nalgebra::Point2;

    fn capture(color: Rgb) -> FaceCapture {
        FaceCapture {
            quad: Quad::from_unordered([
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ]),
            preview: ColorImage::filled(3, 3, color.0),
            colors: [color; 9],
            centers: [Point2::new(0.5, 0.5); 9],
            matches: [ColorMatch {
                label: FaceLabel::U,
                distance: 0.0,
                confidence: Confidence::High,
            }; 9],
        }
    }

    fn face_color(label: FaceLabel) -> Rgb {
        match label {
            FaceLabel::U => Rgb([245, 245, 245]),
            FaceLabel::R => Rgb([200, 20, 30]),
            FaceLabel::F => Rgb([20, 170, 60]),
            FaceLabel::D => Rgb([240, 220, 20]),
            FaceLabel::L => Rgb([250, 120, 20]),
            FaceLabel::B => Rgb([20, 60, 200]),
        }
    }

    fn session() -> CaptureSession {
        CaptureSession::new(ColorClassifier::default(), Calibration::empty())
    }

    fn commit_all(s: &mut CaptureSession) {
        for label in FACE_ORDER {
            s.propose(label, capture(face_color(label)));
            assert_eq!(s.finalize(), Transition::Finalized { label, samples: 1 });
        }
    }

    struct Rejecting;

    impl Solver for Rejecting {
        fn solve(&self, _facelets: &str) -> Result<String, SolverError> {
            Err(SolverError::Rejected("invalid cube".into()))
        }
    }

    #[test]
    fn averaging_is_per_cell() {
        let cells = vec![vec![Rgb([10, 10, 10]), Rgb([20, 20, 20])]; 9];
        let avg = average_samples_per_cell(&cells);
        assert_eq!(avg.len(), 9);
        assert_eq!(avg[0], Rgb([15, 15, 15]));
    }

    #[test]
    fn empty_cell_averages_to_black() {
        let mut cells = vec![Vec::new(); 9];
        cells[3] = vec![Rgb([0, 0, 0]), Rgb([30, 30, 30])];
        let avg = average_samples_per_cell(&cells);
        assert_eq!(avg[0], Rgb::BLACK);
        assert_eq!(avg[3], Rgb([15, 15, 15]));
    }

    #[test]
    fn commands_without_a_pending_face_are_ignored() {
        let mut s = session();
        assert_eq!(s.store(), Transition::Ignored);
        assert_eq!(s.finalize(), Transition::Ignored);
        assert_eq!(s.reject(), Transition::Ignored);
        assert_eq!(s.unfinalize(), Transition::Ignored);
        assert_eq!(s.refresh(capture(Rgb::BLACK)), Transition::Ignored);
        assert_eq!(s.committed(), 0);
    }

    #[test]
    fn stored_samples_are_averaged_on_finalize() {
        let mut s = session();
        s.propose(FaceLabel::R, capture(Rgb([10, 10, 10])));
        assert_eq!(
            s.store(),
            Transition::Stored {
                label: FaceLabel::R,
                count: 1
            }
        );
        s.refresh(capture(Rgb([20, 20, 20])));
        assert_eq!(
            s.store(),
            Transition::Stored {
                label: FaceLabel::R,
                count: 2
            }
        );
        s.refresh(capture(Rgb([200, 200, 200])));
        assert_eq!(
            s.finalize(),
            Transition::Finalized {
                label: FaceLabel::R,
                samples: 2
            }
        );
        let rec = s.record(FaceLabel::R).expect("record");
        assert_eq!(rec.colors, [Rgb([15, 15, 15]); 9]);
        assert_eq!(s.buffered(FaceLabel::R), 0);
        assert!(matches!(s.state(), SessionState::AwaitingFace));
    }

    #[test]
    fn reject_leaves_buffers_alone() {
        let mut s = session();
        s.propose(FaceLabel::F, capture(Rgb([1, 2, 3])));
        s.store();
        assert_eq!(s.reject(), Transition::Rejected(FaceLabel::F));
        assert_eq!(s.buffered(FaceLabel::F), 1);
        assert_eq!(s.committed(), 0);
    }

    #[test]
    fn unfinalize_then_refinalize_keeps_one_slot() {
        let mut s = session();
        s.propose(FaceLabel::U, capture(Rgb([9, 9, 9])));
        s.finalize();
        assert_eq!(s.committed(), 1);

        s.propose(FaceLabel::U, capture(Rgb([9, 9, 9])));
        assert_eq!(
            s.unfinalize(),
            Transition::Unfinalized {
                label: FaceLabel::U,
                removed: true
            }
        );
        assert_eq!(s.committed(), 0);

        s.propose(FaceLabel::U, capture(Rgb([8, 8, 8])));
        s.finalize();
        s.propose(FaceLabel::U, capture(Rgb([7, 7, 7])));
        s.finalize();
        assert_eq!(s.committed(), 1);
        assert_eq!(s.record(FaceLabel::U).map(|r| r.colors[0]), Some(Rgb([7, 7, 7])));
    }

    #[test]
    fn unfinalize_without_record_is_a_noop() {
        let mut s = session();
        s.propose(FaceLabel::B, capture(Rgb([1, 1, 1])));
        assert_eq!(
            s.unfinalize(),
            Transition::Unfinalized {
                label: FaceLabel::B,
                removed: false
            }
        );
        assert_eq!(s.committed(), 0);
    }

    #[test]
    fn completing_early_is_incomplete() {
        let mut s = session();
        s.propose(FaceLabel::U, capture(Rgb([1, 1, 1])));
        s.finalize();
        let mut store = MemoryCalibrationStore::default();
        let err = s.complete(&mut store, None).unwrap_err();
        assert!(matches!(err, SessionError::Incomplete { committed: 1 }));
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn completion_builds_calibration_and_facelets() {
        let mut s = session();
        commit_all(&mut s);
        assert!(s.is_full());

        let mut store = MemoryCalibrationStore::default();
        let outcome = s.complete(&mut store, None).expect("complete");
        assert_eq!(store.writes, 1);
        assert_eq!(
            outcome.facelets.as_str(),
            "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"
        );
        assert_eq!(outcome.facelets.face(FaceLabel::D), "DDDDDDDDD");
        assert!(outcome.calibration.is_complete());
        assert_eq!(outcome.calibration.version(), 1);
        assert_eq!(store.current, Some(outcome.calibration.clone()));
        assert!(s.is_completed());
    }

    #[test]
    fn solver_failure_keeps_facelets() {
        let mut s = session();
        commit_all(&mut s);
        let mut store = MemoryCalibrationStore::default();
        let outcome = s.complete(&mut store, Some(&Rejecting)).expect("complete");
        assert_eq!(outcome.facelets.as_str().len(), 54);
        assert!(outcome.solution.is_none());
        assert!(outcome.solver_error.is_some());
    }

    #[test]
    fn completed_session_is_frozen() {
        let mut s = session();
        commit_all(&mut s);
        s.complete(&mut MemoryCalibrationStore::default(), None)
            .expect("complete");
        assert_eq!(s.propose(FaceLabel::U, capture(Rgb::BLACK)), Transition::Ignored);
        assert_eq!(s.committed(), 6);
    }
}
