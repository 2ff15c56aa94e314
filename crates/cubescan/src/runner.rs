//! Frame-driven capture loop.
//!
//! One frame is pulled per tick, then at most one operator command is
//! applied to the [`CaptureSession`]. The device is released exactly once on
//! every exit path through [`DeviceGuard`].

use crate::core::{Calibration, FaceLabel};
use crate::device::{DeviceError, DeviceGuard, FrameSourceOpener};
use crate::input::{Command, OperatorInput};
use crate::pipeline::{FacePipeline, FrameScan};
use crate::session::{CaptureSession, ScanOutcome, SessionError, Transition};
use crate::solver::Solver;
use crate::store::{face_artifact, ArtifactStore, CalibrationStore, StoreError};
use image::RgbImage;

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("setup failed: {0}")]
    Setup(#[source] DeviceError),
    #[error(transparent)]
    Device(DeviceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("calibration store: {0}")]
    Store(#[from] StoreError),
}

/// External collaborators of a scan.
pub struct ScanServices<'a> {
    pub calibration: &'a mut dyn CalibrationStore,
    pub artifacts: &'a mut dyn ArtifactStore,
    pub solver: Option<&'a dyn Solver>,
}

/// Run a capture session until six faces are committed, the operator quits,
/// or the stream ends.
pub fn run_scan<O: FrameSourceOpener>(
    opener: &O,
    input: &mut dyn OperatorInput,
    pipeline: &FacePipeline,
    services: ScanServices<'_>,
) -> Result<ScanOutcome, ScanError> {
    let mut device = DeviceGuard::new(opener.open().map_err(ScanError::Setup)?);

    let calibration = services.calibration.load()?.unwrap_or_else(Calibration::empty);
    if !calibration.is_complete() {
        log::warn!(
            "calibration has {}/6 centers; captures stay unclassified until it is complete",
            calibration.centers().len()
        );
    }
    let mut session = CaptureSession::new(pipeline.classifier, calibration);

    loop {
        let Some(frame) = device.next_frame().map_err(ScanError::Device)? else {
            log::info!("frame stream ended");
            return Err(incomplete(&session));
        };

        let Some(cmd) = input.next_command() else {
            if session.pending_label().is_some() {
                let scan = pipeline.scan_frame(&frame, session.calibration());
                if let Some(capture) = scan.capture() {
                    session.refresh(capture);
                }
            }
            continue;
        };

        match cmd {
            Command::Face(label) => select_face(&mut session, pipeline, &frame, label),
            Command::Store => {
                if let Transition::Stored { label, count } = session.store() {
                    log::info!("{label}: {count} sample(s) stored");
                }
            }
            Command::Finalize => {
                let Transition::Finalized { label, .. } = session.finalize() else {
                    continue;
                };
                save_face(&session, label, &mut *services.artifacts);
                if session.is_full() {
                    let outcome = session.complete(&mut *services.calibration, services.solver)?;
                    if let Err(err) = services.artifacts.save_facelets(outcome.facelets.as_str()) {
                        log::warn!("could not save facelets: {err}");
                    }
                    return Ok(outcome);
                }
            }
            Command::Reject => {
                session.reject();
            }
            Command::Unfinalize => {
                session.unfinalize();
            }
            Command::Test => log::debug!("test mode is only available while calibrating"),
            Command::Quit => {
                log::info!("quit requested");
                return Err(incomplete(&session));
            }
        }
    }
}

fn incomplete(session: &CaptureSession) -> ScanError {
    SessionError::Incomplete {
        committed: session.committed(),
    }
    .into()
}

fn select_face(
    session: &mut CaptureSession,
    pipeline: &FacePipeline,
    frame: &RgbImage,
    label: FaceLabel,
) {
    match pipeline.scan_frame(frame, session.calibration()) {
        FrameScan::Face(capture) => {
            session.propose(label, capture);
            log::info!("{label}: face proposed");
        }
        FrameScan::Unclassified(_) => {
            log::warn!("{label}: stickers could not be classified; calibrate first")
        }
        FrameScan::NoFace => log::debug!("{label}: no face detected"),
    }
}

fn save_face(session: &CaptureSession, label: FaceLabel, artifacts: &mut dyn ArtifactStore) {
    let Some(record) = session.record(label) else {
        return;
    };
    let face = face_artifact(label, &record.colors, session.mapped(label), &record.preview);
    if let Err(err) = artifacts.save_face(&face) {
        log::warn!("could not save artifacts for {label}: {err}");
    }
}
