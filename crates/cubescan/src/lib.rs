//! High-level facade for Rubik's-cube face scanning.
//!
//! This crate provides:
//! - re-exports of [`cubescan_core`] (geometry, sampling, color classification,
//!   calibration building)
//! - the face detector on `image::RgbImage` frames ([`detect`])
//! - the per-frame pipeline ([`pipeline`]) and the six-face capture session
//!   state machine ([`session`])
//! - the capture loop with its collaborators: frame sources, operator input,
//!   calibration and artifact stores, and the solver interface
//!
//! ## Quickstart
//!
//! ```no_run
//! use cubescan::{FacePipeline, FrameScan, JsonCalibrationStore, CalibrationStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = image::open("face.png")?.to_rgb8();
//! let calibration = JsonCalibrationStore::new("calibration.json")
//!     .load()?
//!     .unwrap_or_default();
//! match FacePipeline::default().scan_frame(&frame, &calibration) {
//!     FrameScan::Face(face) => println!("{:?}", face.matches.map(|m| m.label)),
//!     FrameScan::Unclassified(_) => println!("calibrate first"),
//!     FrameScan::NoFace => println!("no face in view"),
//! }
//! # Ok(())
//! # }
//! ```

pub use cubescan_core as core;

pub use cubescan_core::{
    Calibration, ClassifierKind, ColorClassifier, ColorMatch, Confidence, ConfidenceThresholds,
    FaceLabel, Hsv, Quad, Rgb, FACE_ORDER,
};

pub mod config;
pub mod detect;
pub mod device;
pub mod input;
pub mod pipeline;
pub mod recorder;
pub mod runner;
pub mod session;
pub mod solver;
pub mod store;

pub use config::{ConfigError, ScanConfig};
pub use detect::{find_face_quad, DetectParams};
pub use device::{
    DeviceError, DeviceGuard, FrameDirectory, FrameSource, FrameSourceOpener, ImageSequence,
};
pub use input::{parse_script, Command, OperatorInput, ScriptedInput};
pub use pipeline::{
    FaceCapture, FacePipeline, FrameScan, SampledFace, StickerCenters, StickerColors,
};
pub use recorder::{run_calibration, CalibrationRecorder};
pub use runner::{run_scan, ScanError, ScanServices};
pub use session::{CaptureSession, Facelets, ScanOutcome, SessionError, SessionState, Transition};
pub use solver::{CommandSolver, Solver, SolverError};
pub use store::{
    ArtifactStore, CalibrationStore, DirArtifactStore, JsonCalibrationStore,
    MemoryCalibrationStore, NullArtifactStore, StoreError,
};
