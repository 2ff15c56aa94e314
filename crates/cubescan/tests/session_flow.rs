mod common;

use common::{cube_frame, face_color, rough_calibration, solid_face};
use cubescan::{
    run_scan, Command, DeviceError, DirArtifactStore, FaceLabel, FacePipeline, FrameSource,
    FrameSourceOpener, ImageSequence, MemoryCalibrationStore, NullArtifactStore, ScanError,
    ScanServices, ScriptedInput, SessionError, Solver, SolverError, FACE_ORDER,
};
use image::RgbImage;
use std::cell::Cell;
use std::fs;
use std::rc::Rc;

struct CountingSource {
    inner: ImageSequence,
    releases: Rc<Cell<usize>>,
}

impl FrameSource for CountingSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, DeviceError> {
        self.inner.next_frame()
    }

    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
        self.inner.release();
    }
}

struct Frames {
    frames: Vec<RgbImage>,
    releases: Rc<Cell<usize>>,
}

impl Frames {
    fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            releases: Rc::new(Cell::new(0)),
        }
    }
}

impl FrameSourceOpener for Frames {
    type Source = CountingSource;

    fn open(&self) -> Result<CountingSource, DeviceError> {
        Ok(CountingSource {
            inner: ImageSequence::from_frames(self.frames.clone()),
            releases: self.releases.clone(),
        })
    }
}

struct NoDevice;

impl FrameSourceOpener for NoDevice {
    type Source = ImageSequence;

    fn open(&self) -> Result<ImageSequence, DeviceError> {
        Err(DeviceError::Unavailable("camera 0".into()))
    }
}

struct EchoSolver;

impl Solver for EchoSolver {
    fn solve(&self, facelets: &str) -> Result<String, SolverError> {
        Ok(format!("solved {}", &facelets[..9]))
    }
}

struct Rejecting;

impl Solver for Rejecting {
    fn solve(&self, _facelets: &str) -> Result<String, SolverError> {
        Err(SolverError::Rejected("cube state is not solvable".into()))
    }
}

/// Select, store twice and finalize each face; U is unfinalized and redone.
fn six_face_script(face: impl Fn(FaceLabel) -> RgbImage) -> (Vec<RgbImage>, ScriptedInput) {
    let mut frames = Vec::new();
    let mut ticks = Vec::new();
    let mut push = |frame: RgbImage, cmd: Option<Command>| {
        frames.push(frame);
        ticks.push(cmd);
    };
    for label in FACE_ORDER {
        push(face(label), Some(Command::Face(label)));
        push(face(label), None);
        push(face(label), Some(Command::Store));
        push(face(label), Some(Command::Store));
        push(face(label), Some(Command::Finalize));
        if label == FaceLabel::U {
            push(face(label), Some(Command::Face(label)));
            push(face(label), Some(Command::Unfinalize));
            push(face(label), Some(Command::Face(label)));
            push(face(label), Some(Command::Finalize));
        }
    }
    (frames, ScriptedInput::new(ticks))
}

#[test]
fn six_clean_faces_produce_facelets_and_one_calibration_write() {
    let (frames, mut input) = six_face_script(solid_face);
    let opener = Frames::new(frames);
    let mut store = MemoryCalibrationStore::with(rough_calibration());
    let mut artifacts = NullArtifactStore;

    let outcome = run_scan(
        &opener,
        &mut input,
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut artifacts,
            solver: Some(&EchoSolver),
        },
    )
    .expect("scan completes");

    assert_eq!(
        outcome.facelets.as_str(),
        "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"
    );
    assert_eq!(outcome.solution.as_deref(), Some("solved UUUUUUUUU"));
    assert_eq!(store.writes, 1);
    let saved = store.current.expect("saved calibration");
    assert_eq!(saved.version(), 2);
    for label in FACE_ORDER {
        assert_eq!(saved.get(label), Some(face_color(label).to_hsv()));
    }
    assert_eq!(opener.releases.get(), 1);
}

#[test]
fn facelets_follow_sticker_positions() {
    // Sticker 0 of every face shows the next face's color.
    let face = |label: FaceLabel| {
        let idx = FACE_ORDER.iter().position(|&l| l == label).unwrap_or(0);
        let mut stickers = [face_color(label); 9];
        stickers[0] = face_color(FACE_ORDER[(idx + 1) % 6]);
        cube_frame(stickers)
    };
    let (frames, mut input) = six_face_script(face);
    let mut store = MemoryCalibrationStore::with(rough_calibration());

    let outcome = run_scan(
        &Frames::new(frames),
        &mut input,
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut NullArtifactStore,
            solver: None,
        },
    )
    .expect("scan completes");

    assert_eq!(
        outcome.facelets.as_str(),
        "RUUUUUUUUFRRRRRRRRDFFFFFFFFLDDDDDDDDBLLLLLLLLUBBBBBBBB"
    );
    assert!(outcome.solution.is_none());
    assert!(outcome.solver_error.is_none());
}

#[test]
fn solver_failure_is_advisory() {
    let (frames, mut input) = six_face_script(solid_face);
    let mut store = MemoryCalibrationStore::with(rough_calibration());
    let outcome = run_scan(
        &Frames::new(frames),
        &mut input,
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut NullArtifactStore,
            solver: Some(&Rejecting),
        },
    )
    .expect("facelets survive solver failure");
    assert_eq!(outcome.facelets.as_str().len(), 54);
    assert!(outcome.solution.is_none());
    assert!(outcome
        .solver_error
        .as_deref()
        .is_some_and(|e| e.contains("not solvable")));
}

#[test]
fn quitting_early_is_incomplete_and_releases_the_device() {
    let frames = vec![solid_face(FaceLabel::U); 4];
    let mut input = ScriptedInput::new([
        Some(Command::Face(FaceLabel::U)),
        Some(Command::Finalize),
        Some(Command::Quit),
    ]);
    let opener = Frames::new(frames);
    let mut store = MemoryCalibrationStore::with(rough_calibration());

    let err = run_scan(
        &opener,
        &mut input,
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut NullArtifactStore,
            solver: None,
        },
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ScanError::Session(SessionError::Incomplete { committed: 1 })
    ));
    assert_eq!(store.writes, 0);
    assert_eq!(opener.releases.get(), 1);
}

#[test]
fn end_of_stream_is_incomplete() {
    let opener = Frames::new(vec![solid_face(FaceLabel::R); 2]);
    let mut store = MemoryCalibrationStore::default();
    let err = run_scan(
        &opener,
        &mut ScriptedInput::default(),
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut NullArtifactStore,
            solver: None,
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ScanError::Session(SessionError::Incomplete { committed: 0 })
    ));
    assert_eq!(opener.releases.get(), 1);
}

#[test]
fn without_calibration_no_face_is_committed() {
    let frames = vec![solid_face(FaceLabel::F); 3];
    let mut input = ScriptedInput::new([
        Some(Command::Face(FaceLabel::F)),
        Some(Command::Finalize),
    ]);
    let mut store = MemoryCalibrationStore::default();
    let err = run_scan(
        &Frames::new(frames),
        &mut input,
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut NullArtifactStore,
            solver: None,
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ScanError::Session(SessionError::Incomplete { committed: 0 })
    ));
}

#[test]
fn unavailable_device_is_a_setup_error() {
    let mut store = MemoryCalibrationStore::default();
    let err = run_scan(
        &NoDevice,
        &mut ScriptedInput::default(),
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut NullArtifactStore,
            solver: None,
        },
    )
    .unwrap_err();
    assert!(matches!(err, ScanError::Setup(DeviceError::Unavailable(_))));
}

#[test]
fn artifacts_are_written_per_face_and_for_facelets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (frames, mut input) = six_face_script(solid_face);
    let mut store = MemoryCalibrationStore::with(rough_calibration());
    let mut artifacts = DirArtifactStore::new(dir.path());

    let outcome = run_scan(
        &Frames::new(frames),
        &mut input,
        &FacePipeline::default(),
        ScanServices {
            calibration: &mut store,
            artifacts: &mut artifacts,
            solver: None,
        },
    )
    .expect("scan completes");

    let names: Vec<String> = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    for label in FACE_ORDER {
        assert!(names.iter().any(|n| n.starts_with(&format!("{label}_")) && n.ends_with(".png")));
        assert!(names.iter().any(|n| n.starts_with(&format!("{label}_")) && n.ends_with(".json")));
    }
    let facelets_file = names
        .iter()
        .find(|n| n.starts_with("facelets_"))
        .expect("facelets file");
    let text = fs::read_to_string(dir.path().join(facelets_file)).expect("read facelets");
    assert_eq!(text, outcome.facelets.as_str());

    let u_json = names
        .iter()
        .find(|n| n.starts_with("U_") && n.ends_with(".json"))
        .expect("U mapping");
    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(u_json)).expect("read"))
            .expect("json");
    assert_eq!(record["label"], "U");
    assert_eq!(record["mapped"].as_array().map(Vec::len), Some(9));
}
