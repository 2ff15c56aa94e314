//! Frame acquisition and scoped device release.

use image::RgbImage;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    /// The device could not be opened; nothing can be captured.
    #[error("capture device unavailable: {0}")]
    Unavailable(String),
    /// A frame read failed after the device was opened.
    #[error("frame read failed: {0}")]
    Read(String),
}

/// A stream of frames that must be released exactly once.
pub trait FrameSource {
    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, DeviceError>;
    fn release(&mut self);
}

/// Opens a [`FrameSource`]; failure is a setup error.
pub trait FrameSourceOpener {
    type Source: FrameSource;
    fn open(&self) -> Result<Self::Source, DeviceError>;
}

enum Frames {
    Files(VecDeque<PathBuf>),
    Memory(VecDeque<RgbImage>),
}

/// Frames replayed from image files or from memory.
pub struct ImageSequence {
    frames: Frames,
    released: bool,
}

impl ImageSequence {
    pub fn from_frames(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: Frames::Memory(frames.into_iter().collect()),
            released: false,
        }
    }

    pub fn from_files(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            frames: Frames::Files(paths.into_iter().collect()),
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, DeviceError> {
        if self.released {
            return Ok(None);
        }
        match &mut self.frames {
            Frames::Memory(frames) => Ok(frames.pop_front()),
            Frames::Files(paths) => {
                let Some(path) = paths.pop_front() else {
                    return Ok(None);
                };
                let img = image::open(&path)
                    .map_err(|e| DeviceError::Read(format!("{}: {e}", path.display())))?;
                Ok(Some(img.to_rgb8()))
            }
        }
    }

    fn release(&mut self) {
        self.released = true;
        match &mut self.frames {
            Frames::Memory(frames) => frames.clear(),
            Frames::Files(paths) => paths.clear(),
        }
    }
}

/// Directory of frame images, replayed in file-name order.
#[derive(Clone, Debug)]
pub struct FrameDirectory {
    dir: PathBuf,
}

const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tif"];

impl FrameDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn is_frame(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    }
}

impl FrameSourceOpener for FrameDirectory {
    type Source = ImageSequence;

    fn open(&self) -> Result<ImageSequence, DeviceError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| DeviceError::Unavailable(format!("{}: {e}", self.dir.display())))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| Self::is_frame(p))
            .collect();
        if paths.is_empty() {
            return Err(DeviceError::Unavailable(format!(
                "{}: no frame images",
                self.dir.display()
            )));
        }
        paths.sort();
        log::info!("opened {} frames from {}", paths.len(), self.dir.display());
        Ok(ImageSequence::from_files(paths))
    }
}

/// Owns an open source for the capture loop and releases it once on drop.
pub struct DeviceGuard<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> DeviceGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn next_frame(&mut self) -> Result<Option<RgbImage>, DeviceError> {
        self.source.next_frame()
    }
}

impl<S: FrameSource> Drop for DeviceGuard<S> {
    fn drop(&mut self) {
        log::debug!("releasing capture device");
        self.source.release();
    }
}
