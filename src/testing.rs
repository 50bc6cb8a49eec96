//! Deterministic stand-ins for the camera, the vision library and the terminal.

use crate::camera::CameraDevice;
use crate::common::{FaceRecError, Result};
use crate::core::annotation::FrameReport;
use crate::core::capture::{FrameView, OperatorInput, OperatorKey};
use crate::core::classifier::FaceClassifier;
use crate::core::detector::FaceDetector;
use crate::core::pipeline::FacePipeline;
use crate::core::types::DetectionBox;
use image::{DynamicImage, GrayImage, Luma};
use std::collections::VecDeque;

/// Diagonal ramp from dark (top-left) to bright (bottom-right).
pub fn gradient_face(size: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        Luma([((x + y) * 255 / (2 * size).max(1)) as u8])
    })
}

/// Vertical stripes alternating every `period` columns.
pub fn stripe_face(size: u32, period: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, _| {
        if (x / period.max(1)) % 2 == 0 { Luma([40]) } else { Luma([210]) }
    })
}

pub fn solid_frame(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
}

pub fn fake_pipeline(boxes: Vec<DetectionBox>, classifier: TableClassifier) -> FacePipeline {
    FacePipeline::new(Box::new(FixedDetector::new(boxes)), Box::new(classifier), 64)
}

/// Reports the same boxes for every frame.
#[derive(Default)]
pub struct FixedDetector {
    boxes: Vec<DetectionBox>,
    fail: bool,
}

impl FixedDetector {
    pub fn new(boxes: Vec<DetectionBox>) -> Self {
        Self { boxes, fail: false }
    }

    pub fn failing() -> Self {
        Self { boxes: Vec::new(), fail: true }
    }
}

impl FaceDetector for FixedDetector {
    fn detect(&mut self, _frame: &GrayImage) -> Result<Vec<DetectionBox>> {
        if self.fail {
            return Err(FaceRecError::Pipeline("detector offline".into()));
        }
        Ok(self.boxes.clone())
    }
}

/// Training always succeeds; prediction answers with a fixed label and
/// distance, or errors when none was configured.
#[derive(Default)]
pub struct TableClassifier {
    answer: Option<(u32, f64)>,
}

impl TableClassifier {
    pub fn always(label: u32, distance: f64) -> Self {
        Self { answer: Some((label, distance)) }
    }
}

impl FaceClassifier for TableClassifier {
    fn train(&mut self, _images: &[GrayImage], _labels: &[u32]) -> Result<()> {
        Ok(())
    }

    fn predict(&self, _image: &GrayImage) -> Result<(u32, f64)> {
        self.answer
            .ok_or_else(|| FaceRecError::Pipeline("no answer configured".into()))
    }
}

/// Plays back a fixed list of frames, then reports end-of-stream.
pub struct ScriptedCamera {
    frames: VecDeque<DynamicImage>,
    open: bool,
    unavailable: bool,
    fail_when_empty: bool,
    pub releases: usize,
}

impl ScriptedCamera {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self {
            frames: frames.into(),
            open: false,
            unavailable: false,
            fail_when_empty: false,
            releases: 0,
        }
    }

    /// `open()` always fails.
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::new(Vec::new()) }
    }

    /// Reads error out once the frames run out instead of ending cleanly.
    pub fn failing_after(frames: Vec<DynamicImage>) -> Self {
        Self { fail_when_empty: true, ..Self::new(frames) }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl CameraDevice for ScriptedCamera {
    fn open(&mut self) -> Result<()> {
        if self.unavailable {
            return Err(FaceRecError::Camera("no such device".into()));
        }
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        if !self.open {
            return Ok(None);
        }
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.fail_when_empty => Err(FaceRecError::Camera("select timeout".into())),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.open = false;
        self.releases += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Hands out one scripted key per poll; `None` once the script is exhausted.
pub struct ScriptedInput {
    keys: VecDeque<Option<OperatorKey>>,
    repeat: Option<OperatorKey>,
}

impl ScriptedInput {
    pub fn new(keys: Vec<Option<OperatorKey>>) -> Self {
        Self { keys: keys.into(), repeat: None }
    }

    pub fn accept_every_frame() -> Self {
        Self { keys: VecDeque::new(), repeat: Some(OperatorKey::Accept) }
    }
}

impl OperatorInput for ScriptedInput {
    fn poll(&mut self) -> Result<Option<OperatorKey>> {
        Ok(self.keys.pop_front().unwrap_or(self.repeat))
    }
}

/// Keeps every report it is shown.
#[derive(Default)]
pub struct RecordingView {
    pub reports: Vec<FrameReport>,
    pub snapshots: usize,
    broken: bool,
}

impl RecordingView {
    /// Records what it is given but fails every write, like a closed terminal.
    pub fn broken() -> Self {
        Self { broken: true, ..Self::default() }
    }

    fn outcome(&self) -> Result<()> {
        if self.broken {
            return Err(FaceRecError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "terminal gone")));
        }
        Ok(())
    }
}

impl FrameView for RecordingView {
    fn show(&mut self, _frame: &DynamicImage, report: &FrameReport) -> Result<()> {
        self.reports.push(report.clone());
        self.outcome()
    }

    fn snapshot(&mut self, _frame: &DynamicImage, _report: &FrameReport) -> Result<()> {
        self.snapshots += 1;
        self.outcome()
    }

    fn notice(&mut self, _message: &str) -> Result<()> {
        self.outcome()
    }
}
