use crate::camera::{CameraDevice, CameraSession};
use crate::common::Result;
use crate::core::annotation::{FaceAnnotation, FaceMark, FrameReport, FrameStatus};
use crate::core::pipeline::FacePipeline;
use image::{DynamicImage, GrayImage};

/// Operator commands polled once per loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKey {
    Accept,
    Cancel,
    Quit,
    Snapshot,
}

pub trait OperatorInput {
    /// Non-blocking: `Ok(None)` when nothing was pressed since the last poll.
    fn poll(&mut self) -> Result<Option<OperatorKey>>;
}

/// Where annotated frames go.
pub trait FrameView {
    fn show(&mut self, frame: &DynamicImage, report: &FrameReport) -> Result<()>;

    /// Keep an annotated copy of the current frame. Views without storage ignore it.
    fn snapshot(&mut self, _frame: &DynamicImage, _report: &FrameReport) -> Result<()> {
        Ok(())
    }

    /// One-line message for the operator.
    fn notice(&mut self, message: &str) -> Result<()> {
        tracing::info!("{}", message);
        Ok(())
    }
}

/// Show a frame. A view that cannot draw is logged and the loop carries on.
pub(crate) fn render(view: &mut dyn FrameView, frame: &DynamicImage, report: &FrameReport) {
    if let Err(e) = view.show(frame, report) {
        tracing::warn!("Failed to render frame: {}", e);
    }
}

pub(crate) fn tell(view: &mut dyn FrameView, message: &str) {
    if let Err(e) = view.notice(message) {
        tracing::warn!("Failed to show message {:?}: {}", message, e);
    }
}

pub(crate) fn keep_snapshot(view: &mut dyn FrameView, frame: &DynamicImage, report: &FrameReport) {
    if let Err(e) = view.snapshot(frame, report) {
        tracing::warn!("Failed to save snapshot: {}", e);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    AwaitingFrame,
    AwaitingOperatorInput,
    Accepted,
    Cancelled,
    StreamEnded,
    Complete,
}

impl CaptureState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CaptureState::Cancelled | CaptureState::StreamEnded | CaptureState::Complete)
    }
}

/// How a capture run finished and what it collected.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub samples: Vec<GrayImage>,
    pub ending: CaptureState,
}

/// Collects face samples one operator keypress at a time.
pub struct EnrollmentCapture<'a> {
    pipeline: &'a mut FacePipeline,
    required: usize,
    state: CaptureState,
    samples: Vec<GrayImage>,
}

impl<'a> EnrollmentCapture<'a> {
    pub fn new(pipeline: &'a mut FacePipeline, required: usize) -> Self {
        Self {
            pipeline,
            required,
            state: CaptureState::AwaitingFrame,
            samples: Vec::with_capacity(required),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Drive the camera until enough samples are accepted, the operator
    /// cancels, or the stream ends. The device is released on every path.
    pub fn run(
        mut self,
        camera: &mut dyn CameraDevice,
        view: &mut dyn FrameView,
        input: &mut dyn OperatorInput,
    ) -> Result<CaptureOutcome> {
        let mut session = CameraSession::start(camera)?;

        tell(view, &format!("Capturing {} samples. Press SPACE to capture, ESC to cancel.", self.required));

        while !self.state.is_terminal() {
            let Some(frame) = session.capture_frame() else {
                self.state = CaptureState::StreamEnded;
                break;
            };
            self.tick(&frame, view, input)?;
        }

        drop(session);

        if self.samples.len() < self.required {
            tracing::warn!(
                "Only {} out of {} samples were captured", self.samples.len(), self.required
            );
        }

        Ok(CaptureOutcome {
            samples: self.samples,
            ending: self.state,
        })
    }

    /// One pass of the loop for a frame that has already been read.
    pub fn tick(
        &mut self,
        frame: &DynamicImage,
        view: &mut dyn FrameView,
        input: &mut dyn OperatorInput,
    ) -> Result<CaptureState> {
        let faces = self.pipeline.detect(frame);

        let report = FrameReport {
            status: FrameStatus::Enrolling {
                face_found: !faces.is_empty(),
                captured: self.samples.len(),
                required: self.required,
            },
            faces: faces
                .iter()
                .map(|bbox| FaceAnnotation { bbox: *bbox, mark: FaceMark::Candidate })
                .collect(),
        };
        render(view, frame, &report);
        self.state = CaptureState::AwaitingOperatorInput;

        match input.poll()? {
            Some(OperatorKey::Accept) => match faces.first() {
                Some(first) => match self.pipeline.extract_sample(frame, first) {
                    Some(sample) => {
                        self.samples.push(sample);
                        self.state = CaptureState::Accepted;
                        tell(view, &format!("Sample {} captured successfully", self.samples.len()));
                    }
                    None => {
                        tracing::warn!("Error capturing face sample: region could not be extracted");
                    }
                },
                None => {
                    tell(view, "No face detected. Please position your face in the camera view and try again.");
                }
            },
            Some(OperatorKey::Cancel) | Some(OperatorKey::Quit) => {
                tell(view, "Enrollment cancelled by user");
                self.state = CaptureState::Cancelled;
                return Ok(self.state);
            }
            Some(OperatorKey::Snapshot) => keep_snapshot(view, frame, &report),
            None => {}
        }

        if self.samples.len() >= self.required {
            self.state = CaptureState::Complete;
        } else if self.state == CaptureState::AwaitingOperatorInput {
            self.state = CaptureState::AwaitingFrame;
        }

        Ok(self.state)
    }
}
