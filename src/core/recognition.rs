use crate::camera::{CameraDevice, CameraSession};
use crate::common::Result;
use crate::core::annotation::{FaceAnnotation, FaceMark, FrameReport, FrameStatus};
use crate::core::capture::{keep_snapshot, render, tell, FrameView, OperatorInput, OperatorKey};
use crate::core::pipeline::FacePipeline;
use crate::storage::{SampleStore, UserStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Nothing to match against; faces are only located.
    DetectionOnly,
    Recognition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionEnding {
    Quit,
    StreamEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSummary {
    pub frames: usize,
    pub recognized: usize,
    pub ending: RecognitionEnding,
}

/// Live identification against every enrolled user.
pub struct RecognitionWorkflow<'a> {
    pipeline: &'a mut FacePipeline,
    mode: RecognitionMode,
}

impl<'a> RecognitionWorkflow<'a> {
    pub fn new(pipeline: &'a mut FacePipeline) -> Self {
        Self { pipeline, mode: RecognitionMode::DetectionOnly }
    }

    pub fn mode(&self) -> RecognitionMode {
        self.mode
    }

    /// Train on every stored sample. Falls back to detection-only when there
    /// are no users or training does not succeed.
    pub fn prepare(&mut self, users: &UserStore, samples: &SampleStore) -> RecognitionMode {
        if users.is_empty() {
            tracing::info!("No users enrolled - running in detection-only mode");
            self.mode = RecognitionMode::DetectionOnly;
            return self.mode;
        }

        let mut images = Vec::new();
        let mut labels = Vec::new();
        for (id, record) in users.all() {
            let loaded = samples.load_images(&record.face_files);
            if loaded.len() < record.face_files.len() {
                tracing::warn!(
                    user_id = id,
                    "Only {} of {} samples could be loaded",
                    loaded.len(),
                    record.face_files.len()
                );
            }
            labels.extend(std::iter::repeat(id).take(loaded.len()));
            images.extend(loaded);
        }

        self.mode = if self.pipeline.train(&images, &labels) {
            tracing::info!(users = users.len(), samples = images.len(), "Recognizer ready");
            RecognitionMode::Recognition
        } else {
            tracing::warn!("Failed to train recognizer - running in detection-only mode");
            RecognitionMode::DetectionOnly
        };
        self.mode
    }

    /// Detect and classify every face in one frame.
    pub fn process_frame(&mut self, users: &UserStore, frame: &image::DynamicImage) -> FrameReport {
        let detection_only = self.mode == RecognitionMode::DetectionOnly;
        let boxes = self.pipeline.detect(frame);
        if boxes.is_empty() {
            return FrameReport::no_face(detection_only);
        }

        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            if detection_only {
                let mark = if bbox.fits_within(frame.width(), frame.height()) {
                    FaceMark::DetectedNotEnrolled
                } else {
                    FaceMark::Error
                };
                faces.push(FaceAnnotation { bbox, mark });
                continue;
            }

            let Some(region) = self.pipeline.extract_sample(frame, &bbox) else {
                tracing::debug!("Skipping face at {:?}: region could not be extracted", bbox);
                continue;
            };

            let result = self.pipeline.predict(&region);

            // A record deleted after training must not come back as a match
            let matched = result
                .identity
                .filter(|_| self.pipeline.is_match(result.distance))
                .and_then(|id| users.get(id));

            let mark = match matched {
                Some(user) => FaceMark::Recognized {
                    user_id: user.id,
                    name: user.full_name(),
                    age: user.age,
                    distance: result.distance,
                },
                None => FaceMark::Unknown { distance: result.distance },
            };
            faces.push(FaceAnnotation { bbox, mark });
        }

        FrameReport { status: FrameStatus::Faces, faces }
    }

    /// Run until the operator quits or the camera stops delivering frames.
    pub fn run(
        &mut self,
        users: &UserStore,
        camera: &mut dyn CameraDevice,
        view: &mut dyn FrameView,
        input: &mut dyn OperatorInput,
    ) -> Result<RecognitionSummary> {
        let mut session = CameraSession::start(camera)?;
        let mut summary = RecognitionSummary {
            frames: 0,
            recognized: 0,
            ending: RecognitionEnding::StreamEnded,
        };

        tell(view, "Recognition running. Press q or ESC to stop, s to save a snapshot.");

        while let Some(frame) = session.capture_frame() {
            let report = self.process_frame(users, &frame);
            render(view, &frame, &report);

            summary.frames += 1;
            summary.recognized += report
                .marks()
                .filter(|m| matches!(m, FaceMark::Recognized { .. }))
                .count();

            match input.poll()? {
                Some(OperatorKey::Quit) | Some(OperatorKey::Cancel) => {
                    summary.ending = RecognitionEnding::Quit;
                    break;
                }
                Some(OperatorKey::Snapshot) => keep_snapshot(view, &frame, &report),
                Some(OperatorKey::Accept) | None => {}
            }
        }

        tracing::info!(
            frames = summary.frames,
            recognized = summary.recognized,
            "Recognition stopped ({:?})",
            summary.ending
        );
        Ok(summary)
    }
}
