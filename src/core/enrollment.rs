use crate::camera::CameraDevice;
use crate::common::config::{EnrollmentConfig, HARD_MIN_SAMPLES};
use crate::common::{FaceRecError, Result};
use crate::core::capture::{EnrollmentCapture, FrameView, OperatorInput};
use crate::core::pipeline::FacePipeline;
use crate::core::validation::validate_enrollment;
use crate::storage::{SampleStore, UserRecord, UserStore};

/// What the operator typed in before capture starts.
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
}

/// Validate, capture, persist. Nothing is left on disk unless the whole
/// sequence succeeds.
pub struct EnrollmentWorkflow<'a> {
    pipeline: &'a mut FacePipeline,
    users: &'a mut UserStore,
    samples: &'a SampleStore,
    num_samples: usize,
    min_samples: usize,
}

impl<'a> EnrollmentWorkflow<'a> {
    pub fn new(
        pipeline: &'a mut FacePipeline,
        users: &'a mut UserStore,
        samples: &'a SampleStore,
        settings: &EnrollmentConfig,
    ) -> Self {
        let min_samples = settings.min_samples.max(HARD_MIN_SAMPLES);
        Self {
            pipeline,
            users,
            samples,
            num_samples: settings.num_samples.max(min_samples),
            min_samples,
        }
    }

    pub fn enroll(
        &mut self,
        request: &EnrollmentRequest,
        camera: &mut dyn CameraDevice,
        view: &mut dyn FrameView,
        input: &mut dyn OperatorInput,
    ) -> Result<UserRecord> {
        let valid = validate_enrollment(&request.first_name, &request.last_name, request.age)?;

        tracing::info!("Starting enrollment for {} {}", valid.first_name, valid.last_name);

        let outcome = EnrollmentCapture::new(&mut *self.pipeline, self.num_samples).run(camera, view, input)?;

        if outcome.samples.len() < self.min_samples {
            return Err(FaceRecError::InsufficientSamples {
                captured: outcome.samples.len(),
                required: self.min_samples,
            });
        }

        let user_id = self.users.next_id();
        let saved = self.samples.save_samples(user_id, &outcome.samples);

        if saved.len() < outcome.samples.len() {
            self.discard_samples(user_id);
            return Err(FaceRecError::Storage(format!(
                "Saved only {} of {} face samples",
                saved.len(),
                outcome.samples.len()
            )));
        }

        let face_files = saved.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        let record = UserRecord::create(user_id, &valid.first_name, &valid.last_name, valid.age, face_files);

        if let Err(e) = self.users.add(record.clone()) {
            self.discard_samples(user_id);
            return Err(e);
        }

        tracing::info!(user_id, samples = record.face_files.len(), "Enrolled {}", record.full_name());
        Ok(record)
    }

    fn discard_samples(&self, user_id: u32) {
        if let Err(e) = self.samples.delete_user_files(user_id) {
            tracing::warn!("Could not remove samples for user {}: {}", user_id, e);
        }
    }
}
