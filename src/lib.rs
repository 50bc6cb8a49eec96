pub mod camera;
pub mod cli;
pub mod common;
pub mod core;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use camera::{CameraDevice, CameraSession, V4lCamera};
pub use common::{Config, DevMode, FaceRecError, Result, ValidationError};
pub use core::{
    DetectionBox, EnrollmentRequest, EnrollmentWorkflow, FacePipeline, FrameReport, RecognitionMode,
    RecognitionResult, RecognitionWorkflow,
};
pub use storage::{SampleStore, UserRecord, UserStore};
