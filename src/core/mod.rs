pub mod annotation;
pub mod capture;
pub mod classifier;
pub mod detector;
pub mod enrollment;
pub mod pipeline;
pub mod recognition;
pub mod types;
pub mod validation;

pub use annotation::{draw_report, FaceAnnotation, FaceMark, FrameReport, FrameStatus};
pub use capture::{CaptureOutcome, CaptureState, EnrollmentCapture, FrameView, OperatorInput, OperatorKey};
pub use classifier::{FaceClassifier, LbphClassifier};
pub use detector::{FaceDetector, RustfaceDetector};
pub use enrollment::{EnrollmentRequest, EnrollmentWorkflow};
pub use pipeline::FacePipeline;
pub use recognition::{RecognitionEnding, RecognitionMode, RecognitionSummary, RecognitionWorkflow};
pub use types::{DetectionBox, RecognitionResult};
pub use validation::{validate_enrollment, ValidatedInput};
