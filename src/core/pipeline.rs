use crate::common::Config;
use crate::core::classifier::FaceClassifier;
use crate::core::detector::FaceDetector;
use crate::core::types::{DetectionBox, RecognitionResult};
use image::{imageops::FilterType, DynamicImage, GrayImage};
use imageproc::contrast::equalize_histogram;

/// Training needs at least this many usable (image, label) pairs.
pub const MIN_TRAINING_SAMPLES: usize = 3;
pub const DEFAULT_THRESHOLD: f64 = 100.0;

/// Policy layer over the detector and classifier.
///
/// Every operation degrades to an empty/absent/sentinel result instead of
/// returning an error, so callers can stay at the per-frame and per-face level.
pub struct FacePipeline {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn FaceClassifier>,
    threshold: f64,
    sample_size: u32,
    trained: bool,
}

impl FacePipeline {
    pub fn new(detector: Box<dyn FaceDetector>, classifier: Box<dyn FaceClassifier>, sample_size: u32) -> Self {
        Self {
            detector,
            classifier,
            threshold: DEFAULT_THRESHOLD,
            sample_size,
            trained: false,
        }
    }

    /// Production pipeline: rustface detector plus LBPH classifier.
    pub fn from_config(config: &Config) -> crate::common::Result<Self> {
        use crate::core::classifier::LbphClassifier;
        use crate::core::detector::RustfaceDetector;

        let detector = RustfaceDetector::new(config)?;
        let classifier = LbphClassifier::new(config.recognizer.grid_x, config.recognizer.grid_y);
        let mut pipeline = Self::new(Box::new(detector), Box::new(classifier), config.recognizer.sample_size);
        pipeline.set_threshold(config.recognizer.threshold);
        Ok(pipeline)
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The [10, 200] range is enforced by whoever collects the value, not here.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
        tracing::info!("Recognition threshold set to {}", threshold);
    }

    pub fn detect(&mut self, frame: &DynamicImage) -> Vec<DetectionBox> {
        if frame.width() == 0 || frame.height() == 0 {
            return Vec::new();
        }

        let gray = frame.to_luma8();
        match self.detector.detect(&gray) {
            Ok(boxes) => boxes,
            Err(e) => {
                tracing::warn!("Error detecting faces: {}", e);
                Vec::new()
            }
        }
    }

    /// Crop `bbox`, equalize contrast and resize to `target_size` x `target_size`.
    pub fn extract_region(&self, frame: &DynamicImage, bbox: &DetectionBox, target_size: u32) -> Option<GrayImage> {
        if frame.width() == 0 || frame.height() == 0 || target_size == 0 {
            return None;
        }
        if !bbox.fits_within(frame.width(), frame.height()) {
            tracing::debug!("Face box {:?} exceeds frame {}x{}", bbox, frame.width(), frame.height());
            return None;
        }

        let region = frame.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height).to_luma8();
        if region.width() == 0 || region.height() == 0 {
            tracing::debug!("Empty face region extracted");
            return None;
        }

        let equalized = equalize_histogram(&region);
        Some(image::imageops::resize(&equalized, target_size, target_size, FilterType::Triangle))
    }

    /// Extract at the pipeline's configured sample size.
    pub fn extract_sample(&self, frame: &DynamicImage, bbox: &DetectionBox) -> Option<GrayImage> {
        self.extract_region(frame, bbox, self.sample_size)
    }

    /// Train from labeled samples. Empty images are dropped with their labels;
    /// fewer than three survivors leaves the current model untouched.
    pub fn train(&mut self, images: &[GrayImage], labels: &[u32]) -> bool {
        if images.len() != labels.len() {
            tracing::warn!("Number of face images ({}) and labels ({}) must match", images.len(), labels.len());
            return false;
        }

        let (valid_images, valid_labels): (Vec<GrayImage>, Vec<u32>) = images
            .iter()
            .zip(labels)
            .filter(|(img, _)| img.width() > 0 && img.height() > 0)
            .map(|(img, &label)| (equalize_histogram(img), label))
            .unzip();

        if valid_images.len() < MIN_TRAINING_SAMPLES {
            tracing::warn!(
                "Not enough valid images to train ({} found, need at least {})",
                valid_images.len(), MIN_TRAINING_SAMPLES
            );
            return false;
        }

        match self.classifier.train(&valid_images, &valid_labels) {
            Ok(()) => {
                self.trained = true;
                tracing::info!("Recognizer trained successfully with {} samples", valid_images.len());
                true
            }
            Err(e) => {
                tracing::warn!("Error training recognizer: {}", e);
                false
            }
        }
    }

    pub fn predict(&self, image: &GrayImage) -> RecognitionResult {
        if !self.trained || image.width() == 0 || image.height() == 0 {
            return RecognitionResult::unmatched();
        }

        let equalized = equalize_histogram(image);
        match self.classifier.predict(&equalized) {
            Ok((label, distance)) => {
                tracing::debug!(identity = label, distance, "Recognition result");
                RecognitionResult { identity: Some(label), distance }
            }
            Err(e) => {
                tracing::warn!("Error recognizing face: {}", e);
                RecognitionResult::unmatched()
            }
        }
    }

    /// Lower distances are better, so a match is anything strictly below the threshold.
    pub fn is_match(&self, distance: f64) -> bool {
        distance < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_pipeline, gradient_face, solid_frame, stripe_face, FixedDetector, TableClassifier};

    #[test]
    fn test_detect_empty_frame_returns_nothing() {
        let mut pipeline = fake_pipeline(vec![DetectionBox::new(0, 0, 10, 10)], TableClassifier::default());
        let empty = DynamicImage::new_luma8(0, 0);
        assert!(pipeline.detect(&empty).is_empty());
    }

    #[test]
    fn test_detect_passes_boxes_through() {
        let boxes = vec![DetectionBox::new(5, 5, 20, 20)];
        let mut pipeline = fake_pipeline(boxes.clone(), TableClassifier::default());
        assert_eq!(pipeline.detect(&solid_frame(64, 64, 100)), boxes);
    }

    #[test]
    fn test_detector_error_becomes_empty() {
        let mut pipeline = FacePipeline::new(
            Box::new(FixedDetector::failing()),
            Box::new(TableClassifier::default()),
            200,
        );
        assert!(pipeline.detect(&solid_frame(32, 32, 0)).is_empty());
    }

    #[test]
    fn test_extract_region_resizes() {
        let pipeline = fake_pipeline(vec![], TableClassifier::default());
        let frame = DynamicImage::ImageLuma8(gradient_face(100));
        let region = pipeline.extract_region(&frame, &DetectionBox::new(10, 10, 50, 40), 200).unwrap();
        assert_eq!(region.dimensions(), (200, 200));
    }

    #[test]
    fn test_extract_region_rejects_bad_boxes() {
        let pipeline = fake_pipeline(vec![], TableClassifier::default());
        let frame = solid_frame(100, 100, 50);
        assert!(pipeline.extract_region(&frame, &DetectionBox::new(60, 60, 50, 50), 200).is_none());
        assert!(pipeline.extract_region(&frame, &DetectionBox::new(0, 0, 0, 10), 200).is_none());
        assert!(pipeline.extract_region(&DynamicImage::new_luma8(0, 0), &DetectionBox::new(0, 0, 1, 1), 200).is_none());
    }

    #[test]
    fn test_train_needs_three_valid_pairs() {
        let mut pipeline = fake_pipeline(vec![], TableClassifier::default());
        let two = vec![gradient_face(32), stripe_face(32, 2)];
        assert!(!pipeline.train(&two, &[1, 1]));
        assert!(!pipeline.is_trained());

        let three = vec![gradient_face(32), stripe_face(32, 2), stripe_face(32, 3)];
        assert!(pipeline.train(&three, &[1, 1, 2]));
        assert!(pipeline.is_trained());
    }

    #[test]
    fn test_train_discards_empty_images() {
        let mut pipeline = fake_pipeline(vec![], TableClassifier::default());
        let images = vec![gradient_face(32), GrayImage::new(0, 0), stripe_face(32, 2), GrayImage::new(0, 0)];
        assert!(!pipeline.train(&images, &[1, 1, 1, 1]));
    }

    #[test]
    fn test_train_length_mismatch_fails() {
        let mut pipeline = fake_pipeline(vec![], TableClassifier::default());
        let images = vec![gradient_face(32), gradient_face(32), gradient_face(32)];
        assert!(!pipeline.train(&images, &[1, 1]));
    }

    #[test]
    fn test_failed_retrain_keeps_previous_model() {
        let mut pipeline = fake_pipeline(vec![], TableClassifier::always(4, 12.0));
        let three = vec![gradient_face(32), gradient_face(32), gradient_face(32)];
        assert!(pipeline.train(&three, &[4, 4, 4]));
        assert!(!pipeline.train(&three[..1], &[5]));
        assert!(pipeline.is_trained());
        assert_eq!(pipeline.predict(&gradient_face(32)).identity, Some(4));
    }

    #[test]
    fn test_predict_untrained_returns_sentinel() {
        let pipeline = fake_pipeline(vec![], TableClassifier::always(1, 5.0));
        assert_eq!(pipeline.predict(&gradient_face(32)), RecognitionResult::unmatched());
    }

    #[test]
    fn test_predict_empty_image_returns_sentinel() {
        let mut pipeline = fake_pipeline(vec![], TableClassifier::always(1, 5.0));
        let three = vec![gradient_face(32), gradient_face(32), gradient_face(32)];
        assert!(pipeline.train(&three, &[1, 1, 1]));
        assert_eq!(pipeline.predict(&GrayImage::new(0, 0)), RecognitionResult::unmatched());
    }

    #[test]
    fn test_is_match_threshold() {
        let mut pipeline = fake_pipeline(vec![], TableClassifier::default());
        assert_eq!(pipeline.threshold(), DEFAULT_THRESHOLD);
        assert!(pipeline.is_match(99.9));
        assert!(!pipeline.is_match(100.0));

        pipeline.set_threshold(50.0);
        assert!(pipeline.is_match(49.0));
        assert!(!pipeline.is_match(60.0));
    }

    #[test]
    fn test_is_match_monotonic() {
        let pipeline = fake_pipeline(vec![], TableClassifier::default());
        let scores = [0.0, 10.0, 55.5, 99.0, 99.99, 100.0, 150.0, 1000.0];
        for &s1 in &scores {
            for &s2 in &scores {
                if pipeline.is_match(s1) && s2 < s1 {
                    assert!(pipeline.is_match(s2));
                }
            }
        }
    }
}
