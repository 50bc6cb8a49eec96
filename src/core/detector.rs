use crate::common::{Config, FaceRecError, Result};
use crate::core::types::DetectionBox;
use image::GrayImage;
use rustface::ImageData;

/// Locates faces in a grayscale frame.
pub trait FaceDetector {
    fn detect(&mut self, frame: &GrayImage) -> Result<Vec<DetectionBox>>;
}

/// Multi-scale cascade detector backed by rustface's funnel-structured model.
pub struct RustfaceDetector {
    inner: Box<dyn rustface::Detector>,
}

impl RustfaceDetector {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = &config.detector.model_path;
        if !model_path.exists() {
            return Err(FaceRecError::Model(
                format!(
                    "Detector model not found at: {:?} (get seeta_fd_frontal_v1.0.bin from https://github.com/atomashpolskiy/rustface)",
                    model_path
                )
            ));
        }

        let path_str = model_path.to_str()
            .ok_or_else(|| FaceRecError::Model(format!("Model path is not UTF-8: {:?}", model_path)))?;

        let mut inner = rustface::create_detector(path_str)
            .map_err(|e| FaceRecError::Model(format!("Failed to load detector model: {}", e)))?;

        // Config::validate already keeps these inside the ranges rustface accepts
        let settings = &config.detector;
        inner.set_min_face_size(settings.min_face_size);
        inner.set_max_face_size(settings.max_face_size);
        inner.set_score_thresh(settings.score_threshold);
        inner.set_pyramid_scale_factor(settings.pyramid_scale_factor);
        inner.set_slide_window_step(settings.slide_window_step, settings.slide_window_step);

        tracing::info!("Face detector loaded from {:?}", model_path);
        Ok(Self { inner })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&mut self, frame: &GrayImage) -> Result<Vec<DetectionBox>> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut image = ImageData::new(frame.as_raw(), width, height);
        let faces = self.inner.detect(&mut image);

        // Boxes can spill past the frame edge; keep only the visible part
        let boxes = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                DetectionBox::clipped(bbox.x(), bbox.y(), bbox.width(), bbox.height(), width, height)
            })
            .collect();

        Ok(boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_names_download_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.detector.model_path = dir.path().join("seeta_fd_frontal_v1.0.bin");

        match RustfaceDetector::new(&config) {
            Err(FaceRecError::Model(msg)) => {
                assert!(msg.contains("not found"));
                assert!(msg.contains("github.com/atomashpolskiy/rustface"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("detector loaded without a model file"),
        }
    }
}
