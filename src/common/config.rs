use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::common::error::{FaceRecError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "configs/facekeeper.toml";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_ms: u64,
    /// Upper bound on a single frame read; a stalled device ends the session.
    #[serde(default = "default_frame_timeout")]
    pub frame_timeout_ms: u64,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_warmup_frames() -> u32 { 5 }
fn default_warmup_delay() -> u64 { 50 }
fn default_frame_timeout() -> u64 { 5000 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: default_width(),
            height: default_height(),
            warmup_frames: default_warmup_frames(),
            warmup_delay_ms: default_warmup_delay(),
            frame_timeout_ms: default_frame_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_min_face")]
    pub min_face_size: u32,
    #[serde(default = "default_max_face")]
    pub max_face_size: u32,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    #[serde(default = "default_pyramid_scale")]
    pub pyramid_scale_factor: f32,
    #[serde(default = "default_window_step")]
    pub slide_window_step: u32,
}

fn default_model_path() -> PathBuf { PathBuf::from("models/seeta_fd_frontal_v1.0.bin") }
fn default_min_face() -> u32 { 80 }
fn default_max_face() -> u32 { 300 }
fn default_score_threshold() -> f64 { 2.0 }
fn default_pyramid_scale() -> f32 { 0.8 }
fn default_window_step() -> u32 { 4 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            min_face_size: default_min_face(),
            max_face_size: default_max_face(),
            score_threshold: default_score_threshold(),
            pyramid_scale_factor: default_pyramid_scale(),
            slide_window_step: default_window_step(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognizerConfig {
    /// Distance below which a prediction counts as a match (lower is better).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Side length of the square grayscale samples.
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,
    #[serde(default = "default_grid")]
    pub grid_x: u32,
    #[serde(default = "default_grid")]
    pub grid_y: u32,
}

pub const MIN_THRESHOLD: f64 = 10.0;
pub const MAX_THRESHOLD: f64 = 200.0;

fn default_threshold() -> f64 { 100.0 }
fn default_sample_size() -> u32 { 200 }
fn default_grid() -> u32 { 8 }

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            sample_size: default_sample_size(),
            grid_x: default_grid(),
            grid_y: default_grid(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnrollmentConfig {
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

/// Enrollment never accepts fewer samples than this, whatever the config says.
pub const HARD_MIN_SAMPLES: usize = 3;

fn default_num_samples() -> usize { 5 }
fn default_min_samples() -> usize { HARD_MIN_SAMPLES }

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            num_samples: default_num_samples(),
            min_samples: default_min_samples(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Overrides the platform data directory when set.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Loads `configs/facekeeper.toml` when present, otherwise built-in defaults.
    pub fn load() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceRecError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FaceRecError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate camera dimensions
        if self.camera.width == 0 || self.camera.width > 4096 {
            return Err(FaceRecError::Config(format!(
                "Camera width must be between 1 and 4096, got {}", self.camera.width
            )));
        }
        if self.camera.height == 0 || self.camera.height > 4096 {
            return Err(FaceRecError::Config(format!(
                "Camera height must be between 1 and 4096, got {}", self.camera.height
            )));
        }

        // rustface panics below these limits, so reject them up front
        if self.detector.min_face_size < 20 {
            return Err(FaceRecError::Config(format!(
                "Detector min_face_size must be at least 20, got {}",
                self.detector.min_face_size
            )));
        }
        if self.detector.max_face_size < self.detector.min_face_size {
            return Err(FaceRecError::Config(format!(
                "Detector max_face_size ({}) is smaller than min_face_size ({})",
                self.detector.max_face_size, self.detector.min_face_size
            )));
        }
        if !(self.detector.pyramid_scale_factor > 0.01 && self.detector.pyramid_scale_factor < 0.99) {
            return Err(FaceRecError::Config(format!(
                "Pyramid scale factor must be within (0.01, 0.99), got {}",
                self.detector.pyramid_scale_factor
            )));
        }
        if self.detector.score_threshold <= 0.0 {
            return Err(FaceRecError::Config(format!(
                "Detector score threshold must be positive, got {}",
                self.detector.score_threshold
            )));
        }
        if self.detector.slide_window_step == 0 {
            return Err(FaceRecError::Config("Slide window step must be positive".into()));
        }

        // Validate recognizer
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&self.recognizer.threshold) {
            return Err(FaceRecError::Config(format!(
                "Recognition threshold must be between {} and {}, got {}",
                MIN_THRESHOLD, MAX_THRESHOLD, self.recognizer.threshold
            )));
        }
        if self.recognizer.sample_size == 0 || self.recognizer.sample_size > 1024 {
            return Err(FaceRecError::Config(format!(
                "Sample size must be between 1 and 1024, got {}",
                self.recognizer.sample_size
            )));
        }
        for (axis, cells) in [("grid_x", self.recognizer.grid_x), ("grid_y", self.recognizer.grid_y)] {
            if cells == 0 || cells > 16 {
                return Err(FaceRecError::Config(format!(
                    "Recognizer {} must be between 1 and 16, got {}", axis, cells
                )));
            }
        }

        // Validate enrollment counts
        if self.enrollment.min_samples < HARD_MIN_SAMPLES {
            return Err(FaceRecError::Config(format!(
                "Enrollment min_samples must be at least {}, got {}",
                HARD_MIN_SAMPLES, self.enrollment.min_samples
            )));
        }
        if self.enrollment.num_samples < self.enrollment.min_samples {
            return Err(FaceRecError::Config(format!(
                "Enrollment num_samples ({}) is below min_samples ({})",
                self.enrollment.num_samples, self.enrollment.min_samples
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recognizer.threshold, 100.0);
        assert_eq!(config.recognizer.sample_size, 200);
        assert_eq!(config.enrollment.num_samples, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::from_toml("[camera]\ndevice_index = 2\n").unwrap();
        assert_eq!(config.camera.device_index, 2);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.detector.min_face_size, 80);
    }

    #[test]
    fn test_threshold_outside_range_rejected() {
        let err = Config::from_toml("[recognizer]\nthreshold = 250.0\n").unwrap_err();
        assert!(matches!(err, FaceRecError::Config(_)));
    }

    #[test]
    fn test_min_samples_below_hard_floor_rejected() {
        let err = Config::from_toml("[enrollment]\nnum_samples = 2\nmin_samples = 2\n").unwrap_err();
        assert!(matches!(err, FaceRecError::Config(_)));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = include_str!("../../configs/facekeeper.toml");
        let config = Config::from_toml(shipped).unwrap();
        let defaults = Config::default();
        assert_eq!(config.recognizer.threshold, defaults.recognizer.threshold);
        assert_eq!(config.detector.model_path, defaults.detector.model_path);
        assert_eq!(config.camera.frame_timeout_ms, defaults.camera.frame_timeout_ms);
        assert!(config.storage.data_dir.is_none());
        // The model is not shipped; the config has to say where it comes from
        assert!(shipped.contains("github.com/atomashpolskiy/rustface"));
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from_path(&dir.path().join("nope.toml"));
        assert!(result.is_err());
    }
}
