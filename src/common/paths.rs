use crate::common::error::{FaceRecError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const STORE_FILE_NAME: &str = "face_data.bin";
pub const SAMPLES_DIR_NAME: &str = "faces";
pub const CAPTURES_DIR_NAME: &str = "captures";

pub fn system_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "facekeeper", "FaceKeeper")
        .ok_or_else(|| FaceRecError::Storage("Failed to get project dirs".into()))?;
    Ok(dirs.data_dir().to_path_buf())
}
