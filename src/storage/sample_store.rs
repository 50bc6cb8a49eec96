use crate::common::Result;
use image::{imageops::FilterType, GrayImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-user directories of captured face samples.
///
/// Layout: `<root>/user_<id>/sample_<n>.jpg`, numbered from 1.
pub struct SampleStore {
    root: PathBuf,
    sample_size: u32,
}

impl SampleStore {
    pub fn new(root: impl Into<PathBuf>, sample_size: u32) -> Result<Self> {
        let root = root.into();
        ensure_directory(&root)?;
        Ok(Self { root, sample_size })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user_id: u32) -> PathBuf {
        self.root.join(format!("user_{}", user_id))
    }

    /// Write every sample and return the paths written, in order.
    ///
    /// Stops at the first failure, so a result shorter than `images` means
    /// the save did not complete and the caller has to clean up.
    pub fn save_samples(&self, user_id: u32, images: &[GrayImage]) -> Vec<PathBuf> {
        let user_dir = self.user_dir(user_id);
        if let Err(e) = ensure_directory(&user_dir) {
            tracing::error!("Error creating {:?}: {}", user_dir, e);
            return Vec::new();
        }

        let mut saved = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let path = user_dir.join(format!("sample_{}.jpg", i + 1));
            if let Err(e) = image.save(&path) {
                tracing::error!("Error saving face sample {:?}: {}", path, e);
                break;
            }
            saved.push(path);
        }

        tracing::debug!(user_id, saved = saved.len(), "Saved face samples");
        saved
    }

    /// Remove the user's directory. Nothing to remove counts as success.
    pub fn delete_user_files(&self, user_id: u32) -> Result<()> {
        let user_dir = self.user_dir(user_id);
        match fs::remove_dir_all(&user_dir) {
            Ok(()) => {
                tracing::info!(user_id, "Deleted face samples in {:?}", user_dir);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load grayscale samples at the store's sample size, skipping files that
    /// are gone or do not decode.
    pub fn load_images(&self, paths: &[String]) -> Vec<GrayImage> {
        paths
            .iter()
            .filter_map(|path| match image::open(path) {
                Ok(img) => {
                    let gray = img.to_luma8();
                    if gray.dimensions() == (self.sample_size, self.sample_size) {
                        Some(gray)
                    } else {
                        Some(image::imageops::resize(&gray, self.sample_size, self.sample_size, FilterType::Triangle))
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping face sample {}: {}", path, e);
                    None
                }
            })
            .collect()
    }
}

/// Create `path` and any missing parents. Existing directories are fine.
pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}
