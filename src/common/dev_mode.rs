use std::path::PathBuf;
use std::fs;
use crate::common::config::Config;
use crate::common::error::Result;
use crate::common::paths;

/// Resolves where records, samples and snapshots live.
///
/// Dev mode keeps everything under `./dev_data` so experiments never touch
/// the real data directory.
#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool, config: &Config) -> Result<Self> {
        let base_dir = if enabled {
            PathBuf::from("./dev_data")
        } else if let Some(dir) = &config.storage.data_dir {
            dir.clone()
        } else {
            paths::system_data_dir()?
        };
        Self::with_base_dir(enabled, base_dir)
    }

    pub fn with_base_dir(enabled: bool, base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        fs::create_dir_all(base_dir.join(paths::SAMPLES_DIR_NAME))?;
        fs::create_dir_all(base_dir.join(paths::CAPTURES_DIR_NAME))?;

        if enabled {
            println!("📁 Development mode enabled - data will be saved to: {}",
                     base_dir.display());
        }
        tracing::debug!("Data directory: {:?}", base_dir);

        Ok(Self { enabled, base_dir })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn store_file(&self) -> PathBuf {
        self.base_dir.join(paths::STORE_FILE_NAME)
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.base_dir.join(paths::SAMPLES_DIR_NAME)
    }

    pub fn captures_dir(&self) -> PathBuf {
        self.base_dir.join(paths::CAPTURES_DIR_NAME)
    }

    pub fn get_capture_path(&self, prefix: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.captures_dir().join(format!("{}_{}.jpg", prefix, timestamp))
    }
}
