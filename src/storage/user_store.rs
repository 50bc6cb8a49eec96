use crate::common::{FaceRecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const STORAGE_VERSION: u32 = 1;

/// One enrolled identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub face_files: Vec<String>,
    pub enrolled_date: String,
}

impl UserRecord {
    /// New record stamped with the current local time.
    pub fn create(id: u32, first_name: &str, last_name: &str, age: u32, face_files: Vec<String>) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
            face_files,
            enrolled_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Serialize, Deserialize, Default)]
struct StoreData {
    version: u32,
    /// Largest id ever handed out, kept so deleted ids stay retired.
    highest_id: u32,
    users: BTreeMap<u32, UserRecord>,
}

/// All user records, held in memory and rewritten to a single file on every change.
pub struct UserStore {
    path: PathBuf,
    data: StoreData,
}

impl UserStore {
    /// Read the store at `path`. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => match bincode::deserialize::<StoreData>(&bytes) {
                Ok(mut data) => {
                    // Handle version migration if needed
                    if data.version < STORAGE_VERSION {
                        data.version = STORAGE_VERSION;
                    }
                    tracing::info!(users = data.users.len(), "Loaded user data from {:?}", path);
                    data
                }
                Err(e) => {
                    tracing::error!("Error loading user data from {:?}: {}. Starting empty.", path, e);
                    StoreData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No user data at {:?}, starting empty", path);
                StoreData::default()
            }
            Err(e) => {
                tracing::error!("Error reading user data from {:?}: {}. Starting empty.", path, e);
                StoreData::default()
            }
        };

        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite by id. If the file cannot be written the
    /// in-memory store is left as it was before the call.
    pub fn add(&mut self, record: UserRecord) -> Result<()> {
        let id = record.id;
        let previous_high = self.data.highest_id;
        let previous = self.data.users.insert(id, record);
        self.data.highest_id = self.data.highest_id.max(id);

        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.data.users.insert(id, old),
                None => self.data.users.remove(&id),
            };
            self.data.highest_id = previous_high;
            return Err(e);
        }

        tracing::info!(user_id = id, "User record saved");
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&UserRecord> {
        self.data.users.get(&id)
    }

    /// Owned copy; changing it never touches the store.
    pub fn all(&self) -> BTreeMap<u32, UserRecord> {
        self.data.users.clone()
    }

    pub fn delete(&mut self, id: u32) -> Result<UserRecord> {
        let removed = self.data.users.remove(&id).ok_or(FaceRecError::UserNotFound(id))?;

        if let Err(e) = self.save() {
            self.data.users.insert(id, removed);
            return Err(e);
        }

        tracing::info!(user_id = id, "User record deleted");
        Ok(removed)
    }

    /// `max(existing ids, highest id ever assigned) + 1`.
    pub fn next_id(&self) -> u32 {
        let max_existing = self.data.users.keys().next_back().copied().unwrap_or(0);
        max_existing.max(self.data.highest_id) + 1
    }

    pub fn len(&self) -> usize {
        self.data.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.users.is_empty()
    }

    /// Serialize everything, write beside the target and rename over it.
    fn save(&self) -> Result<()> {
        let data = StoreData {
            version: STORAGE_VERSION,
            highest_id: self.data.highest_id,
            users: self.data.users.clone(),
        };
        let encoded = bincode::serialize(&data)
            .map_err(|e| FaceRecError::Storage(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| FaceRecError::Storage(format!("Failed to create {:?}: {}", parent, e)))?;
            }
        }

        let tmp = self.path.with_extension("bin.tmp");
        fs::write(&tmp, encoded)
            .map_err(|e| FaceRecError::Storage(format!("Failed to write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            FaceRecError::Storage(format!("Failed to replace {:?}: {}", self.path, e))
        })?;

        Ok(())
    }
}
