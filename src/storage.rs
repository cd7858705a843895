//! On-disk JSON artifacts: interview results and generated profiles.

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::StorageError;
use crate::interview::InterviewResult;

/// Writes one file per completed interview and one per generated profile.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    results_dir: PathBuf,
    profiles_dir: PathBuf,
}

impl ProfileStore {
    pub fn new(results_dir: impl Into<PathBuf>, profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            profiles_dir: profiles_dir.into(),
        }
    }

    pub fn result_path(&self, id: Uuid) -> PathBuf {
        self.results_dir.join(format!("interview_{id}.json"))
    }

    pub fn profile_path(&self, id: Uuid) -> PathBuf {
        self.profiles_dir.join(format!("profile_{id}.json"))
    }

    /// Persist a completed interview as pretty JSON.
    pub async fn save_result(&self, result: &InterviewResult) -> Result<PathBuf, StorageError> {
        let path = self.result_path(result.interview_id);
        let json = serde_json::to_string_pretty(result)?;
        write(&path, json.as_bytes()).await?;
        tracing::info!(interview_id = %result.interview_id, path = %path.display(), "Interview saved");
        Ok(path)
    }

    pub async fn load_result(&self, id: Uuid) -> Result<InterviewResult, StorageError> {
        let raw = read(&self.result_path(id), "interview", id).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Ids of all saved interviews, sorted.
    pub async fn list_results(&self) -> Result<Vec<Uuid>, StorageError> {
        let mut entries = match fs::read_dir(&self.results_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.results_dir.clone(),
                    source,
                });
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| StorageError::Io {
            path: self.results_dir.clone(),
            source,
        })? {
            let name = entry.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix("interview_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| Uuid::parse_str(n).ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Persist a serialized profile. Returns the written path.
    pub async fn save_profile(&self, id: Uuid, profile_json: &str) -> Result<PathBuf, StorageError> {
        let path = self.profile_path(id);
        write(&path, profile_json.as_bytes()).await?;
        tracing::info!(interview_id = %id, path = %path.display(), "Profile saved");
        Ok(path)
    }

    pub async fn load_profile(&self, id: Uuid) -> Result<String, StorageError> {
        read(&self.profile_path(id), "profile", id).await
    }
}

async fn write(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    fs::write(path, bytes).await.map_err(io_err)
}

async fn read(path: &Path, kind: &'static str, id: Uuid) -> Result<String, StorageError> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound { kind, id }),
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
