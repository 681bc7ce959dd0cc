//! Session-keyed checkpoint store.
//!
//! A checkpoint captures the full workflow state for a session id so a later
//! run can resume it. The engine persists after each applied transition when
//! a store is configured; no store means every run starts fresh.
//!
//! Two backends ship: [`MemoryCheckpointer`] for tests and short-lived runs,
//! and [`FileCheckpointer`] storing one JSON file per session with optional
//! zstd compression, written atomically via temp-file + rename.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Errors from checkpoint persistence.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io error: {0}")]
    Io(String),

    #[error("checkpoint serialization error: {0}")]
    Serialization(String),
}

/// Envelope persisted per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    pub session_id: String,
    pub state: S,
    pub saved_at: DateTime<Utc>,
}

impl<S> Checkpoint<S> {
    pub fn new(session_id: impl Into<String>, state: S) -> Self {
        Self {
            session_id: session_id.into(),
            state,
            saved_at: Utc::now(),
        }
    }
}

/// Durable storage for per-session workflow state.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: Send + Sync,
{
    /// Persist the state for a session, replacing any prior snapshot.
    async fn save(&self, session_id: &str, state: &S) -> Result<(), CheckpointError>;

    /// Load the saved state for a session, `None` when the session is unknown.
    async fn load(&self, session_id: &str) -> Result<Option<S>, CheckpointError>;

    /// Drop a session's snapshot.
    async fn delete(&self, session_id: &str) -> Result<(), CheckpointError>;
}

/// In-memory checkpointer. Not durable; for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer<S> {
    sessions: tokio::sync::RwLock<HashMap<String, S>>,
}

impl<S> MemoryCheckpointer<S> {
    pub fn new() -> Self {
        Self {
            sessions: tokio::sync::RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemoryCheckpointer<S>
where
    S: Clone + Send + Sync,
{
    async fn save(&self, session_id: &str, state: &S) -> Result<(), CheckpointError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<S>, CheckpointError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<(), CheckpointError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}

/// File-based checkpointer: one `{session_id}.json[.zst]` per session.
#[derive(Debug)]
pub struct FileCheckpointer {
    base_path: PathBuf,
    compression: bool,
}

impl FileCheckpointer {
    pub fn new(base_path: impl Into<PathBuf>, compression: bool) -> Self {
        Self {
            base_path: base_path.into(),
            compression,
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        let filename = if self.compression {
            format!("{session_id}.json.zst")
        } else {
            format!("{session_id}.json")
        };
        self.base_path.join(filename)
    }

    fn temp_path(&self, session_id: &str) -> PathBuf {
        self.base_path.join(format!("{session_id}.tmp"))
    }

    async fn ensure_dir(&self) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| CheckpointError::Io(format!("failed to create directory: {e}")))
    }

    fn compress(data: &[u8]) -> Result<Vec<u8>, CheckpointError> {
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), 3)
            .map_err(|e| CheckpointError::Io(format!("compression init failed: {e}")))?;
        encoder
            .write_all(data)
            .map_err(|e| CheckpointError::Io(format!("compression write failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| CheckpointError::Io(format!("compression finish failed: {e}")))
    }

    fn decompress(data: &[u8]) -> Result<Vec<u8>, CheckpointError> {
        zstd::stream::decode_all(data)
            .map_err(|e| CheckpointError::Io(format!("decompression failed: {e}")))
    }
}

#[async_trait]
impl<S> Checkpointer<S> for FileCheckpointer
where
    S: Clone + Send + Sync + Serialize + for<'de> Deserialize<'de>,
{
    async fn save(&self, session_id: &str, state: &S) -> Result<(), CheckpointError> {
        self.ensure_dir().await?;

        let checkpoint = Checkpoint::new(session_id, state.clone());
        let json = serde_json::to_vec_pretty(&checkpoint)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        let data = if self.compression {
            Self::compress(&json)?
        } else {
            json
        };

        // Temp file + rename keeps a crash from corrupting the snapshot.
        let temp_path = self.temp_path(session_id);
        let final_path = self.session_path(session_id);

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| CheckpointError::Io(format!("failed to create temp file: {e}")))?;
        file.write_all(&data)
            .await
            .map_err(|e| CheckpointError::Io(format!("failed to write data: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| CheckpointError::Io(format!("failed to sync file: {e}")))?;

        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| CheckpointError::Io(format!("failed to rename file: {e}")))
    }

    async fn load(&self, session_id: &str) -> Result<Option<S>, CheckpointError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| CheckpointError::Io(format!("failed to read checkpoint: {e}")))?;

        let json = if self.compression {
            Self::decompress(&data)?
        } else {
            data
        };

        let checkpoint: Checkpoint<S> = serde_json::from_slice(&json)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        Ok(Some(checkpoint.state))
    }

    async fn delete(&self, session_id: &str) -> Result<(), CheckpointError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path)
            .await
            .map_err(|e| CheckpointError::Io(format!("failed to delete checkpoint: {e}")))
    }
}
