//! Local persistence of the current session
//!
//! The session is kept in memory and, when a path is configured, mirrored to
//! a JSON file so it survives process restarts. Writes go through a temp file
//! and a rename so a crash never leaves a half-written session behind.

use std::path::PathBuf;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, TransportError};
use crate::models::Session;

/// Current on-disk format version
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    version: u32,
    session: Option<Session>,
}

/// Holder of the current session, optionally backed by a file
#[derive(Debug, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Session>>,
    loaded: RwLock<bool>,
}

impl SessionStore {
    /// Memory-only store
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store mirrored to `path`
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Current session, reading the file on first access
    pub async fn load(&self) -> Result<Option<Session>> {
        if *self.loaded.read() {
            return Ok(self.current.read().clone());
        }

        let restored = match &self.path {
            Some(path) => Self::read_file(path).await?,
            None => None,
        };

        *self.current.write() = restored.clone();
        *self.loaded.write() = true;
        Ok(restored)
    }

    /// Current session without touching the file
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Replace the current session
    ///
    /// The file is written first; on failure the in-memory session is left
    /// as it was.
    pub async fn save(&self, session: Option<Session>) -> Result<()> {
        if let Some(path) = &self.path {
            let stored = StoredSession {
                version: FORMAT_VERSION,
                session: session.clone(),
            };
            let contents = serde_json::to_string_pretty(&stored)
                .map_err(|e| TransportError::Persistence(e.to_string()))?;
            Self::write_atomic(path, &contents).await?;
        }

        *self.current.write() = session;
        *self.loaded.write() = true;
        Ok(())
    }

    /// Forget the current session
    pub async fn clear(&self) -> Result<()> {
        self.save(None).await
    }

    async fn read_file(path: &PathBuf) -> Result<Option<Session>> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TransportError::Persistence(e.to_string())),
        };

        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(stored) if stored.version == FORMAT_VERSION => Ok(stored.session),
            Ok(stored) => {
                tracing::warn!(
                    found = stored.version,
                    expected = FORMAT_VERSION,
                    "Discarding session file with unknown version"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Discarding corrupt session file");
                Ok(None)
            }
        }
    }

    /// Write atomically using temp file + rename
    async fn write_atomic(path: &PathBuf, contents: &str) -> Result<()> {
        let to_persistence = |e: std::io::Error| TransportError::Persistence(e.to_string());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(to_persistence)?;
            }
        }

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(to_persistence)?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(to_persistence)?;
        file.sync_all().await.map_err(to_persistence)?;
        drop(file);

        fs::rename(&temp_path, path).await.map_err(to_persistence)?;
        Ok(())
    }
}
