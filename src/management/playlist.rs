use std::{collections::HashMap, path::PathBuf, time::Duration};

use chrono::Utc;
use futures::StreamExt;
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    config::StorageBackend,
    types::{SharedPlaylist, StoreStats},
    utils,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("playlist {0} not found or expired")]
    NotFound(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

struct MemoryEntry {
    playlist: SharedPlaylist,
    expires_at: Instant,
}

/// Stores completed conversions for shareable retrieval.
///
/// Entries live for the configured TTL. With the file backend each playlist is
/// a JSON document under `<data dir>/playlists/`; if a write fails the playlist
/// is kept in memory instead so the share link still works for this process.
pub struct PlaylistStore {
    backend: StorageBackend,
    ttl: Duration,
    dir: PathBuf,
    memory: Mutex<HashMap<String, MemoryEntry>>,
}

impl PlaylistStore {
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            backend: StorageBackend::Memory,
            ttl,
            dir: PathBuf::new(),
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn on_disk(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            backend: StorageBackend::File,
            ttl,
            dir: dir.into(),
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    pub async fn save(&self, playlist_id: &str, playlist: SharedPlaylist) {
        if self.backend == StorageBackend::File {
            match self.write_file(playlist_id, &playlist).await {
                Ok(()) => {
                    info!(playlist_id, "saved shared playlist to disk");
                    return;
                }
                Err(e) => {
                    warn!(playlist_id, error = %e, "failed to write playlist, keeping it in memory");
                }
            }
        }

        let mut memory = self.memory.lock().await;
        memory.insert(
            playlist_id.to_string(),
            MemoryEntry {
                playlist,
                expires_at: Instant::now() + self.ttl,
            },
        );
        info!(playlist_id, "saved shared playlist to memory");
    }

    pub async fn get(&self, playlist_id: &str) -> Result<SharedPlaylist, StorageError> {
        if !utils::is_valid_playlist_id(playlist_id) {
            return Err(StorageError::NotFound(playlist_id.to_string()));
        }

        if let Some(playlist) = self.get_memory(playlist_id).await {
            return Ok(playlist);
        }

        if self.backend == StorageBackend::File {
            match self.read_file(playlist_id).await {
                Ok(Some(playlist)) => return Ok(playlist),
                Ok(None) => {}
                Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        debug!(playlist_id, "shared playlist not found");
        Err(StorageError::NotFound(playlist_id.to_string()))
    }

    pub async fn stats(&self) -> StoreStats {
        let now = Instant::now();
        let mut keys = self
            .memory
            .lock()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count();

        if self.backend == StorageBackend::File {
            keys += self.scan_files(false).await.0;
        }

        let backend = match self.backend {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
        };
        StoreStats {
            backend: backend.to_string(),
            keys,
        }
    }

    /// Drops expired playlists from memory and, with the file backend, from
    /// disk. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = {
            let mut memory = self.memory.lock().await;
            let before = memory.len();
            memory.retain(|_, entry| entry.expires_at > now);
            before - memory.len()
        };

        if self.backend == StorageBackend::File {
            removed += self.scan_files(true).await.1;
        }
        removed
    }

    async fn get_memory(&self, playlist_id: &str) -> Option<SharedPlaylist> {
        let mut memory = self.memory.lock().await;
        match memory.get(playlist_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.playlist.clone()),
            Some(_) => {
                memory.remove(playlist_id);
                None
            }
            None => None,
        }
    }

    async fn write_file(
        &self,
        playlist_id: &str,
        playlist: &SharedPlaylist,
    ) -> Result<(), StorageError> {
        async_fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(playlist)?;
        async_fs::write(self.file_path(playlist_id), json).await?;
        Ok(())
    }

    async fn read_file(&self, playlist_id: &str) -> Result<Option<SharedPlaylist>, StorageError> {
        let path = self.file_path(playlist_id);
        let content = async_fs::read_to_string(&path).await?;
        let playlist: SharedPlaylist = serde_json::from_str(&content)?;

        if self.is_expired(&playlist) {
            // expired on disk; drop it so the directory does not grow forever
            let _ = async_fs::remove_file(&path).await;
            return Ok(None);
        }
        Ok(Some(playlist))
    }

    /// Walks the playlist directory and returns `(live, expired)` counts.
    /// Unreadable files count as neither.
    async fn scan_files(&self, remove_expired: bool) -> (usize, usize) {
        let Ok(mut entries) = async_fs::read_dir(&self.dir).await else {
            return (0, 0);
        };

        let (mut live, mut expired) = (0, 0);
        while let Some(Ok(entry)) = entries.next().await {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let Ok(content) = async_fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(playlist) = serde_json::from_str::<SharedPlaylist>(&content) else {
                continue;
            };

            if !self.is_expired(&playlist) {
                live += 1;
                continue;
            }
            expired += 1;
            if remove_expired {
                if let Err(e) = async_fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "failed to remove expired playlist");
                }
            }
        }
        (live, expired)
    }

    fn is_expired(&self, playlist: &SharedPlaylist) -> bool {
        let age = Utc::now().signed_duration_since(playlist.created_at);
        age.to_std().map(|age| age >= self.ttl).unwrap_or(false)
    }

    fn file_path(&self, playlist_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", playlist_id))
    }
}
