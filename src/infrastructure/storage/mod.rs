use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File extension of every audio artifact the pipeline writes.
pub const AUDIO_EXTENSION: &str = "mp3";

/// On-disk layout for uploads, per-chunk artifacts, the synthesis cache,
/// assembled audio and text sidecars, all under one root directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn texts_dir(&self) -> PathBuf {
        self.root.join("texts")
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join("cache.db")
    }

    /// Create every directory the pipeline writes into.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.temp_dir(),
            self.chunks_dir(),
            self.cache_dir(),
            self.audio_dir(),
            self.texts_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    pub fn upload_path(&self, task_id: Uuid, extension: &str) -> PathBuf {
        self.temp_dir().join(format!("{}.{}", task_id, extension))
    }

    /// Per-chunk artifact. The zero-padded index keeps a directory listing
    /// in chunk order.
    pub fn chunk_path(&self, task_id: Uuid, index: usize) -> PathBuf {
        self.chunks_dir()
            .join(format!("{}_{:05}.{}", task_id, index, AUDIO_EXTENSION))
    }

    /// Prefix shared by every chunk artifact of a task.
    pub fn chunk_prefix(task_id: Uuid) -> String {
        format!("{}_", task_id)
    }

    pub fn cache_artifact_path(&self, hash: &str) -> PathBuf {
        self.cache_dir().join(format!("{}.{}", hash, AUDIO_EXTENSION))
    }

    pub fn output_file_name(task_id: Uuid) -> String {
        format!("{}.{}", task_id, AUDIO_EXTENSION)
    }

    pub fn output_path(&self, task_id: Uuid) -> PathBuf {
        self.audio_dir().join(Self::output_file_name(task_id))
    }

    pub fn text_path(&self, task_id: Uuid) -> PathBuf {
        self.texts_dir().join(format!("{}.txt", task_id))
    }

    /// Best-effort removal of every per-chunk artifact of a task.
    pub async fn remove_chunks(&self, task_id: Uuid) {
        let prefix = Self::chunk_prefix(task_id);
        let mut entries = match tokio::fs::read_dir(self.chunks_dir()).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Failed to list chunk artifacts");
                return;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if entry.file_name().to_string_lossy().starts_with(&prefix) {
                        remove_file_best_effort(&entry.path()).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(task_id = %task_id, error = %e, "Failed to list chunk artifacts");
                    break;
                }
            }
        }
    }
}

/// Remove a file, logging instead of failing. A file that is already gone
/// counts as removed.
pub async fn remove_file_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}
