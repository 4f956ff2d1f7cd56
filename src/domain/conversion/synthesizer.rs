use super::cache::SynthesisCache;
use super::chunker::truncate_at_word;
use super::error::ConversionError;
use super::model::{scale_progress, PROGRESS_CHUNKED, PROGRESS_SYNTHESIZED};
use crate::domain::tts::LanguageCode;
use crate::infrastructure::repositories::{SpeechBackend, SpeechBackendError};
use crate::infrastructure::storage::{remove_file_best_effort, StorageLayout};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SynthesizerSettings {
    /// Concurrent backend requests across all tasks
    pub workers: usize,
    /// Chunks per batch; progress is reported after each batch
    pub batch_size: usize,
    pub similarity_threshold: f64,
    /// Longest text sent to the backend in one request
    pub max_request_chars: usize,
}

/// Where a chunk's audio came from
#[derive(Debug, Clone, Copy, PartialEq)]
enum ChunkSource {
    CacheHit,
    SimilarMatch { score: f64 },
    Synthesized,
}

/// Turns chunks into per-chunk audio artifacts using the synthesis cache,
/// its near-duplicate index and, when neither has the audio, the speech
/// backend.
pub struct ParallelSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    cache: Arc<SynthesisCache>,
    storage: StorageLayout,
    settings: SynthesizerSettings,
    workers: Arc<Semaphore>,
}

impl ParallelSynthesizer {
    pub fn new(
        backend: Arc<dyn SpeechBackend>,
        cache: Arc<SynthesisCache>,
        storage: StorageLayout,
        settings: SynthesizerSettings,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(settings.workers.max(1)));
        Self {
            backend,
            cache,
            storage,
            settings,
            workers,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Produce one artifact per chunk, in chunk order.
    ///
    /// Never fails: a chunk whose audio cannot be produced gets a zero-length
    /// placeholder at its position. `on_progress` receives values between
    /// 40 and 90 after every batch.
    pub async fn synthesize_all<F>(
        self: &Arc<Self>,
        chunks: &[String],
        task_id: Uuid,
        language: LanguageCode,
        on_progress: F,
    ) -> Vec<PathBuf>
    where
        F: Fn(u8) + Send + Sync,
    {
        let batch_size = self.settings.batch_size.max(1);
        let total_batches = chunks.len().div_ceil(batch_size);
        let mut slots: Vec<Option<PathBuf>> = vec![None; chunks.len()];

        for (batch_index, start) in (0..chunks.len()).step_by(batch_size).enumerate() {
            let end = (start + batch_size).min(chunks.len());
            self.run_batch(&chunks[start..end], start, task_id, language, &mut slots)
                .await;

            let progress = scale_progress(
                PROGRESS_CHUNKED,
                PROGRESS_SYNTHESIZED,
                batch_index + 1,
                total_batches,
            );
            tracing::debug!(
                task_id = %task_id,
                batch = batch_index + 1,
                total_batches = total_batches,
                progress = progress,
                "Synthesis batch finished"
            );
            on_progress(progress);
        }

        let mut artifacts = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(path) => artifacts.push(path),
                None => {
                    // Only reachable when a worker panicked
                    let path = self.storage.chunk_path(task_id, index);
                    write_placeholder(&path).await;
                    artifacts.push(path);
                }
            }
        }
        artifacts
    }

    /// Process one batch. Identical chunks inside the batch are synthesized
    /// once: the first occurrence runs, the rest copy its artifact.
    async fn run_batch(
        self: &Arc<Self>,
        batch: &[String],
        offset: usize,
        task_id: Uuid,
        language: LanguageCode,
        slots: &mut [Option<PathBuf>],
    ) {
        let mut leaders: HashMap<String, usize> = HashMap::new();
        let mut followers: Vec<(usize, usize)> = Vec::new();
        let mut jobs = JoinSet::new();

        for (position, text) in batch.iter().enumerate() {
            let index = offset + position;
            let hash = SynthesisCache::hash_text(text, language);

            if let Some(&leader) = leaders.get(&hash) {
                followers.push((index, leader));
                continue;
            }
            leaders.insert(hash.clone(), index);

            let this = Arc::clone(self);
            let text = text.clone();
            jobs.spawn(async move {
                let path = match this.workers.clone().acquire_owned().await {
                    Ok(_permit) => this.process_chunk(task_id, index, &text, &hash, language).await,
                    Err(_) => {
                        let path = this.storage.chunk_path(task_id, index);
                        write_placeholder(&path).await;
                        path
                    }
                };
                (index, path)
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((index, path)) => slots[index] = Some(path),
                Err(e) => {
                    tracing::error!(task_id = %task_id, error = %e, "Chunk worker panicked");
                }
            }
        }

        for (index, leader) in followers {
            let target = self.storage.chunk_path(task_id, index);
            let copied = match &slots[leader] {
                Some(source) => copy_artifact(source, &target).await.is_ok(),
                None => false,
            };
            if !copied {
                write_placeholder(&target).await;
            }
            tracing::debug!(
                task_id = %task_id,
                chunk_index = index,
                leader_index = leader,
                "Duplicate chunk reused audio from the same batch"
            );
            slots[index] = Some(target);
        }
    }

    /// Always returns the chunk's artifact path; failures leave a placeholder.
    async fn process_chunk(
        &self,
        task_id: Uuid,
        index: usize,
        text: &str,
        hash: &str,
        language: LanguageCode,
    ) -> PathBuf {
        let target = self.storage.chunk_path(task_id, index);

        match self.resolve_chunk(text, hash, language, &target).await {
            Ok(source) => {
                tracing::debug!(
                    task_id = %task_id,
                    chunk_index = index,
                    hash = %hash,
                    source = ?source,
                    "Chunk audio ready"
                );
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %task_id,
                    chunk_index = index,
                    chunk_length = text.chars().count(),
                    error = %e,
                    "Chunk synthesis failed, writing placeholder"
                );
                write_placeholder(&target).await;
            }
        }

        target
    }

    async fn resolve_chunk(
        &self,
        text: &str,
        hash: &str,
        language: LanguageCode,
        target: &Path,
    ) -> Result<ChunkSource, ConversionError> {
        // 1. Exact hit
        if let Some(cached) = self.cached_artifact(hash).await {
            match copy_artifact(&cached, target).await {
                Ok(()) => return Ok(ChunkSource::CacheHit),
                Err(e) => {
                    tracing::warn!(hash = %hash, error = %e, "Cached artifact unreadable, resynthesizing");
                }
            }
        }

        // 2. Near duplicate whose audio is still on disk
        for (candidate, score) in
            self.cache
                .find_similar(text, language, self.settings.similarity_threshold)
        {
            if candidate == hash {
                continue;
            }
            let Some(path) = self.cached_artifact(&candidate).await else {
                continue;
            };
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            if copy_artifact(&path, target).await.is_ok() {
                return Ok(ChunkSource::SimilarMatch { score });
            }
        }

        // 3. Backend
        let audio = self.call_backend(text, language).await?;
        let artifact = self.storage.cache_artifact_path(hash);
        write_atomically(&artifact, &audio).await?;

        if let Err(e) = self.cache.store(text, language, &artifact).await {
            tracing::warn!(hash = %hash, error = %e, "Failed to record chunk in synthesis cache");
        }

        copy_artifact(&artifact, target).await?;
        Ok(ChunkSource::Synthesized)
    }

    /// A cache lookup failure is treated as a miss
    async fn cached_artifact(&self, hash: &str) -> Option<PathBuf> {
        match self.cache.lookup(hash).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(hash = %hash, error = %e, "Synthesis cache lookup failed");
                None
            }
        }
    }

    /// Send `text` to the backend, capped at the request limit. If the
    /// backend reports a lower limit, truncate to it and retry once.
    async fn call_backend(
        &self,
        text: &str,
        language: LanguageCode,
    ) -> Result<Vec<u8>, SpeechBackendError> {
        let request = truncate_at_word(text, self.settings.max_request_chars);
        if request.len() < text.len() {
            tracing::warn!(
                original_chars = text.chars().count(),
                sent_chars = request.chars().count(),
                "Chunk truncated to the backend request limit"
            );
        }

        let audio = match self.backend.synthesize(request, language).await {
            Err(SpeechBackendError::TextTooLong { limit }) if limit > 0 => {
                let shorter = truncate_at_word(request, limit);
                tracing::warn!(
                    provider = self.backend.name(),
                    limit = limit,
                    sent_chars = shorter.chars().count(),
                    "Backend rejected chunk length, retrying truncated"
                );
                self.backend.synthesize(shorter, language).await?
            }
            other => other?,
        };

        if audio.is_empty() {
            return Err(SpeechBackendError::EmptyAudio);
        }
        Ok(audio)
    }
}

async fn copy_artifact(source: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::copy(source, target).await.map(|_| ())
}

/// Zero-length file standing in for a chunk whose audio failed
async fn write_placeholder(path: &Path) {
    if let Err(e) = tokio::fs::write(path, b"").await {
        tracing::error!(path = %path.display(), error = %e, "Failed to write placeholder artifact");
    }
}

/// Write to a sibling temp file and rename, so concurrent writers of the same
/// cache artifact never expose a half-written file.
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = path.with_extension(format!("{}.part", Uuid::new_v4()));
    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        remove_file_best_effort(&partial).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        remove_file_best_effort(&partial).await;
        return Err(e);
    }
    Ok(())
}
