use super::error::ConversionError;
use super::similarity::SimilarityIndex;
use crate::domain::tts::LanguageCode;
use crate::infrastructure::repositories::CacheRepository;
use crate::infrastructure::storage::remove_file_best_effort;
use chrono::{Duration, Utc};
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Content-addressed store of synthesized chunk audio.
///
/// The SQLite table is the source of truth. A bounded LRU memo sits in
/// front of it and is kept in step on every write and eviction, so it can
/// only ever answer what the table would. The near-duplicate index holds the
/// chunks stored by this process and loses them on eviction.
pub struct SynthesisCache {
    repo: Arc<CacheRepository>,
    memo: Cache<String, PathBuf>,
    index: SimilarityIndex,
}

impl SynthesisCache {
    pub fn new(repo: Arc<CacheRepository>, memo_capacity: u64) -> Self {
        let memo = Cache::builder()
            .max_capacity(memo_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            repo,
            memo,
            index: SimilarityIndex::new(),
        }
    }

    /// Cache key of a chunk: SHA-256 of the language tag and the
    /// whitespace-normalized text. The same words spoken in two languages are
    /// two different entries.
    pub fn hash_text(text: &str, language: LanguageCode) -> String {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let digest = Sha256::digest(format!("{}\n{}", language.as_str(), normalized).as_bytes());
        format!("{:x}", digest)
    }

    /// Hashes of stored chunks in `language` that are near duplicates of
    /// `text`, best match first
    pub fn find_similar(&self, text: &str, language: LanguageCode, threshold: f64) -> Vec<(String, f64)> {
        self.index.find_similar(text, language, threshold)
    }

    pub async fn lookup(&self, hash: &str) -> Result<Option<PathBuf>, ConversionError> {
        if let Some(path) = self.memo.get(hash).await {
            return Ok(Some(path));
        }

        let Some(record) = self.repo.find(hash).await? else {
            return Ok(None);
        };

        let path = PathBuf::from(record.artifact_path);
        self.memo.insert(hash.to_string(), path.clone()).await;
        Ok(Some(path))
    }

    /// Record `artifact_path` as the audio for `text` in `language` unless it
    /// is already cached. Either way the chunk's hash is returned.
    pub async fn store(
        &self,
        text: &str,
        language: LanguageCode,
        artifact_path: &Path,
    ) -> Result<String, ConversionError> {
        let hash = Self::hash_text(text, language);
        let inserted = self
            .repo
            .insert_if_absent(&hash, &artifact_path.to_string_lossy(), Utc::now().timestamp())
            .await?;

        if inserted {
            self.memo.insert(hash.clone(), artifact_path.to_path_buf()).await;
            tracing::debug!(hash = %hash, path = %artifact_path.display(), "Chunk audio cached");
        } else {
            // Another writer won; the next lookup reads its path through.
            self.memo.invalidate(&hash).await;
            tracing::debug!(hash = %hash, "Chunk audio already cached");
        }
        self.index.add_chunk(text, language, &hash);

        Ok(hash)
    }

    /// Delete every entry older than `max_age_days`, record first, then its
    /// audio file. File deletion failures are logged and skipped.
    pub async fn evict_older_than(&self, max_age_days: u32) -> Result<usize, ConversionError> {
        let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));
        let evicted = self.repo.delete_older_than(cutoff.timestamp()).await?;

        for record in &evicted {
            self.memo.invalidate(&record.hash).await;
            self.index.remove_chunk(&record.hash);
            remove_file_best_effort(Path::new(&record.artifact_path)).await;
        }

        if !evicted.is_empty() {
            tracing::info!(
                evicted = evicted.len(),
                max_age_days = max_age_days,
                indexed = self.index.len(),
                "Evicted expired synthesis cache entries"
            );
        }

        Ok(evicted.len())
    }
}
