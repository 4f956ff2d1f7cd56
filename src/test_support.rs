//! Fakes and fixtures shared by the unit tests.

use crate::domain::conversion::{
    ConversionService, ConversionSettings, ParallelSynthesizer, SynthesisCache,
    SynthesizerSettings, TaskRegistry,
};
use crate::domain::tts::LanguageCode;
use crate::infrastructure::db::create_pool;
use crate::infrastructure::extraction::{ExtractionError, TextExtractor};
use crate::infrastructure::repositories::{CacheRepository, SpeechBackend, SpeechBackendError};
use crate::infrastructure::storage::StorageLayout;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Speech backend that returns `MP3[<lang>:<text>]` and counts its calls
#[derive(Clone, Default)]
pub struct FakeSpeechBackend {
    calls: Arc<AtomicUsize>,
    fail_on: Option<String>,
    limit: Option<usize>,
}

impl FakeSpeechBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every request whose text contains `needle`
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    /// Rejects requests longer than `limit` characters
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn audio_for(text: &str, language: LanguageCode) -> Vec<u8> {
        format!("MP3[{}:{}]", language, text).into_bytes()
    }
}

#[async_trait]
impl SpeechBackend for FakeSpeechBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(
        &self,
        text: &str,
        language: LanguageCode,
    ) -> Result<Vec<u8>, SpeechBackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(limit) = self.limit {
            if text.chars().count() > limit {
                return Err(SpeechBackendError::TextTooLong { limit });
            }
        }
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(SpeechBackendError::Provider("synthetic failure".to_string()));
            }
        }

        Ok(Self::audio_for(text, language))
    }
}

/// Extractor that ignores the file and returns a canned result
pub struct FakeTextExtractor {
    result: Result<String, String>,
}

impl FakeTextExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl TextExtractor for FakeTextExtractor {
    async fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
        self.result.clone().map_err(ExtractionError::Parse)
    }
}

/// Scratch data directory with a real SQLite cache and a synthesizer over
/// the given backend
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub storage: StorageLayout,
    pub cache: Arc<SynthesisCache>,
    pub synthesizer: Arc<ParallelSynthesizer>,
}

impl Harness {
    pub async fn new(backend: FakeSpeechBackend) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path());
        storage.ensure_dirs().await.unwrap();

        let pool = create_pool(&storage.database_path()).await.unwrap();
        let repo = Arc::new(CacheRepository::new(Arc::new(pool)));
        let cache = Arc::new(SynthesisCache::new(repo, 64));

        let synthesizer = Arc::new(ParallelSynthesizer::new(
            Arc::new(backend),
            cache.clone(),
            storage.clone(),
            SynthesizerSettings {
                workers: 2,
                batch_size: 4,
                similarity_threshold: 0.9,
                max_request_chars: 3000,
            },
        ));

        Self {
            dir,
            storage,
            cache,
            synthesizer,
        }
    }

    pub fn service(&self, extractor: FakeTextExtractor, settings: ConversionSettings) -> ConversionService {
        ConversionService::new(
            Arc::new(TaskRegistry::new()),
            Arc::new(extractor),
            self.synthesizer.clone(),
            self.storage.clone(),
            settings,
        )
    }
}
