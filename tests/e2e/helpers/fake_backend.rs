use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use voicedoc_backend::domain::tts::LanguageCode;
use voicedoc_backend::infrastructure::repositories::{SpeechBackend, SpeechBackendError};

/// Marker that makes the fake backend fail a request
pub const FAIL_MARKER: &str = "[[fail]]";

/// Speech backend standing in for Polly/OpenAI: answers `MP3:<lang>:<text>`
/// and counts calls
#[derive(Clone, Default)]
pub struct FakeSpeechBackend {
    calls: Arc<AtomicUsize>,
}

impl FakeSpeechBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn audio_for(text: &str, language: LanguageCode) -> Vec<u8> {
        format!("MP3:{}:{}", language, text).into_bytes()
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

        if text.contains(FAIL_MARKER) {
            return Err(SpeechBackendError::Provider("synthetic failure".to_string()));
        }

        Ok(Self::audio_for(text, language))
    }
}
