use crate::domain::tts::LanguageCode;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SpeechBackendError {
    #[error("text exceeds the provider limit of {limit} characters")]
    TextTooLong { limit: usize },
    #[error("provider returned no audio")]
    EmptyAudio,
    #[error("provider error: {0}")]
    Provider(String),
}

/// Speech synthesis provider (AWS Polly, OpenAI, ...).
///
/// Implementations synthesize exactly one request: splitting documents into
/// chunks, caching and reassembly all happen upstream. A request longer than
/// the provider accepts must be answered with `TextTooLong` carrying the
/// provider limit, so the caller can truncate and retry.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Short provider name used in logs and health output
    fn name(&self) -> &'static str;

    /// Synthesize `text` in `language`, returning MP3 bytes
    async fn synthesize(
        &self,
        text: &str,
        language: LanguageCode,
    ) -> Result<Vec<u8>, SpeechBackendError>;
}
