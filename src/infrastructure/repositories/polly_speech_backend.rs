use super::speech_backend::{SpeechBackend, SpeechBackendError};
use crate::domain::tts::LanguageCode;
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// AWS Polly has a limit of 3000 characters per request
const MAX_REQUEST_CHARS: usize = 3000;

/// AWS Polly speech backend, always on the neural engine
pub struct PollySpeechBackend {
    polly_client: Arc<PollyClient>,
}

impl PollySpeechBackend {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    /// Neural-capable Polly voice for each supported language
    fn voice_for_language(language: LanguageCode) -> &'static str {
        match language {
            LanguageCode::English => "Joanna",
            LanguageCode::Spanish => "Lupe",
            LanguageCode::French => "Lea",
            LanguageCode::German => "Vicki",
            LanguageCode::Italian => "Bianca",
            LanguageCode::Portuguese => "Ines",
        }
    }
}

#[async_trait]
impl SpeechBackend for PollySpeechBackend {
    fn name(&self) -> &'static str {
        "polly"
    }

    async fn synthesize(
        &self,
        text: &str,
        language: LanguageCode,
    ) -> Result<Vec<u8>, SpeechBackendError> {
        if text.chars().count() > MAX_REQUEST_CHARS {
            return Err(SpeechBackendError::TextTooLong {
                limit: MAX_REQUEST_CHARS,
            });
        }

        let start_time = std::time::Instant::now();
        let voice_name = Self::voice_for_language(language);
        let voice_id = VoiceId::from(voice_name);

        tracing::debug!(
            language = %language,
            voice = voice_name,
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Mp3)
            .engine(Engine::Neural)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    language = %language,
                    voice = voice_name,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                SpeechBackendError::Provider(format!("AWS Polly error: {}", e))
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            SpeechBackendError::Provider(format!("Failed to read audio stream: {}", e))
        })?;

        let audio_bytes = audio_stream.into_bytes().to_vec();
        if audio_bytes.is_empty() {
            return Err(SpeechBackendError::EmptyAudio);
        }

        tracing::debug!(
            provider = "polly",
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.chars().count(),
            audio_size_bytes = audio_bytes.len(),
            "Polly request completed"
        );

        Ok(audio_bytes)
    }
}
