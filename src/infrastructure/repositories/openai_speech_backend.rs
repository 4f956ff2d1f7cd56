use super::speech_backend::{SpeechBackend, SpeechBackendError};
use crate::domain::tts::LanguageCode;
use async_openai::{
    config::OpenAIConfig,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI has a limit of 4096 characters per request
const MAX_REQUEST_CHARS: usize = 4096;

/// OpenAI TTS speech backend
pub struct OpenAiSpeechBackend {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    default_voice: String,
}

impl OpenAiSpeechBackend {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String, default_voice: String) -> Self {
        Self {
            client,
            model,
            default_voice,
        }
    }

    /// Voice used when no default voice is configured
    fn voice_for_language(language: LanguageCode) -> Voice {
        match language {
            LanguageCode::English => Voice::Alloy,
            LanguageCode::Spanish => Voice::Echo,
            LanguageCode::French => Voice::Nova,
            LanguageCode::German => Voice::Onyx,
            LanguageCode::Italian => Voice::Fable,
            LanguageCode::Portuguese => Voice::Shimmer,
        }
    }

    fn parse_voice(voice: &str) -> Option<Voice> {
        match voice.to_lowercase().as_str() {
            "alloy" => Some(Voice::Alloy),
            "echo" => Some(Voice::Echo),
            "fable" => Some(Voice::Fable),
            "onyx" => Some(Voice::Onyx),
            "nova" => Some(Voice::Nova),
            "shimmer" => Some(Voice::Shimmer),
            _ => None,
        }
    }

    fn select_voice(&self, language: LanguageCode) -> Voice {
        Self::parse_voice(&self.default_voice)
            .unwrap_or_else(|| Self::voice_for_language(language))
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

#[async_trait]
impl SpeechBackend for OpenAiSpeechBackend {
    fn name(&self) -> &'static str {
        "openai"
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
        let voice = self.select_voice(language);

        tracing::debug!(
            model = %self.model,
            voice = ?voice,
            language = %language,
            text_length = text.len(),
            "Calling OpenAI TTS API"
        );

        let request = CreateSpeechRequest {
            model: self.speech_model(),
            input: text.to_string(),
            voice,
            response_format: None, // Defaults to MP3
            speed: None,
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.model,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            SpeechBackendError::Provider(format!("OpenAI TTS error: {}", e))
        })?;

        let audio_bytes = response.bytes.to_vec();
        if audio_bytes.is_empty() {
            return Err(SpeechBackendError::EmptyAudio);
        }

        tracing::debug!(
            provider = "openai",
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.chars().count(),
            audio_size_bytes = audio_bytes.len(),
            "OpenAI TTS request completed"
        );

        Ok(audio_bytes)
    }
}
