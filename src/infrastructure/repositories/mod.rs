pub mod cache_repository;
pub mod openai_speech_backend;
pub mod polly_speech_backend;
pub mod speech_backend;

pub use cache_repository::{CacheRecord, CacheRepository};
pub use openai_speech_backend::OpenAiSpeechBackend;
pub use polly_speech_backend::PollySpeechBackend;
pub use speech_backend::{SpeechBackend, SpeechBackendError};
