pub mod conversion;
pub mod tts;
