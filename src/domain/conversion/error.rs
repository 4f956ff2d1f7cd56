use crate::error::AppError;
use crate::infrastructure::extraction::ExtractionError;
use crate::infrastructure::repositories::SpeechBackendError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("unsupported file format '{0}', upload a PDF or DOCX file")]
    UnsupportedFormat(String),
    #[error("file of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },
    #[error("no text could be extracted from the document")]
    NoExtractableText,
    #[error("text extraction failed: {0}")]
    ExtractionFailure(String),
    #[error("speech synthesis failed: {0}")]
    SynthesisFailure(String),
    #[error("audio assembly failed: {0}")]
    AssemblyFailure(String),
    #[error("task {0} not found")]
    TaskNotFound(Uuid),
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),
    #[error("synthesis cache error: {0}")]
    Cache(String),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<ExtractionError> for ConversionError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat(ext) => ConversionError::UnsupportedFormat(ext),
            other => ConversionError::ExtractionFailure(other.to_string()),
        }
    }
}

impl From<SpeechBackendError> for ConversionError {
    fn from(err: SpeechBackendError) -> Self {
        ConversionError::SynthesisFailure(err.to_string())
    }
}

impl From<AppError> for ConversionError {
    fn from(err: AppError) -> Self {
        ConversionError::Cache(err.to_string())
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::UnsupportedFormat(_) => AppError::UnsupportedMediaType(err.to_string()),
            ConversionError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ConversionError::NoExtractableText | ConversionError::UnsupportedLanguage(_) => {
                AppError::BadRequest(err.to_string())
            }
            ConversionError::TaskNotFound(id) => AppError::NotFound(format!("Task {}", id)),
            ConversionError::SynthesisFailure(msg) => AppError::ExternalService(msg),
            ConversionError::ExtractionFailure(_)
            | ConversionError::AssemblyFailure(_)
            | ConversionError::Cache(_)
            | ConversionError::Storage(_) => AppError::Internal(err.to_string()),
        }
    }
}
