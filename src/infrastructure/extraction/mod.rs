pub mod docx;
pub mod pdf;

pub use docx::DocxTextExtractor;
pub use pdf::PdfTextExtractor;

use async_trait::async_trait;
use std::path::Path;

/// Document formats the pipeline accepts, by lowercase file extension
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx"];

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse document: {0}")]
    Parse(String),
}

/// Pulls plain text out of an uploaded document.
///
/// Implementations never panic past this boundary: parser panics and
/// blocking-pool failures come back as `ExtractionError::Parse`.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Lowercase extension of `file_name`, if it has one
pub fn document_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

pub fn is_supported_extension(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension)
}

/// Dispatches to the PDF or DOCX extractor by file extension
#[derive(Default)]
pub struct DocumentTextExtractor {
    pdf: PdfTextExtractor,
    docx: DocxTextExtractor,
}

impl DocumentTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let extension = path
            .to_str()
            .and_then(document_extension)
            .unwrap_or_default();

        let text = match extension.as_str() {
            "pdf" => self.pdf.extract(path).await?,
            "docx" => self.docx.extract(path).await?,
            other => return Err(ExtractionError::UnsupportedFormat(other.to_string())),
        };

        tracing::debug!(
            path = %path.display(),
            format = %extension,
            text_length = text.len(),
            "Text extracted"
        );

        Ok(text)
    }
}

/// Run a blocking parser on the blocking pool, turning a panic into an error
pub(crate) async fn run_blocking<F>(parse: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(parse)
        .await
        .map_err(|e| ExtractionError::Parse(format!("extraction task failed: {}", e)))?
}
