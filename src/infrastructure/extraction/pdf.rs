use super::{run_blocking, ExtractionError, TextExtractor};
use async_trait::async_trait;
use std::path::Path;

/// PDF text extraction backed by `pdf-extract`
#[derive(Debug, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let path = path.to_path_buf();
        run_blocking(move || {
            pdf_extract::extract_text(&path).map_err(|e| ExtractionError::Parse(e.to_string()))
        })
        .await
    }
}
