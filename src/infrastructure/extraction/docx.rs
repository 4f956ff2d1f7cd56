use super::{run_blocking, ExtractionError, TextExtractor};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";

/// DOCX text extraction: one line per paragraph of the main document part
#[derive(Debug, Default)]
pub struct DocxTextExtractor;

#[async_trait]
impl TextExtractor for DocxTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let path = path.to_path_buf();
        run_blocking(move || {
            let file = std::fs::File::open(&path)?;
            let mut archive =
                zip::ZipArchive::new(file).map_err(|e| ExtractionError::Parse(e.to_string()))?;
            let mut part = archive
                .by_name(DOCUMENT_PART)
                .map_err(|e| ExtractionError::Parse(format!("{}: {}", DOCUMENT_PART, e)))?;

            let mut xml = String::new();
            part.read_to_string(&mut xml)?;

            Ok(paragraphs_from_xml(&xml)?.join("\n"))
        })
        .await
    }
}

/// Text of every top-level paragraph in document order, empty paragraphs
/// included. Paragraphs nested in text boxes are folded into their parent.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(element) => match element.name().as_ref() {
                b"w:p" => depth += 1,
                b"w:t" => in_text = depth > 0,
                name => push_break(name, depth, &mut current),
            },
            Event::Empty(element) => match element.name().as_ref() {
                b"w:p" if depth == 0 => paragraphs.push(String::new()),
                name => push_break(name, depth, &mut current),
            },
            Event::End(element) => match element.name().as_ref() {
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(text) if in_text => {
                current.push_str(&text.unescape().map_err(xml_error)?);
            }
            Event::CData(text) if in_text => {
                current.push_str(&String::from_utf8_lossy(&text));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Tabs and line breaks inside a paragraph, `<w:br w:type="page"/>` included
fn push_break(name: &[u8], depth: usize, paragraph: &mut String) {
    if depth == 0 {
        return;
    }
    match name {
        b"w:tab" => paragraph.push('\t'),
        b"w:br" | b"w:cr" => paragraph.push('\n'),
        _ => {}
    }
}

fn xml_error(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Parse(format!("{}: {}", DOCUMENT_PART, e))
}
