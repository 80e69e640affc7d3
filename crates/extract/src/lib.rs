//! Text extraction from various document formats
//!
//! Converts heterogeneous content (plain text, PDF, XLSX, DOCX, CSV, source
//! code) into a stream of text chunks for privacy scanning. Structured binary
//! formats are linearized first; the source bytes are consumed and dropped
//! before chunk emission begins, so peak memory is bounded by the linearized
//! text plus one chunk rather than text + original binary.
//!
//! Format libraries sit behind default-on cargo features (`pdf`,
//! `spreadsheet`, `document`). A build without a feature degrades to
//! [`ExtractError::UnsupportedFormat`] instead of failing, so callers can
//! fall back to plain-text reinterpretation or skip scanning with a warning.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of content handed to the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Plain,
    Pdf,
    Spreadsheet,
    Document,
    Delimited,
    Code,
}

impl ContentKind {
    /// Map a MIME type to a content kind, if we know how to extract it.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type {
            "text/plain" | "text/markdown" | "text/html" | "text/xml" | "application/json"
            | "application/xml" => Some(Self::Plain),

            "text/csv" | "text/tab-separated-values" => Some(Self::Delimited),

            "text/x-python" | "text/x-java" | "text/javascript" | "application/javascript"
            | "text/css" | "text/x-rust" | "text/x-c" | "text/x-c++" => Some(Self::Code),

            "application/pdf" => Some(Self::Pdf),

            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Some(Self::Spreadsheet),

            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Document)
            }

            _ => None,
        }
    }

    /// Map a file extension (without the dot) to a content kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "md" | "html" | "htm" | "xml" | "json" | "log" => Some(Self::Plain),
            "csv" | "tsv" => Some(Self::Delimited),
            "py" | "java" | "js" | "ts" | "css" | "rs" | "c" | "cpp" | "h" | "go" => {
                Some(Self::Code)
            }
            "pdf" => Some(Self::Pdf),
            "xlsx" | "xls" => Some(Self::Spreadsheet),
            "docx" => Some(Self::Document),
            _ => None,
        }
    }
}

/// Error type for text extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("office document error: {0}")]
    Office(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// A finite stream of text chunks sliced from the linearized document.
///
/// Owns the full extracted text; yields successive chunks of up to
/// `chunk_size` characters, never splitting a UTF-8 code point. Restart by
/// re-invoking [`extract`] on the same content.
pub struct ChunkStream {
    text: String,
    pos: usize,
    chunk_size: usize,
}

impl ChunkStream {
    /// Wrap already-linearized text in a chunk stream.
    pub fn from_text(text: String, chunk_size: usize) -> Self {
        Self {
            text,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Total length of the underlying text in bytes.
    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    /// Consume the stream, returning the full linearized text.
    pub fn into_text(self) -> String {
        self.text
    }
}

impl Iterator for ChunkStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.pos >= self.text.len() {
            return None;
        }
        let end = chunk_end(&self.text, self.pos, self.chunk_size);
        let chunk = self.text[self.pos..end].to_string();
        self.pos = end;
        Some(chunk)
    }
}

/// Byte index of the end of a chunk of up to `max_chars` characters
/// starting at byte `start`. Always lands on a char boundary.
fn chunk_end(text: &str, start: usize, max_chars: usize) -> usize {
    match text[start..].char_indices().nth(max_chars) {
        Some((offset, _)) => start + offset,
        None => text.len(),
    }
}

/// Extract text content from a buffer and slice it into chunks.
///
/// The buffer is consumed: for structured formats it is dropped as soon as
/// linearization completes, before the first chunk is emitted.
pub fn extract(
    bytes: Vec<u8>,
    kind: ContentKind,
    chunk_size: usize,
) -> Result<ChunkStream, ExtractError> {
    let text = linearize(bytes, kind)?;
    Ok(ChunkStream::from_text(text, chunk_size))
}

/// Linearize a buffer into plain text according to its content kind.
pub fn linearize(bytes: Vec<u8>, kind: ContentKind) -> Result<String, ExtractError> {
    match kind {
        // Text formats - direct UTF-8 conversion, lossy for odd encodings
        ContentKind::Plain | ContentKind::Delimited | ContentKind::Code => Ok(decode_text(bytes)),

        ContentKind::Pdf => extract_pdf(bytes),
        ContentKind::Spreadsheet => extract_spreadsheet(bytes),
        ContentKind::Document => extract_docx(bytes),
    }
}

/// Decode raw bytes as text, replacing invalid UTF-8 sequences.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

// ==================== PDF ====================

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: Vec<u8>) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        tracing::warn!("PDF extraction failed: {:?}", e);
        ExtractError::Pdf(format!("failed to extract text from PDF: {}", e))
    })
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: Vec<u8>) -> Result<String, ExtractError> {
    Err(ExtractError::UnsupportedFormat(
        "PDF extraction not available (built without the `pdf` feature)".to_string(),
    ))
}

// ==================== Spreadsheets ====================

#[cfg(feature = "spreadsheet")]
fn extract_spreadsheet(bytes: Vec<u8>) -> Result<String, ExtractError> {
    use calamine::{Reader, Xls, Xlsx};
    use std::io::Cursor;

    // Try the OOXML container first, fall back to legacy XLS
    match Xlsx::new(Cursor::new(&bytes)) {
        Ok(workbook) => Ok(sheets_to_text(workbook)),
        Err(_) => {
            let workbook: Xls<_> = Xls::new(Cursor::new(&bytes))
                .map_err(|e| ExtractError::Office(format!("invalid spreadsheet: {}", e)))?;
            Ok(sheets_to_text(workbook))
        }
    }
}

/// Linearize every sheet of a workbook: one header line per sheet, one
/// tab-joined line per non-empty row.
#[cfg(feature = "spreadsheet")]
fn sheets_to_text<RS, R>(mut workbook: R) -> String
where
    RS: std::io::Read + std::io::Seek,
    R: calamine::Reader<RS>,
{
    let mut text_parts = Vec::new();
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    for sheet_name in sheet_names {
        if let Ok(range) = workbook.worksheet_range(&sheet_name) {
            text_parts.push(format!("=== Sheet: {} ===", sheet_name));

            for row in range.rows() {
                let row_text: Vec<String> = row
                    .iter()
                    .map(|cell| cell.to_string())
                    .filter(|s| !s.is_empty())
                    .collect();

                if !row_text.is_empty() {
                    text_parts.push(row_text.join("\t"));
                }
            }
        }
    }

    text_parts.join("\n")
}

#[cfg(not(feature = "spreadsheet"))]
fn extract_spreadsheet(_bytes: Vec<u8>) -> Result<String, ExtractError> {
    Err(ExtractError::UnsupportedFormat(
        "spreadsheet extraction not available (built without the `spreadsheet` feature)"
            .to_string(),
    ))
}

// ==================== Word documents ====================

#[cfg(feature = "document")]
fn extract_docx(bytes: Vec<u8>) -> Result<String, ExtractError> {
    use std::io::{Cursor, Read};

    let cursor = Cursor::new(&bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ExtractError::Office(format!("invalid DOCX file: {}", e)))?;

    // DOCX stores content in word/document.xml
    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Office("no document.xml found in DOCX".to_string()))?;

    let mut xml_content = String::new();
    document_xml
        .read_to_string(&mut xml_content)
        .map_err(|e| ExtractError::Io(e.to_string()))?;

    Ok(text_from_office_xml(&xml_content))
}

#[cfg(not(feature = "document"))]
fn extract_docx(_bytes: Vec<u8>) -> Result<String, ExtractError> {
    Err(ExtractError::UnsupportedFormat(
        "document extraction not available (built without the `document` feature)".to_string(),
    ))
}

/// Extract text content from Office Open XML, collecting `<w:t>` runs and
/// breaking lines on paragraph ends.
#[cfg(feature = "document")]
fn text_from_office_xml(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                let local_name = std::str::from_utf8(name.as_ref()).unwrap_or("");
                if local_name.ends_with(":t") || local_name == "t" {
                    in_text_element = true;
                }
            }
            Ok(Event::Text(e)) => {
                if in_text_element {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local_name = std::str::from_utf8(name.as_ref()).unwrap_or("");
                if local_name.ends_with(":t") || local_name == "t" {
                    in_text_element = false;
                }
                if local_name.ends_with(":p") || local_name == "p" {
                    let line = current.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    current.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("XML parsing error: {:?}", e);
                break;
            }
            _ => {}
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let chunks: Vec<String> = extract(b"Hello, World!".to_vec(), ContentKind::Plain, 2000)
            .unwrap()
            .collect();
        assert_eq!(chunks, vec!["Hello, World!".to_string()]);
    }

    #[test]
    fn chunks_never_split_code_points() {
        // 3-byte characters with a chunk size that does not divide evenly
        let text = "héllo wörld, çà va bien aujourd'hui".repeat(10);
        let stream = extract(text.clone().into_bytes(), ContentKind::Plain, 7).unwrap();
        let chunks: Vec<String> = stream.collect();
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunk_count_matches_char_count() {
        let text = "a".repeat(10_000);
        let chunks: Vec<String> = extract(text.into_bytes(), ContentKind::Plain, 2000)
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.chars().count() == 2000));
    }

    #[test]
    fn invalid_utf8_decodes_lossily() {
        let bytes = vec![b'o', b'k', 0xFF, b'!', b'?'];
        let chunks: Vec<String> = extract(bytes, ContentKind::Plain, 2000).unwrap().collect();
        assert!(chunks[0].starts_with("ok"));
        assert!(chunks[0].ends_with("!?"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn malformed_pdf_errors_gracefully() {
        let result = extract(b"not a pdf at all".to_vec(), ContentKind::Pdf, 2000);
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn pdf_without_library_is_unsupported() {
        let result = extract(b"%PDF-1.4".to_vec(), ContentKind::Pdf, 2000);
        assert!(matches!(result, Err(ExtractError::UnsupportedFormat(_))));
    }

    #[cfg(feature = "document")]
    #[test]
    fn malformed_docx_errors_gracefully() {
        let result = extract(b"not a zip archive".to_vec(), ContentKind::Document, 2000);
        assert!(matches!(result, Err(ExtractError::Office(_))));
    }

    #[cfg(feature = "document")]
    #[test]
    fn office_xml_text_runs_are_joined() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Contact </w:t></w:r><w:r><w:t>jane@example.com</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = text_from_office_xml(xml);
        assert_eq!(text, "Contact jane@example.com\nSecond paragraph");
    }

    #[test]
    fn mime_dispatch() {
        assert_eq!(ContentKind::from_mime("application/pdf"), Some(ContentKind::Pdf));
        assert_eq!(ContentKind::from_mime("text/csv"), Some(ContentKind::Delimited));
        assert_eq!(ContentKind::from_mime("text/x-rust"), Some(ContentKind::Code));
        assert_eq!(ContentKind::from_mime("application/octet-stream"), None);
    }
}
