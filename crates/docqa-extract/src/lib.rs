//! docqa extract crate - text extraction from uploaded documents.
//!
//! Provides the TextExtractor trait, a DocumentExtractor that handles PDF
//! and plain-text uploads, and a MockExtractor for testing.
//!
//! Extraction never judges readability: a PDF with no text layer extracts
//! to an empty (or whitespace-only) string and the retrieval store decides
//! what to do with it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use docqa_core::error::DocQaError;
use tracing::debug;

/// Errors from text extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("empty upload")]
    Empty,
    #[error("unsupported document type: {0}")]
    Unsupported(String),
    #[error("failed to parse PDF: {0}")]
    Pdf(String),
    #[error("extraction task failed: {0}")]
    Task(String),
}

impl From<ExtractError> for DocQaError {
    fn from(err: ExtractError) -> Self {
        DocQaError::Extraction(err.to_string())
    }
}

/// Service for turning uploaded file bytes into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract text from a document.
    ///
    /// # Arguments
    /// * `file_name` - Client-supplied name, used as a type hint.
    /// * `bytes` - Raw file contents.
    fn extract(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;
}

type BoxedExtractFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ExtractError>> + Send + 'a>>;

/// Object-safe version of [`TextExtractor`] so handlers can hold any
/// extractor behind an `Arc`.
pub trait DynTextExtractor: Send + Sync {
    fn extract_boxed<'a>(&'a self, file_name: &'a str, bytes: &'a [u8]) -> BoxedExtractFuture<'a>;
}

impl<T: TextExtractor> DynTextExtractor for T {
    fn extract_boxed<'a>(&'a self, file_name: &'a str, bytes: &'a [u8]) -> BoxedExtractFuture<'a> {
        Box::pin(self.extract(file_name, bytes))
    }
}

/// A runtime-selected extractor.
pub type SharedExtractor = Arc<dyn DynTextExtractor>;

/// Kind of document detected from its name and leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Detect the document kind. PDF wins on either the magic bytes or the
/// extension; anything else is tried as text.
pub fn detect_kind(file_name: &str, bytes: &[u8]) -> DocumentKind {
    let is_pdf_name = file_name.to_ascii_lowercase().ends_with(".pdf");
    if bytes.starts_with(PDF_MAGIC) || is_pdf_name {
        DocumentKind::Pdf
    } else {
        DocumentKind::Text
    }
}

/// Extractor for PDF and plain-text documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
        // A NUL byte in the first KiB means this is not a text file.
        let probe = &bytes[..bytes.len().min(1024)];
        if probe.contains(&0) {
            return Err(ExtractError::Unsupported("binary file".to_string()));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl TextExtractor for DocumentExtractor {
    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::Empty);
        }

        match detect_kind(file_name, bytes) {
            DocumentKind::Pdf => {
                if !bytes.starts_with(PDF_MAGIC) {
                    return Err(ExtractError::Pdf("missing %PDF- header".to_string()));
                }
                // PDF parsing is CPU-bound; keep it off the async workers.
                let owned = bytes.to_vec();
                let text = tokio::task::spawn_blocking(move || {
                    pdf_extract::extract_text_from_mem(&owned)
                        .map_err(|e| ExtractError::Pdf(e.to_string()))
                })
                .await
                .map_err(|e| ExtractError::Task(e.to_string()))??;
                debug!(file_name, chars = text.len(), "Extracted PDF text");
                Ok(text)
            }
            DocumentKind::Text => {
                let text = Self::extract_text(bytes)?;
                debug!(file_name, chars = text.len(), "Read plain-text upload");
                Ok(text)
            }
        }
    }
}

/// Mock extractor for testing.
///
/// Returns the configured text for any non-empty input.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    response_text: String,
}

impl MockExtractor {
    pub fn with_text(text: &str) -> Self {
        Self {
            response_text: text.to_string(),
        }
    }

    /// Simulates a scanned document with no text layer.
    pub fn empty() -> Self {
        Self {
            response_text: String::new(),
        }
    }
}

impl TextExtractor for MockExtractor {
    async fn extract(&self, _file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(self.response_text.clone())
    }
}
