//! Document text extraction with OCR fallback.
//!
//! 1. Structural pass (CPU-only, `spawn_blocking`): `lopdf` opens the document and counts
//!    pages, `pdf-extract` reads the embedded text of each page.
//! 2. If that yields nothing usable, every page is rasterized and recognized.
//!
//! Parser quirks (errors, panics) in the structural pass only mean "no text". The request
//! fails only when the fallback cannot run either.

pub mod ocr;

#[cfg(test)]
pub mod testing;

use std::panic;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use self::ocr::{OcrError, PageRasterizer, TextRecognizer};

const LOG_PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("uploaded document is empty")]
    EmptyDocument,

    #[error("document could not be opened ({structural}) or rendered ({render})")]
    Unreadable { structural: String, render: OcrError },

    #[error("failed to render document pages: {0}")]
    Rasterize(OcrError),

    #[error("text recognition failed on page {page}: {source}")]
    Recognition { page: u32, source: OcrError },

    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Uploaded document bytes. The declared content type is informative only.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Bytes,
    content_type: Option<String>,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Result<Self, ExtractError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ExtractError::EmptyDocument);
        }
        Ok(Self {
            bytes,
            content_type,
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// True if the bytes start with the PDF magic number, whatever the declared type says.
    pub fn has_pdf_signature(&self) -> bool {
        self.bytes.starts_with(b"%PDF-")
    }
}

/// Which path produced the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Native,
    Recognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub provenance: Provenance,
    pub page_count: usize,
}

/// Outcome of the structural pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralText {
    Extracted(String),
    /// No usable embedded text; carries the reason for diagnostics.
    Unavailable(String),
}

#[derive(Debug)]
struct StructuralPass {
    /// `None` when the document could not be opened structurally.
    page_count: Option<usize>,
    text: StructuralText,
}

/// Turns raw document bytes into plain text. Holds no per-call state.
#[derive(Clone)]
pub struct DocumentTextExtractor {
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl DocumentTextExtractor {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            rasterizer,
            recognizer,
        }
    }

    pub async fn extract(&self, document: &RawDocument) -> Result<ExtractedText, ExtractError> {
        let bytes = document.bytes().clone();
        let pass = tokio::task::spawn_blocking(move || read_structural_text(&bytes))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))?;

        let reason = match pass.text {
            StructuralText::Extracted(text) => {
                let pages = pass.page_count.unwrap_or_default();
                return Ok(finish(text, Provenance::Native, pages));
            }
            StructuralText::Unavailable(reason) => reason,
        };
        debug!("Structural extraction unavailable ({reason}); falling back to OCR");

        if pass.page_count == Some(0) {
            return Ok(finish(String::new(), Provenance::Recognized, 0));
        }

        let images = match self.rasterizer.render_pages(document.bytes()).await {
            Ok(images) => images,
            Err(render) if pass.page_count.is_none() => {
                return Err(ExtractError::Unreadable {
                    structural: reason,
                    render,
                })
            }
            Err(e) => return Err(ExtractError::Rasterize(e)),
        };

        let mut pages = Vec::with_capacity(images.len());
        for image in &images {
            let text = self
                .recognizer
                .recognize(image)
                .await
                .map_err(|source| ExtractError::Recognition {
                    page: image.page_number,
                    source,
                })?;
            pages.push(text);
        }

        Ok(finish(join_pages(pages), Provenance::Recognized, images.len()))
    }
}

fn finish(text: String, provenance: Provenance, page_count: usize) -> ExtractedText {
    info!(
        provenance = ?provenance,
        pages = page_count,
        chars = text.chars().count(),
        "Extracted document text"
    );
    debug!("Extracted text preview:\n{}", text_preview(&text, LOG_PREVIEW_CHARS));
    ExtractedText {
        text,
        provenance,
        page_count,
    }
}

fn read_structural_text(bytes: &[u8]) -> StructuralPass {
    let page_count = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc.get_pages().len(),
        Err(e) => {
            return StructuralPass {
                page_count: None,
                text: StructuralText::Unavailable(format!("could not open document: {e}")),
            }
        }
    };

    if page_count == 0 {
        return StructuralPass {
            page_count: Some(0),
            text: StructuralText::Unavailable("document has no pages".to_string()),
        };
    }

    // pdf-extract panics on some malformed inputs; that is a quirk, not a fatal error.
    let text = match panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => {
            let text = join_pages(pages);
            if text.trim().is_empty() {
                StructuralText::Unavailable("no embedded text".to_string())
            } else {
                StructuralText::Extracted(text)
            }
        }
        Ok(Err(e)) => StructuralText::Unavailable(format!("text extraction failed: {e}")),
        Err(_) => StructuralText::Unavailable("PDF text extractor panicked".to_string()),
    };

    StructuralPass {
        page_count: Some(page_count),
        text,
    }
}

/// Concatenates page texts in order, each followed by a newline.
fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages.into_iter().fold(String::new(), |mut acc, page| {
        acc.push_str(page.as_ref());
        acc.push('\n');
        acc
    })
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
pub fn text_preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
