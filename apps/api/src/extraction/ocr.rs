//! OCR collaborators: page rasterizing and text recognition for image-only documents.
//!
//! Production backends shell out to `pdftoppm` (poppler-utils) and `tesseract`.
//! Child processes are killed if the calling future is dropped (request deadline).

use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: &'static str, stderr: String },
}

/// One rendered page, PNG-encoded. `page_number` is 1-based.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_number: u32,
    pub png: Bytes,
}

/// Renders every page of a document to an image, in page order.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn render_pages(&self, document: &[u8]) -> Result<Vec<PageImage>, OcrError>;
}

/// Recognizes the text on a single page image.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &PageImage) -> Result<String, OcrError>;
}

// ────────────────────────────────────────────────────────────────────────────
// pdftoppm
// ────────────────────────────────────────────────────────────────────────────

pub struct PopplerRasterizer {
    dpi: u32,
}

impl PopplerRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }
}

#[async_trait]
impl PageRasterizer for PopplerRasterizer {
    async fn render_pages(&self, document: &[u8]) -> Result<Vec<PageImage>, OcrError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("document.pdf");
        tokio::fs::write(&input, document).await?;

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(scratch.path().join("page"))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "pdftoppm",
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(page_number) = page_number_from_file_name(&file_name.to_string_lossy()) else {
                continue;
            };
            let png = tokio::fs::read(entry.path()).await?;
            pages.push(PageImage {
                page_number,
                png: Bytes::from(png),
            });
        }
        pages.sort_by_key(|p| p.page_number);

        debug!("pdftoppm rendered {} pages at {} dpi", pages.len(), self.dpi);
        Ok(pages)
    }
}

/// Parses `page-7.png` / `page-07.png` as written by `pdftoppm <in> <dir>/page`.
fn page_number_from_file_name(name: &str) -> Option<u32> {
    name.strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

// ────────────────────────────────────────────────────────────────────────────
// tesseract
// ────────────────────────────────────────────────────────────────────────────

pub struct TesseractRecognizer {
    lang: String,
}

impl TesseractRecognizer {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &PageImage) -> Result<String, OcrError> {
        let file = tempfile::Builder::new()
            .prefix("page-")
            .suffix(".png")
            .tempfile()?;
        tokio::fs::write(file.path(), &image.png).await?;

        let output = Command::new("tesseract")
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "tesseract",
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Checks that `pdftoppm` and `tesseract` can be spawned.
pub async fn ocr_tools_available() -> bool {
    let pdftoppm = probe("pdftoppm", "-v").await;
    let tesseract = probe("tesseract", "--version").await;

    if !pdftoppm {
        warn!("pdftoppm not found - install poppler-utils for OCR support");
    }
    if !tesseract {
        warn!("tesseract not found - install tesseract-ocr for OCR support");
    }

    pdftoppm && tesseract
}

async fn probe(tool: &str, flag: &str) -> bool {
    Command::new(tool)
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok()
}
