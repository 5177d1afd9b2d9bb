//! PDF fixtures built in memory with `lopdf`, plus OCR test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::ocr::{OcrError, PageImage, PageRasterizer, TextRecognizer};

/// A document whose pages each carry one line of embedded Helvetica text.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    build_pdf(
        lines
            .iter()
            .map(|line| {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ]
            })
            .collect(),
    )
}

/// A scanned-style document: pages draw shapes but contain no text operators.
pub fn image_only_pdf(pages: usize) -> Vec<u8> {
    build_pdf(
        (0..pages)
            .map(|_| {
                vec![
                    Operation::new("re", vec![72.into(), 500.into(), 300.into(), 200.into()]),
                    Operation::new("f", vec![]),
                ]
            })
            .collect(),
    )
}

pub fn zero_page_pdf() -> Vec<u8> {
    build_pdf(Vec::new())
}

fn build_pdf(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let kids: Vec<Object> = pages
        .into_iter()
        .map(|operations| {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode page content"),
            ));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            page_id.into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize fixture PDF");
    out
}

/// Returns a fixed number of blank page images, or fails, and counts calls.
pub struct FakeRasterizer {
    pages: Option<u32>,
    calls: AtomicUsize,
}

impl FakeRasterizer {
    pub fn pages(count: u32) -> Self {
        Self {
            pages: Some(count),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn render_pages(&self, _document: &[u8]) -> Result<Vec<PageImage>, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages {
            Some(count) => Ok((1..=count)
                .map(|page_number| PageImage {
                    page_number,
                    png: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
                })
                .collect()),
            None => Err(OcrError::ToolFailed {
                tool: "pdftoppm",
                stderr: "Syntax Error: Couldn't read xref table".to_string(),
            }),
        }
    }
}

/// Echoes the page number back as "recognized text", optionally failing on one page.
#[derive(Default)]
pub struct FakeRecognizer {
    fail_on: Option<u32>,
}

impl FakeRecognizer {
    pub fn failing_on(page: u32) -> Self {
        Self {
            fail_on: Some(page),
        }
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize(&self, image: &PageImage) -> Result<String, OcrError> {
        if self.fail_on == Some(image.page_number) {
            return Err(OcrError::ToolFailed {
                tool: "tesseract",
                stderr: "Error in pixReadMem".to_string(),
            });
        }
        Ok(format!("recognized text of page {}", image.page_number))
    }
}
