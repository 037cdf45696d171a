//! PDF rendering capability consumed by the viewer.
//!
//! The viewer treats the engine as opaque: open a document from bytes or a
//! path, ask for page sizes, render a page bitmap at a scale and rotation,
//! and pull the page's text content for the text layer. `LopdfEngine` is the
//! default backend; it parses structure with `lopdf` and produces blank page
//! bitmaps sized to the page's media box.

use image::{ImageBuffer, Rgba};
use lopdf::Document;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// US Letter, used when a page carries no readable media box.
const FALLBACK_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

const PAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PAGE_BORDER: Rgba<u8> = Rgba([220, 220, 220, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// A single page render.
///
/// `rotation` is in degrees and must be one of 0, 90, 180 or 270; the
/// output bitmap has width and height swapped for quarter turns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
    pub rotation: u16,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0, rotation: 0 }
    }
}

impl RenderRequest {
    /// Pixel dimensions of the rendered bitmap for a page of `size`.
    pub fn output_size(&self, size: PageSize) -> (u32, u32) {
        let scale = if self.scale <= 0.0 { 1.0 } else { self.scale };
        let width = (size.width_pt * scale).round().max(1.0) as u32;
        let height = (size.height_pt * scale).round().max(1.0) as u32;

        if self.rotation % 180 == 90 {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// One run of text extracted from a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextItem {
    pub text: String,
}

/// Text content of a page, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

impl TextContent {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Concatenated text, one item per line.
    pub fn text(&self) -> String {
        self.items.iter().map(|item| item.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn text_content(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<TextContent, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    document: Document,
    page_sizes: Vec<PageSize>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(bytes: &[u8]) -> Result<DocumentRecord, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let document = Document::load_mem(bytes)?;
        let pages = document.get_pages();
        let mut page_sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = document.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(FALLBACK_PAGE_SIZE);

            page_sizes.push(size);
        }

        if page_sizes.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        Ok(DocumentRecord { document, page_sizes })
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    fn check_page(record: &DocumentRecord, page_index: u32) -> Result<(), PdfEngineError> {
        let page_count = record.page_sizes.len() as u32;
        if page_index >= page_count {
            return Err(PdfEngineError::PageOutOfRange { page: page_index, page_count });
        }
        Ok(())
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let record = Self::parse(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        debug!(handle = handle.raw(), pages = record.page_sizes.len(), "opened document");
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        Self::check_page(record, page_index)?;
        Ok(record.page_sizes[page_index as usize])
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        if request.rotation % 90 != 0 || request.rotation >= 360 {
            return Err(PdfEngineError::Backend(format!(
                "unsupported rotation {}",
                request.rotation
            )));
        }

        let page_size = self.page_size(handle, request.page_index)?;
        let (width, height) = request.output_size(page_size);

        let mut image = RgbaImage::from_pixel(width, height, PAGE_BACKGROUND);

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, PAGE_BORDER);
                image.put_pixel(x, height - 1, PAGE_BORDER);
            }
            for y in 0..height {
                image.put_pixel(0, y, PAGE_BORDER);
                image.put_pixel(width - 1, y, PAGE_BORDER);
            }
        }

        Ok(image)
    }

    fn text_content(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<TextContent, PdfEngineError> {
        let record = self.record(handle)?;
        Self::check_page(record, page_index)?;

        // lopdf numbers pages from 1.
        let text = record.document.extract_text(&[page_index + 1])?;
        let items = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextItem { text: line.to_owned() })
            .collect();

        Ok(TextContent { items })
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

#[cfg(test)]
mod tests {
    use super::testing::sample_pdf;
    use super::*;

    fn open_sample(engine: &mut LopdfEngine, pages: u32) -> DocumentHandle {
        engine
            .open(OpenSource::Bytes(sample_pdf(pages, 595.0, 842.0)))
            .expect("open should succeed")
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle = open_sample(&mut engine, 3);

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 3);
    }

    #[test]
    fn reads_media_box_size() {
        let mut engine = LopdfEngine::new();
        let handle = open_sample(&mut engine, 1);

        let size = engine.page_size(handle, 0).expect("size should succeed");
        assert_eq!(size, PageSize { width_pt: 595.0, height_pt: 842.0 });
    }

    #[test]
    fn render_swaps_dimensions_for_quarter_turns() {
        let mut engine = LopdfEngine::new();
        let handle = open_sample(&mut engine, 1);

        let upright = engine
            .render_page(handle, RenderRequest { page_index: 0, scale: 1.0, rotation: 0 })
            .expect("render should succeed");
        assert_eq!((upright.width(), upright.height()), (595, 842));

        let turned = engine
            .render_page(handle, RenderRequest { page_index: 0, scale: 2.0, rotation: 90 })
            .expect("render should succeed");
        assert_eq!((turned.width(), turned.height()), (1684, 1190));
    }

    #[test]
    fn render_rejects_odd_rotation() {
        let mut engine = LopdfEngine::new();
        let handle = open_sample(&mut engine, 1);

        let err = engine
            .render_page(handle, RenderRequest { page_index: 0, scale: 1.0, rotation: 45 })
            .expect_err("45 degrees is not a quarter turn");
        assert!(matches!(err, PdfEngineError::Backend(_)));
    }

    #[test]
    fn page_out_of_range_is_reported() {
        let mut engine = LopdfEngine::new();
        let handle = open_sample(&mut engine, 2);

        let err = engine.page_size(handle, 2).expect_err("page 2 is past the end");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 2, page_count: 2 }));
    }

    #[test]
    fn text_content_reads_page_text() {
        let mut engine = LopdfEngine::new();
        let handle = open_sample(&mut engine, 2);

        let content = engine.text_content(handle, 1).expect("text should extract");
        assert!(content.text().contains("Page"));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"not a pdf".to_vec()))
            .expect_err("garbage should not parse");

        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn encrypted_marker_is_rejected() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"%PDF-1.4\n/Encrypt 5 0 R\n".to_vec()))
            .expect_err("encrypted marker should be rejected");

        assert!(matches!(err, PdfEngineError::EncryptedUnsupported));
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn close_releases_handle() {
        let mut engine = LopdfEngine::new();
        let handle = open_sample(&mut engine, 1);

        engine.close(handle).expect("close should succeed");
        assert!(engine.page_count(handle).is_err());
    }
}
