use crate::error::LiquidaError;
use crate::extraction::{split_pages, PageContent, PdfExtractor};

/// In-process extraction backend built on `pdf-extract`.
///
/// Needs no external binary but keeps column alignment less faithfully than
/// `pdftotext -layout`.
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        NativeExtractor
    }
}

impl Default for NativeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for NativeExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, LiquidaError> {
        let text = pdf_extract::extract_text_from_mem(pdf_bytes)
            .map_err(|e| LiquidaError::UnreadableDocument(format!("pdf-extract: {e}")))?;

        let page_count = pdf_extract::Document::load_mem(pdf_bytes)
            .map(|doc| doc.get_pages().len())
            .unwrap_or(1);

        Ok(split_pages(&text, page_count))
    }

    fn backend_name(&self) -> &str {
        "native"
    }
}
