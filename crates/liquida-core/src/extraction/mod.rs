pub mod native;
pub mod pdftotext;
pub mod table;

use crate::error::LiquidaError;
use crate::model::SourceDocument;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use table::TableRegion;

/// Content extracted from a single page of a PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContent {
    pub page_number: usize,
    pub lines: Vec<String>,
    /// Column-aligned blocks detected by the loader.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableRegion>,
}

impl PageContent {
    pub fn new(page_number: usize, lines: Vec<String>) -> Self {
        PageContent {
            page_number,
            lines,
            tables: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn has_text(&self) -> bool {
        self.lines.iter().any(|l| !l.trim().is_empty())
    }
}

/// Trait for PDF text extraction backends.
pub trait PdfExtractor: Send + Sync {
    /// Extract text content from PDF bytes, returning one PageContent per page.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, LiquidaError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Split backend text on form feeds, padding with empty pages up to
/// `page_count` when the backend reports more pages than it separated.
pub(crate) fn split_pages(text: &str, page_count: usize) -> Vec<PageContent> {
    let mut pages: Vec<PageContent> = text
        .split('\x0C')
        .enumerate()
        .map(|(i, page_text)| {
            PageContent::new(i + 1, page_text.lines().map(str::to_string).collect())
        })
        .collect();

    while pages.len() < page_count {
        pages.push(PageContent::new(pages.len() + 1, Vec::new()));
    }

    pages
}

/// Load a named buffer into an unclassified [`SourceDocument`].
///
/// Rejects buffers without a `%PDF` header and documents where no page carries
/// any text. Backend failures are reported as `UnreadableDocument` except for a
/// missing `pdftotext` binary, which is an environment problem and kept as is.
pub fn load_document(
    name: &str,
    bytes: &[u8],
    extractor: &dyn PdfExtractor,
) -> Result<SourceDocument, LiquidaError> {
    if !looks_like_pdf(bytes) {
        return Err(LiquidaError::UnreadableDocument(format!(
            "'{name}' is not a PDF file (missing %PDF header)"
        )));
    }

    let pages = extractor.extract_pages(bytes).map_err(|e| match e {
        LiquidaError::PdftotextNotFound => e,
        LiquidaError::UnreadableDocument(_) => e,
        other => LiquidaError::UnreadableDocument(other.to_string()),
    })?;

    let pages = reassemble(pages);
    if !pages.iter().any(PageContent::has_text) {
        return Err(LiquidaError::UnreadableDocument(format!(
            "'{name}' has no extractable text (scanned or empty PDF?)"
        )));
    }

    tracing::debug!(
        document = name,
        backend = extractor.backend_name(),
        pages = pages.len(),
        "loaded document"
    );

    Ok(SourceDocument::new(document_id(bytes), name.to_string(), pages))
}

/// Content digest used as the document id (same bytes, same id).
pub fn document_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..12])
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    // Some generators prepend a few bytes of garbage before the header.
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

static PAGE_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(p[aá]gina|hoja|page)\s*:?\s*\d+\s*(de|/|of)\s*\d+\s*$")
        .expect("valid footer pattern")
});

/// Put a multi-page document back together.
///
/// Drops page-footer lines, drops a header line that repeats verbatim at the
/// top of every continuation page, renumbers pages in order and detects table
/// regions on the cleaned lines.
pub fn reassemble(mut pages: Vec<PageContent>) -> Vec<PageContent> {
    pages.sort_by_key(|p| p.page_number);

    for page in &mut pages {
        page.lines.retain(|l| !PAGE_FOOTER.is_match(l));
        while page.lines.last().is_some_and(|l| l.trim().is_empty()) {
            page.lines.pop();
        }
    }

    if pages.len() > 1 {
        if let Some(header) = first_text_line(&pages[0]).map(str::to_string) {
            let repeated = pages[1..]
                .iter()
                .all(|p| first_text_line(p).is_some_and(|l| l == header));
            if repeated {
                for page in &mut pages[1..] {
                    if let Some(idx) = page.lines.iter().position(|l| l.trim() == header) {
                        page.lines.remove(idx);
                    }
                }
            }
        }
    }

    // Trailing blank pages (form feed at end of pdftotext output) carry nothing.
    while pages.len() > 1 && pages.last().is_some_and(|p| !p.has_text()) {
        pages.pop();
    }

    for (i, page) in pages.iter_mut().enumerate() {
        page.page_number = i + 1;
        page.tables = table::find_table_regions(page);
    }

    pages
}

fn first_text_line(page: &PageContent) -> Option<&str> {
    page.lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
}
