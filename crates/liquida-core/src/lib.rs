pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod extraction;
pub mod layouts;
pub mod model;
pub mod normalize;
pub mod parsing;
pub mod pipeline;

use error::LiquidaError;
use extraction::PdfExtractor;
use layouts::catalog::Catalog;
use layouts::LayoutRegistry;
use model::{ClassifiedDocument, NormalizedDocument};
use parsing::result::ExtractionResult;

pub use aggregate::{Aggregator, BatchResult, SkipReason, SkippedDocument};
pub use config::{BatchConfig, Backend};
pub use export::Exports;
pub use pipeline::{BatchInput, Pipeline};

/// Load, classify and extract one PDF without normalizing it.
///
/// Returns the classified document together with every field the layout
/// declares, valid or not. Used to author and debug layouts.
pub fn parse_pdf(
    name: &str,
    pdf_bytes: &[u8],
    extractor: &dyn PdfExtractor,
    registry: &LayoutRegistry,
    catalog: &Catalog,
) -> Result<(ClassifiedDocument, ExtractionResult), LiquidaError> {
    let source = extraction::load_document(name, pdf_bytes, extractor)?;
    let doc = classify::classify(source, registry)?;
    let result = parsing::extract(&doc, registry, catalog)?;
    Ok((doc, result))
}

/// Run one PDF through every per-document stage.
pub fn process_pdf(
    name: &str,
    pdf_bytes: &[u8],
    extractor: &dyn PdfExtractor,
    registry: &LayoutRegistry,
    catalog: &Catalog,
) -> Result<NormalizedDocument, LiquidaError> {
    let (doc, result) = parse_pdf(name, pdf_bytes, extractor, registry, catalog)?;
    normalize::normalize(&doc, &result, catalog)
}
