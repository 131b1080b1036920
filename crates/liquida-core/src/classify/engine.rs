use crate::error::LiquidaError;
use crate::layouts::LayoutRegistry;
use crate::model::{ClassifiedDocument, SourceDocument};
use crate::parsing::text::fold;

/// Decide the kind and layout variant of a loaded document.
///
/// Signatures are evaluated against the folded first page in ascending
/// priority; the first match wins.
pub fn classify(
    doc: SourceDocument,
    registry: &LayoutRegistry,
) -> Result<ClassifiedDocument, LiquidaError> {
    let first_page = fold(&doc.first_page_text());
    let page_count = doc.page_count();

    let Some(layout) = registry
        .iter()
        .find(|l| l.signature_matches(&first_page, page_count))
    else {
        return Err(LiquidaError::UnclassifiedDocument);
    };

    tracing::debug!(
        document = %doc.name(),
        variant = %layout.variant(),
        kind = ?layout.def().kind,
        "classified"
    );
    let kind = layout.def().kind;
    let variant = layout.variant().to_string();
    Ok(ClassifiedDocument::new(doc, kind, variant))
}

/// Every variant whose signature accepts the document, in priority order.
/// More than one entry means two signatures overlap.
pub fn matching_variants<'r>(doc: &SourceDocument, registry: &'r LayoutRegistry) -> Vec<&'r str> {
    let first_page = fold(&doc.first_page_text());
    registry
        .iter()
        .filter(|l| l.signature_matches(&first_page, doc.page_count()))
        .map(|l| l.variant())
        .collect()
}
