use liquida_core::config::Backend;
use liquida_core::layouts::{builtin, LayoutRegistry};
use std::path::PathBuf;

use crate::output;

pub fn run(
    pdf_file: PathBuf,
    layout_dirs: Vec<PathBuf>,
    backend: Option<Backend>,
    output_format: &str,
) -> Result<(), liquida_core::error::LiquidaError> {
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let registry = LayoutRegistry::load(&layout_dirs)?;
    let catalog = builtin::catalog()?;
    let extractor = backend.unwrap_or_default().extractor();

    let name = pdf_file.display().to_string();
    let (doc, result) =
        liquida_core::parse_pdf(&name, &pdf_bytes, extractor.as_ref(), &registry, &catalog)?;
    let normalized = liquida_core::normalize::normalize(&doc, &result, &catalog);

    match output_format {
        "json" => output::json::print(&serde_json::json!({
            "file": doc.name(),
            "kind": doc.kind(),
            "variant": doc.variant(),
            "extraction": result,
            "records": normalized.as_ref().ok(),
            "error": normalized.as_ref().err().map(|e| e.to_string()),
        }))?,
        _ => print!("{}", output::table::format_extraction(&doc, &result, &normalized)),
    }

    Ok(())
}
