use crate::error::LiquidaError;
use crate::extraction::{split_pages, PageContent, PdfExtractor};
use std::io::Write;
use std::path::Path;
use std::process::Command;

/// Backend that shells out to `pdftotext` from poppler-utils.
///
/// Runs with `-layout` so the two-column party boxes and the deduction
/// tables keep their character alignment, which the column sections and
/// table regions rely on.
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, LiquidaError> {
        // pdftotext only reads from a path.
        let mut tmpfile = tempfile::NamedTempFile::new()?;
        tmpfile.write_all(pdf_bytes)?;
        tmpfile.flush()?;

        let text = run_pdftotext(tmpfile.path())?;
        Ok(split_pages(&text, 0))
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

fn run_pdftotext(pdf_path: &Path) -> Result<String, LiquidaError> {
    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8", "-eol", "unix"])
        .arg(pdf_path)
        .arg("-")
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LiquidaError::PdftotextNotFound,
            _ => LiquidaError::UnreadableDocument(format!("could not run pdftotext: {e}")),
        })?;

    if !output.status.success() {
        return Err(LiquidaError::PdftotextFailed {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
