use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LiquidaError {
    #[error("unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("no layout signature matches this document")]
    UnclassifiedDocument,

    #[error("no extraction rules registered for layout variant '{variant}'")]
    ExtractionRuleMissing { variant: String },

    #[error("incomplete record, missing or invalid: {}", missing.join(", "))]
    IncompleteRecord { missing: Vec<String> },

    #[error("processing exceeded the {seconds}s per-file timeout")]
    Timeout { seconds: u64 },

    #[error("document worker failed: {0}")]
    WorkerFailed(String),

    #[error("failed to load layout from {path}: {reason}")]
    LayoutLoad { path: PathBuf, reason: String },

    #[error("invalid layout: {0}")]
    LayoutInvalid(String),

    #[error("invalid catalog: {0}")]
    CatalogInvalid(String),

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("batch contains no input files")]
    EmptyBatch,

    #[error("pipeline contract violated: {0}")]
    ContractViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
