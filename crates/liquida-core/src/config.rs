use crate::error::LiquidaError;
use crate::extraction::native::NativeExtractor;
use crate::extraction::pdftotext::PdftotextExtractor;
use crate::extraction::PdfExtractor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Text extraction backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Pdftotext,
    Native,
}

impl Backend {
    pub fn extractor(self) -> Arc<dyn PdfExtractor> {
        match self {
            Backend::Pdftotext => Arc::new(PdftotextExtractor::new()),
            Backend::Native => Arc::new(NativeExtractor::new()),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdftotext" => Ok(Backend::Pdftotext),
            "native" => Ok(Backend::Native),
            other => Err(format!("unknown backend '{other}' (expected pdftotext or native)")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Pdftotext => write!(f, "pdftotext"),
            Backend::Native => write!(f, "native"),
        }
    }
}

/// Batch settings. Every key is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Documents processed at the same time.
    pub concurrency: usize,
    /// Per-file budget for load, extraction and normalization.
    pub timeout_secs: u64,
    /// Directories with extra `*.json` layouts, merged over the built-ins.
    pub layout_dirs: Vec<PathBuf>,
    pub backend: Backend,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            concurrency: 4,
            timeout_secs: 60,
            layout_dirs: Vec::new(),
            backend: Backend::default(),
        }
    }
}

impl BatchConfig {
    pub fn parse_str(toml_str: &str, source: &Path) -> Result<Self, LiquidaError> {
        let config: BatchConfig =
            toml::from_str(toml_str).map_err(|e| LiquidaError::ConfigLoad {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })?;
        config.validate().map_err(|reason| LiquidaError::ConfigLoad {
            path: source.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Settings that would make every batch fail.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".into());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".into());
        }
        Ok(())
    }
}

/// Load a TOML batch configuration.
pub fn load_config(path: &Path) -> Result<BatchConfig, LiquidaError> {
    let content = std::fs::read_to_string(path).map_err(|e| LiquidaError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    BatchConfig::parse_str(&content, path)
}
