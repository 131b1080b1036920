use liquida_core::config::{load_config, Backend, BatchConfig};
use liquida_core::error::LiquidaError;
use liquida_core::{export, BatchInput, Pipeline};
use std::path::{Path, PathBuf};

use crate::output;

/// Command-line settings; each one that is set wins over the config file.
pub struct Overrides {
    pub layouts: Vec<PathBuf>,
    pub backend: Option<Backend>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &mut BatchConfig) {
        config.layout_dirs.extend(self.layouts);
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency.max(1);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
    }
}

pub async fn run(
    files: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    overrides: Overrides,
    output_format: &str,
    out_dir: Option<PathBuf>,
) -> Result<(), LiquidaError> {
    let mut config = match &config_file {
        Some(path) => load_config(path)?,
        None => BatchConfig::default(),
    };
    overrides.apply(&mut config);
    tracing::debug!(?config, "effective configuration");

    let pipeline = Pipeline::from_config(config)?;

    let mut inputs = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = std::fs::read(path)?;
        inputs.push(BatchInput::new(display_name(path), bytes));
    }

    let result = pipeline.run_batch(inputs).await?;

    if let Some(dir) = out_dir {
        let exports = export::project(&result);
        std::fs::create_dir_all(&dir)?;
        output::json::write(&dir.join("ventas.json"), &exports.ventas)?;
        output::json::write(&dir.join("cpns.json"), &[&exports.cpns, &exports.mercaderia])?;
        output::json::write(&dir.join("gastos.json"), &exports.gastos)?;
        eprintln!(
            "Wrote {} venta row(s), {} CPN row(s), {} gasto row(s) to {}",
            exports.ventas.rows.len(),
            exports.cpns.rows.len(),
            exports.gastos.rows.len(),
            dir.display()
        );
    }

    match output_format {
        "json" => output::json::print(&result)?,
        _ => output::table::print_batch(&result),
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
