mod commands;
mod output;

use clap::{Parser, Subcommand};
use liquida_core::Backend;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "liquida",
    version,
    about = "Turns grain settlement PDFs into sales, CPN and expense ledgers"
)]
struct Cli {
    /// Log every pipeline stage (same as RUST_LOG=liquida=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch of settlement PDFs
    Process {
        /// PDF files of the batch
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// TOML batch configuration
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Extra layout directory (repeatable), merged over the built-ins
        #[arg(short, long = "layouts", value_name = "DIR")]
        layouts: Vec<PathBuf>,

        /// Text extraction backend: pdftotext or native
        #[arg(short, long)]
        backend: Option<Backend>,

        /// Documents processed at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-file timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_secs: Option<u64>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write ventas.json, cpns.json and gastos.json to this directory
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Load, classify and extract one PDF, showing every field (layout authoring aid)
    Parse {
        /// Path to PDF file
        input_file: PathBuf,

        /// Extra layout directory (repeatable)
        #[arg(short, long = "layouts", value_name = "DIR")]
        layouts: Vec<PathBuf>,

        /// Text extraction backend: pdftotext or native
        #[arg(short, long)]
        backend: Option<Backend>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Inspect and validate layout definitions
    Layouts {
        #[command(subcommand)]
        action: LayoutsAction,
    },
}

#[derive(Subcommand)]
enum LayoutsAction {
    /// List built-in layout variants
    List,
    /// Explain how a layout recognises and reads a document
    Explain {
        /// Variant name (e.g., "afip_primaria")
        variant: String,
    },
    /// Print the layout JSON format with an example
    Schema,
    /// Validate a custom layout file
    Validate {
        /// Path to JSON layout file
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    // Directive targets match by prefix, so `liquida` covers `liquida_core`.
    let filter = if verbose {
        EnvFilter::new("liquida=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("liquida=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            files,
            config,
            layouts,
            backend,
            concurrency,
            timeout_secs,
            output,
            out_dir,
        } => {
            let overrides = commands::process::Overrides {
                layouts,
                backend,
                concurrency,
                timeout_secs,
            };
            commands::process::run(files, config, overrides, &output, out_dir).await
        }
        Commands::Parse {
            input_file,
            layouts,
            backend,
            output,
        } => commands::parse::run(input_file, layouts, backend, &output),
        Commands::Layouts { action } => match action {
            LayoutsAction::List => commands::layouts::list(),
            LayoutsAction::Explain { variant } => commands::layouts::explain(&variant),
            LayoutsAction::Schema => commands::layouts::schema(),
            LayoutsAction::Validate { file } => commands::layouts::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
