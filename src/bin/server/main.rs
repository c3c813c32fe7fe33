//! Notes OCR Server and CLI
//!
//! Extracts the Notes block from engineering drawing sheets, either once from
//! the command line or as an HTTP service.
//!
//! # Usage
//!
//! ## CLI Mode
//! ```bash
//! notes-ocr-server extract --file drawing.pdf --det-model models/det.onnx --rec-model models/rec.onnx --dict-path models/dict.txt
//! ```
//!
//! ## Server Mode
//! ```bash
//! notes-ocr-server serve --det-model models/det.onnx --rec-model models/rec.onnx --dict-path models/dict.txt --port 8080
//! ```

mod cli;
mod config;
mod engine;
mod server;

use clap::{Args, Parser, Subcommand};
use notes_ocr::notes::{DEFAULT_DPI, ExtractOptions};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "notes-ocr-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Notes block extraction via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Model and pipeline settings shared by both modes.
#[derive(Args)]
struct ModelArgs {
    /// Path to the text detection model
    #[arg(long = "det-model", env = "NOTES_DET_MODEL")]
    det_model: PathBuf,

    /// Path to the text recognition model
    #[arg(long = "rec-model", env = "NOTES_REC_MODEL")]
    rec_model: PathBuf,

    /// Path to the character dictionary
    #[arg(long = "dict-path", env = "NOTES_DICT_PATH")]
    dict_path: PathBuf,

    /// Device to use (cpu, cuda, cuda:0, etc.)
    #[arg(long, default_value = "cpu", env = "NOTES_DEVICE")]
    device: String,

    /// Intra-op threads per inference session (defaults to ONNX Runtime's choice)
    #[arg(long, env = "NOTES_THREADS")]
    threads: Option<usize>,

    /// Optional JSON file overriding the pipeline settings
    #[arg(long, env = "NOTES_CONFIG")]
    config: Option<PathBuf>,
}

impl From<ModelArgs> for config::OcrConfig {
    fn from(args: ModelArgs) -> Self {
        Self {
            det_model: args.det_model,
            rec_model: args.rec_model,
            dict_path: args.dict_path,
            device: args.device,
            threads: args.threads,
            notes_config: args.config,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the Notes block from one drawing
    Extract {
        /// PDF or raster image of the drawing
        #[arg(long)]
        file: PathBuf,

        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// Render resolution in dots per inch
        #[arg(long, default_value_t = DEFAULT_DPI)]
        dpi: u32,

        /// Skip the base64 preview of the cropped region
        #[arg(long)]
        no_preview: bool,

        /// Output format (json, text, pretty)
        #[arg(long, default_value = "pretty")]
        output: String,

        #[command(flatten)]
        models: ModelArgs,
    },
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, short, default_value = "8080", env = "NOTES_PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "NOTES_HOST")]
        host: String,

        /// Per-document extraction budget in seconds
        #[arg(long = "timeout-secs", default_value_t = 600, env = "NOTES_TIMEOUT_SECS")]
        timeout_secs: u64,

        #[command(flatten)]
        models: ModelArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    notes_ocr::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            file,
            page,
            dpi,
            no_preview,
            output,
            models,
        } => {
            let options = ExtractOptions {
                page_index: page,
                dpi,
                include_preview: !no_preview,
            };
            info!("Processing file: {}", file.display());
            let config = config::OcrConfig::from(models);
            let success = tokio::task::spawn_blocking(move || {
                cli::process_file(&file, &config, &options, &output)
            })
            .await??;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Serve {
            port,
            host,
            timeout_secs,
            models,
        } => {
            let config = config::ServerConfig {
                ocr: models.into(),
                host,
                port,
                timeout_secs,
            };

            info!("Starting server on {}:{}", config.host, config.port);
            server::run_server(config).await?;
        }
    }

    Ok(())
}
