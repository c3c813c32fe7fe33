//! CLI mode for notes extraction.

use crate::config::OcrConfig;
use crate::engine::{NotesEngine, NotesProcessor, NotesResponse, ServiceError};
use notes_ocr::notes::{ExtractOptions, ExtractionResult};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Extracts the Notes block from a local file and prints it.
///
/// Returns whether the extraction succeeded.
pub fn process_file(
    path: &Path,
    config: &OcrConfig,
    options: &ExtractOptions,
    output_format: &str,
) -> Result<bool, ServiceError> {
    let start = Instant::now();
    let file_size = std::fs::metadata(path)?.len() as usize;

    info!("Initializing extraction engine...");
    let engine = NotesEngine::new(config)?;
    let init_time = start.elapsed();
    info!("Engine initialized in {:.2}ms", init_time.as_secs_f64() * 1000.0);

    info!(
        "Extracting notes from page {} at {} dpi...",
        options.page_index, options.dpi
    );
    let extract_start = Instant::now();
    let result = engine.process(path, options);
    let processing_time = extract_start.elapsed().as_secs_f64();
    info!("Extraction finished in {:.2}ms", processing_time * 1000.0);

    let success = result.success;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_result(
        NotesResponse {
            result,
            filename,
            file_size,
            processing_time,
        },
        output_format,
    )?;

    Ok(success)
}

/// Prints the result in the requested format.
fn output_result(response: NotesResponse, format: &str) -> Result<(), ServiceError> {
    match format {
        "json" => {
            let json = serde_json::to_string(&response)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
            println!("{json}");
        }
        "text" => match &response.result.notes_text {
            Some(text) => println!("{text}"),
            None => eprintln!("{}", failure_message(&response.result)),
        },
        _ => {
            let result = &response.result;
            println!("\n=== Notes Extraction ===");
            println!("File: {} ({} bytes)", response.filename, response.file_size);
            println!("Processing time: {:.2}ms", response.processing_time * 1000.0);
            if let Some(orientation) = result.orientation {
                println!("Orientation: {orientation}");
            }
            if let Some([x0, y0, x1, y1]) = result.crop_bbox {
                println!("Crop region: [{x0}, {y0}] - [{x1}, {y1}]");
            }
            println!();

            if result.success {
                let lines = result.lines();
                println!("--- Notes ({} lines) ---", lines.len());
                for line in lines {
                    println!("{line}");
                }
            } else {
                println!("Extraction failed: {}", failure_message(result));
            }
        }
    }

    Ok(())
}

fn failure_message(result: &ExtractionResult) -> &str {
    result.error.as_deref().unwrap_or("unknown error")
}
