//! Loot OCR
//!
//! Extracts looted item names from screenshots of a game's drop log.
//! A screenshot is enhanced two ways (grayscale contrast and HSV color
//! filtering), read with Tesseract under several configurations, and the
//! longest recognized text is parsed for "acquired <item> from" entries.

pub mod config;
pub mod error;
pub mod ocr;
pub mod paths;
pub mod worker;

pub use config::PipelineConfig;
pub use error::{PipelineError, RecognitionError};
pub use ocr::{ExtractionStatus, LootItem, LootPipeline, Method, PipelineOutcome};
pub use worker::{WorkerHandle, spawn_loot_worker};

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Name of the log file inside the logs directory.
pub const LOG_FILE_NAME: &str = "loot_ocr.log";

/// Installs logging to both console and `<logs_dir>/loot_ocr.log`.
///
/// Level defaults to `info` and can be overridden with `RUST_LOG`. If the
/// log file cannot be opened, logging continues on the console only. Calling
/// this more than once is harmless; later calls are ignored.
pub fn init_logging(logs_dir: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file = std::fs::create_dir_all(logs_dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(LOG_FILE_NAME))
    });

    let (file_layer, file_error) = match file {
        Ok(file) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();

    if let Some(e) = file_error {
        tracing::warn!(
            "Could not open log file in {}: {}. Logging to console only.",
            logs_dir.display(),
            e
        );
    }
}
