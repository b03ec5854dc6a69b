//! Error types for the loot OCR pipeline.
//!
//! Only decoding failures and an unusable OCR engine abort a pipeline run.
//! Per-configuration engine failures are recovered inside the selector, and
//! debug-artifact write failures are logged and dropped.

use std::time::Duration;

use crate::ocr::engine::EngineConfig;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures that abort a single `process()` call.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input bytes are not a decodable raster image
    #[error("could not read image: {0}")]
    Decode(#[from] image::ImageError),

    /// The OCR engine itself cannot be used (missing executable, spawn failure)
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The caller-imposed deadline elapsed before the pipeline finished
    #[error("OCR pipeline timed out after {0:?}")]
    Timeout(Duration),

    /// The thread running the pipeline exited without sending a result
    #[error("OCR worker stopped before returning a result")]
    WorkerStopped,

    /// Reading the input image from disk failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one OCR invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognitionError {
    /// The engine cannot run at all; every further attempt would fail the same way.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran but failed for this image/configuration pair.
    #[error("OCR failed with {config}: {reason}")]
    Invocation {
        config: EngineConfig,
        reason: String,
    },
}

impl From<RecognitionError> for PipelineError {
    fn from(err: RecognitionError) -> Self {
        match err {
            RecognitionError::Unavailable(reason) => PipelineError::EngineUnavailable(reason),
            other => PipelineError::EngineUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_maps_to_engine_unavailable() {
        let err: PipelineError = RecognitionError::Unavailable("tesseract not found".into()).into();
        assert!(matches!(
            err,
            PipelineError::EngineUnavailable(ref msg) if msg == "tesseract not found"
        ));
    }

    #[test]
    fn test_timeout_message_mentions_duration() {
        let err = PipelineError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "OCR pipeline timed out after 5s");
    }
}
