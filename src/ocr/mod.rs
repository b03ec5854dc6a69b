pub mod artifacts;
pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod select;
pub mod setup;

pub use engine::{EngineConfig, TesseractCli, TextRecognizer};
pub use extract::{LootItem, extract_items};
pub use preprocess::{EnhancementVariant, Method, enhance_gray, enhance_hsv};
pub use select::{RecognitionResult, Selection, pick_best, score, select_best};
pub use setup::ensure_tesseract;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use artifacts::ArtifactStore;

/// Whether a finished run found anything.
///
/// `Empty` is a normal outcome, distinct from a failed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionStatus {
    Found(usize),
    Empty,
}

/// Result of one screenshot run.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutcome {
    pub method: Method,
    pub config: EngineConfig,
    pub text: String,
    pub items: Vec<LootItem>,
    pub attempts: Vec<RecognitionResult>,
    pub artifacts: Vec<PathBuf>,
}

impl PipelineOutcome {
    pub fn status(&self) -> ExtractionStatus {
        if self.items.is_empty() {
            ExtractionStatus::Empty
        } else {
            ExtractionStatus::Found(self.items.len())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item names as plain strings, in order of appearance.
    pub fn item_names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.as_str().to_string()).collect()
    }

    /// Human-readable summary: method, full text and numbered items.
    pub fn report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "Method: {} ({})", self.method, self.config);
        let _ = writeln!(report);
        let _ = writeln!(report, "Full text:\n{}", self.text.trim_end());
        let _ = writeln!(report);
        match self.status() {
            ExtractionStatus::Empty => {
                let _ = writeln!(report, "No items recognized.");
            }
            ExtractionStatus::Found(count) => {
                let _ = writeln!(report, "Extracted items ({}):", count);
                for (i, item) in self.items.iter().enumerate() {
                    let _ = writeln!(report, "{}. {}", i + 1, item);
                }
            }
        }
        report
    }
}

/// Screenshot → loot items.
///
/// Cheap to clone; clones share the recognizer. Runs are independent, so one
/// pipeline can serve concurrent callers.
#[derive(Clone)]
pub struct LootPipeline {
    config: PipelineConfig,
    recognizer: Arc<dyn TextRecognizer>,
}

impl LootPipeline {
    pub fn new(config: PipelineConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { config, recognizer }
    }

    /// Builds a pipeline backed by the tesseract executable, resolving
    /// (and if needed downloading) the configured language model.
    pub fn with_tesseract(config: PipelineConfig) -> anyhow::Result<Self> {
        let paths = ensure_tesseract(&config)?;
        let engine = TesseractCli::new(
            paths.executable,
            Some(paths.tessdata),
            config.language.clone(),
        );
        Ok(Self::new(config, Arc::new(engine)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decodes an encoded image (PNG, JPEG, ...) and runs the pipeline on it.
    ///
    /// Undecodable bytes fail with [`PipelineError::Decode`] before anything
    /// is written to the debug directory.
    pub fn process(&self, image_bytes: &[u8]) -> Result<PipelineOutcome> {
        let image = image::load_from_memory(image_bytes)?;
        self.process_image(image)
    }

    /// Reads an image file from disk and runs the pipeline on it.
    pub fn process_path(&self, path: &Path) -> Result<PipelineOutcome> {
        let bytes = std::fs::read(path)?;
        self.process(&bytes)
    }

    /// Runs [`process`](Self::process) on its own thread, giving up after `timeout`.
    ///
    /// The abandoned run is not cancelled; it finishes in the background and
    /// its result is dropped.
    pub fn process_with_timeout(
        &self,
        image_bytes: Vec<u8>,
        timeout: Duration,
    ) -> Result<PipelineOutcome> {
        let (sender, receiver) = mpsc::channel();
        let pipeline = self.clone();
        thread::spawn(move || {
            let _ = sender.send(pipeline.process(&image_bytes));
        });

        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(PipelineError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::WorkerStopped),
        }
    }

    /// Runs the pipeline on an already decoded image.
    pub fn process_image(&self, image: DynamicImage) -> Result<PipelineOutcome> {
        let started = Instant::now();
        let image = DynamicImage::ImageRgb8(image.to_rgb8());
        info!("Processing screenshot {}x{}", image.width(), image.height());

        let mut artifacts = ArtifactStore::new(self.config.artifact_dir());
        artifacts.save_image(&image, "01_original");

        let variants = [enhance_gray(&image), enhance_hsv(&image)];
        artifacts.save_image(&variants[0].image, "02_gray_method");
        artifacts.save_image(&variants[1].image, "03_hsv_method");

        let selection = select_best(
            self.recognizer.as_ref(),
            &variants,
            self.config.sweep_order(),
        )?;

        for (idx, attempt) in selection.attempts.iter().enumerate() {
            let label = if idx < variants.len() {
                format!("{}_method_text", attempt.method.as_str().to_lowercase())
            } else {
                format!("sweep_{}_text", attempt.config.label())
            };
            artifacts.save_text(&attempt.text, &label);
        }

        if let Some(winner) = variants.iter().find(|v| v.method == selection.method) {
            artifacts.save_image(&winner.image, &format!("04_final_{}", selection.method));
        }
        artifacts.save_text(&selection.text, &format!("final_text_{}", selection.method));

        let items = extract_items(&selection.text);

        let mut outcome = PipelineOutcome {
            method: selection.method,
            config: selection.config,
            text: selection.text,
            items,
            attempts: selection.attempts,
            artifacts: Vec::new(),
        };
        artifacts.save_text(&outcome.report(), "final_result");
        outcome.artifacts = artifacts.into_written();

        info!(
            "Pipeline finished in {:.2?}: method {}, {} items",
            started.elapsed(),
            outcome.method,
            outcome.items.len()
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;
    use engine::testing::ScriptedRecognizer;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn solid_png() -> Vec<u8> {
        png_bytes(RgbImage::from_pixel(32, 16, Rgb([40, 40, 60])))
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            debug_dir: Some(dir.to_path_buf()),
            ..PipelineConfig::default()
        }
    }

    fn pipeline(config: PipelineConfig, recognizer: ScriptedRecognizer) -> LootPipeline {
        LootPipeline::new(config, Arc::new(recognizer))
    }

    struct SlowRecognizer(Duration);

    impl TextRecognizer for SlowRecognizer {
        fn recognize(
            &self,
            _image: &DynamicImage,
            _config: EngineConfig,
        ) -> std::result::Result<String, RecognitionError> {
            thread::sleep(self.0);
            Ok(String::new())
        }
    }

    #[test]
    fn test_corrupt_bytes_fail_with_decode_and_write_nothing() {
        let dir = tempdir().unwrap();
        let debug_dir = dir.path().join("debug");
        let pipeline = pipeline(config_in(&debug_dir), ScriptedRecognizer::new());

        let result = pipeline.process(b"definitely not an image");
        assert!(matches!(result, Err(PipelineError::Decode(_))));
        assert!(!debug_dir.exists());
    }

    #[test]
    fn test_textless_image_yields_empty_items() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline(config_in(dir.path()), ScriptedRecognizer::new());

        let outcome = pipeline.process(&solid_png()).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.status(), ExtractionStatus::Empty);
        assert_eq!(outcome.method, Method::Gray);
        assert!(outcome.report().contains("No items recognized."));
    }

    #[test]
    fn test_items_extracted_from_best_text() {
        let dir = tempdir().unwrap();
        let recognizer = ScriptedRecognizer::new()
            .answer(Method::Gray, EngineConfig::Block, "Player1 acquired")
            .answer(
                Method::Hsv,
                EngineConfig::Block,
                "[12:01] Player1 acquired Epic Sword from Venatus\n\
                 [12:02] Player2 acquired Rare Shield from Venatus",
            );
        let pipeline = pipeline(config_in(dir.path()), recognizer);

        let outcome = pipeline.process(&solid_png()).unwrap();
        assert_eq!(outcome.method, Method::Hsv);
        assert_eq!(outcome.config, EngineConfig::Block);
        assert_eq!(outcome.item_names(), vec!["Epic Sword", "Rare Shield"]);
        assert_eq!(outcome.status(), ExtractionStatus::Found(2));

        let report = outcome.report();
        assert!(report.starts_with("Method: HSV"));
        assert!(report.contains("1. Epic Sword\n2. Rare Shield\n"));
    }

    #[test]
    fn test_artifacts_written_for_every_stage() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            engine_configs: vec![EngineConfig::Block, EngineConfig::SingleLine],
            ..config_in(dir.path())
        };
        let pipeline = pipeline(config, ScriptedRecognizer::new());

        let outcome = pipeline.process(&solid_png()).unwrap();

        let names: Vec<String> = outcome
            .artifacts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        let expected_suffixes = [
            "_01_original.png",
            "_02_gray_method.png",
            "_03_hsv_method.png",
            "_gray_method_text.txt",
            "_hsv_method_text.txt",
            "_sweep_single_line_text.txt",
            "_04_final_GRAY.png",
            "_final_text_GRAY.txt",
            "_final_result.txt",
        ];
        assert_eq!(names.len(), expected_suffixes.len());
        for (name, suffix) in names.iter().zip(expected_suffixes) {
            assert!(name.ends_with(suffix), "{} should end with {}", name, suffix);
        }
        assert!(outcome.artifacts.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_artifacts_disabled() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            save_artifacts: false,
            ..config_in(dir.path())
        };
        let outcome = pipeline(config, ScriptedRecognizer::new())
            .process(&solid_png())
            .unwrap();
        assert!(outcome.artifacts.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unavailable_engine_aborts_process() {
        let recognizer = ScriptedRecognizer::new().fail(
            Method::Gray,
            EngineConfig::Block,
            RecognitionError::Unavailable("tesseract missing".into()),
        );
        let config = PipelineConfig {
            save_artifacts: false,
            ..PipelineConfig::default()
        };

        let result = pipeline(config, recognizer).process(&solid_png());
        assert!(matches!(result, Err(PipelineError::EngineUnavailable(_))));
    }

    #[test]
    fn test_process_path_missing_file() {
        let dir = tempdir().unwrap();
        let result = pipeline(config_in(dir.path()), ScriptedRecognizer::new())
            .process_path(&dir.path().join("missing.png"));
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_process_with_timeout_elapses() {
        let config = PipelineConfig {
            save_artifacts: false,
            ..PipelineConfig::default()
        };
        let slow = SlowRecognizer(Duration::from_millis(500));
        let pipeline = LootPipeline::new(config, Arc::new(slow));

        let result = pipeline.process_with_timeout(solid_png(), Duration::from_millis(20));
        assert!(matches!(result, Err(PipelineError::Timeout(_))));
    }

    #[test]
    fn test_process_with_timeout_returns_result() {
        let config = PipelineConfig {
            save_artifacts: false,
            ..PipelineConfig::default()
        };
        let pipeline = pipeline(config, ScriptedRecognizer::new());

        let outcome = pipeline
            .process_with_timeout(solid_png(), Duration::from_secs(10))
            .unwrap();
        assert!(outcome.is_empty());

        let result = pipeline.process_with_timeout(b"junk".to_vec(), Duration::from_secs(10));
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }
}
