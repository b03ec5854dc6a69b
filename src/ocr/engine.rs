use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::RecognitionError;

/// Tesseract engine-mode + page-segmentation-mode pair.
///
/// All variants use the default LSTM engine (`--oem 3`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineConfig {
    /// Single uniform block of text (`--psm 6`)
    Block,
    /// Single column of variable-size text (`--psm 4`)
    SingleColumn,
    /// Single text line (`--psm 7`)
    SingleLine,
    /// Single word (`--psm 8`)
    SingleWord,
    /// As much text as possible, in no particular order (`--psm 11`)
    SparseText,
    /// Sparse text with orientation and script detection (`--psm 12`)
    SparseTextOsd,
}

impl EngineConfig {
    /// Default sweep order. The first entry drives method selection.
    pub const ALL: &'static [EngineConfig] = &[
        EngineConfig::Block,
        EngineConfig::SingleColumn,
        EngineConfig::SingleLine,
        EngineConfig::SingleWord,
        EngineConfig::SparseText,
        EngineConfig::SparseTextOsd,
    ];

    pub fn oem(self) -> u8 {
        3
    }

    pub fn psm(self) -> u8 {
        match self {
            EngineConfig::Block => 6,
            EngineConfig::SingleColumn => 4,
            EngineConfig::SingleLine => 7,
            EngineConfig::SingleWord => 8,
            EngineConfig::SparseText => 11,
            EngineConfig::SparseTextOsd => 12,
        }
    }

    /// Short label used in log lines and artifact names.
    pub fn label(self) -> &'static str {
        match self {
            EngineConfig::Block => "block",
            EngineConfig::SingleColumn => "single_column",
            EngineConfig::SingleLine => "single_line",
            EngineConfig::SingleWord => "single_word",
            EngineConfig::SparseText => "sparse_text",
            EngineConfig::SparseTextOsd => "sparse_text_osd",
        }
    }

    /// Command-line arguments passed to the tesseract executable.
    pub fn args(self) -> [String; 4] {
        [
            "--oem".to_string(),
            self.oem().to_string(),
            "--psm".to_string(),
            self.psm().to_string(),
        ]
    }
}

impl fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (--oem {} --psm {})", self.label(), self.oem(), self.psm())
    }
}

/// OCR abstraction: one image, one configuration, raw text out.
pub trait TextRecognizer: Send + Sync {
    fn recognize(
        &self,
        image: &DynamicImage,
        config: EngineConfig,
    ) -> Result<String, RecognitionError>;
}

/// Runs the tesseract executable as a subprocess, one process per call.
///
/// Each call writes its own temp file, so concurrent calls never share state.
#[derive(Clone, Debug)]
pub struct TesseractCli {
    pub executable: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
}

impl TesseractCli {
    pub fn new(
        executable: PathBuf,
        tessdata_dir: Option<PathBuf>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            executable,
            tessdata_dir,
            language: language.into(),
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(
        &self,
        image: &DynamicImage,
        config: EngineConfig,
    ) -> Result<String, RecognitionError> {
        let invocation = |reason: String| RecognitionError::Invocation { config, reason };

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")
            .map_err(|e| invocation(format!("failed to create temp file: {}", e)))?;
        image
            .save_with_format(temp_input.path(), image::ImageFormat::Png)
            .map_err(|e| invocation(format!("failed to write temp image: {}", e)))?;

        let mut command = Command::new(&self.executable);
        command.arg(temp_input.path()).arg("stdout");
        if let Some(tessdata) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        command.arg("-l").arg(&self.language).args(config.args());

        let output = command.output().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => RecognitionError::Unavailable(
                format!("cannot run {}: {}", self.executable.display(), e),
            ),
            _ => invocation(format!("failed to spawn tesseract: {}", e)),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(invocation(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::ocr::preprocess::Method;

    /// Recognizer with canned answers per (method, config).
    ///
    /// The gray variant is single-channel and the HSV variant is RGB, which is
    /// how a call is attributed to a method.
    #[derive(Default)]
    pub struct ScriptedRecognizer {
        answers: HashMap<(Method, EngineConfig), Result<String, RecognitionError>>,
        pub calls: Mutex<Vec<(Method, EngineConfig)>>,
    }

    impl ScriptedRecognizer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn answer(mut self, method: Method, config: EngineConfig, text: &str) -> Self {
            self.answers.insert((method, config), Ok(text.to_string()));
            self
        }

        pub fn fail(mut self, method: Method, config: EngineConfig, err: RecognitionError) -> Self {
            self.answers.insert((method, config), Err(err));
            self
        }

        pub fn calls(&self) -> Vec<(Method, EngineConfig)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(
            &self,
            image: &DynamicImage,
            config: EngineConfig,
        ) -> Result<String, RecognitionError> {
            let method = match image {
                DynamicImage::ImageLuma8(_) => Method::Gray,
                _ => Method::Hsv,
            };
            self.calls.lock().unwrap().push((method, config));
            self.answers
                .get(&(method, config))
                .cloned()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }
}
