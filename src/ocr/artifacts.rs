//! Best-effort persistence of intermediate images and texts.
//!
//! Every file of one pipeline run shares a stem of local timestamp plus a
//! random suffix, so concurrent runs never collide:
//! `<YYYYMMDD_HHMMSS_mmm>-<8 hex>_<label>.png|.txt`.
//! Write failures are logged and reported as `None`, never as errors.

use chrono::Local;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct ArtifactStore {
    dir: Option<PathBuf>,
    stem: String,
    written: Vec<PathBuf>,
}

impl ArtifactStore {
    /// Creates a store for one run; `None` turns every save into a no-op.
    pub fn new(dir: Option<&Path>) -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            dir: dir.map(Path::to_path_buf),
            stem: format!("{}-{}", timestamp, &suffix[..8]),
            written: Vec::new(),
        }
    }

    /// Creates a store that never writes.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Shared file-name prefix of this run.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Saves an image as `<stem>_<label>.png`.
    pub fn save_image(&mut self, image: &DynamicImage, label: &str) -> Option<PathBuf> {
        let path = self.prepare(label, "png")?;
        match image.save_with_format(&path, image::ImageFormat::Png) {
            Ok(()) => Some(self.record(path)),
            Err(e) => {
                warn!("Failed to save debug image {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Saves text as `<stem>_<label>.txt`.
    pub fn save_text(&mut self, text: &str, label: &str) -> Option<PathBuf> {
        let path = self.prepare(label, "txt")?;
        match fs::write(&path, text) {
            Ok(()) => Some(self.record(path)),
            Err(e) => {
                warn!("Failed to save debug text {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Paths written so far, in write order.
    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }

    fn prepare(&self, label: &str, extension: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Failed to create debug directory {}: {}", dir.display(), e);
            return None;
        }
        Some(dir.join(format!("{}_{}.{}", self.stem, label, extension)))
    }

    fn record(&mut self, path: PathBuf) -> PathBuf {
        info!("Saved {}", path.display());
        self.written.push(path.clone());
        path
    }
}
