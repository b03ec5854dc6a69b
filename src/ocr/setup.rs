use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::config::PipelineConfig;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

#[cfg(windows)]
const COMMON_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const COMMON_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

#[cfg(windows)]
const COMMON_TESSDATA: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const COMMON_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loot-ocr")
        .join("tesseract")
}

/// Resolves the executable and the language model for a pipeline config.
///
/// Downloads `<language>.traineddata` into the local tessdata directory when
/// no copy can be found.
pub fn ensure_tesseract(config: &PipelineConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;
    let tessdata = ensure_language_data(&config.language, config.tessdata_dir.as_deref())?;

    info!(
        "Tesseract ready: {} (tessdata {})",
        executable.display(),
        tessdata.display()
    );

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable: explicit path, local dir, PATH, then common install paths.
pub fn find_tesseract_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "Configured Tesseract executable does not exist: {}",
            path.display()
        ));
    }

    let local_exe = get_tesseract_dir().join(TESSERACT_EXE);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_EXECUTABLES {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory containing `<language>.traineddata`.
pub fn find_tessdata_dir(language: &str, explicit: Option<&Path>) -> Option<PathBuf> {
    let model = traineddata_file(language);

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    candidates.push(get_tesseract_dir().join("tessdata"));

    // TESSDATA_PREFIX may point at the tessdata dir itself or its parent
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        candidates.push(PathBuf::from(&prefix));
        candidates.push(PathBuf::from(&prefix).join("tessdata"));
    }
    candidates.extend(COMMON_TESSDATA.iter().map(PathBuf::from));

    candidates.into_iter().find(|dir| dir.join(&model).exists())
}

/// Returns a tessdata directory that holds the language model, downloading it if needed.
pub fn ensure_language_data(language: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = find_tessdata_dir(language, explicit) {
        return Ok(dir);
    }

    let tessdata_dir = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| get_tesseract_dir().join("tessdata"));
    warn!(
        "{} not found, downloading into {}",
        traineddata_file(language),
        tessdata_dir.display()
    );

    fs::create_dir_all(&tessdata_dir)
        .with_context(|| format!("Failed to create {}", tessdata_dir.display()))?;
    download_tessdata(language, &tessdata_dir)?;
    Ok(tessdata_dir)
}

fn traineddata_file(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Downloads one trained-data file from the tessdata repository
fn download_tessdata(language: &str, tessdata_dir: &Path) -> Result<()> {
    let file_name = traineddata_file(language);
    let url = format!("{}/{}", TESSDATA_REPO, file_name);
    let target = tessdata_dir.join(&file_name);

    info!("Downloading {}...", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "loot-ocr")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file_name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    file.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", file_name, bytes.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_executable_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("tesseract");
        assert!(find_tesseract_executable(Some(&missing)).is_err());

        fs::write(&missing, b"").unwrap();
        assert_eq!(find_tesseract_executable(Some(&missing)).unwrap(), missing);
    }

    #[test]
    fn test_explicit_tessdata_dir_is_preferred() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("xyz.traineddata"), b"model").unwrap();

        let found = find_tessdata_dir("xyz", Some(dir.path()));
        assert_eq!(found.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_ensure_language_data_uses_existing_model() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("abc.traineddata"), b"model").unwrap();

        let resolved = ensure_language_data("abc", Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path());
    }
}
