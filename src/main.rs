//! Loot OCR command-line tool
//!
//! Reads a drop-log screenshot from disk, runs the OCR pipeline and prints
//! the recognized loot items.

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::process::ExitCode;

use loot_ocr::{ExtractionStatus, LootPipeline, PipelineConfig, PipelineError, paths};

const USAGE: &str = "\
Usage:
  loot-ocr <image> [options]
  loot-ocr --write-default-config <file>

Options:
  --config <file>       Config JSON (default: config.json next to the executable)
  --debug-dir <dir>     Write intermediate images and texts here
  --no-artifacts        Do not write debug artifacts
  --lang <code>         Tesseract language model (default: eng)
  --timeout-ms <n>      Give up after n milliseconds
  --json                Print the result as JSON
  -h, --help            Show this help";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    image: Option<PathBuf>,
    config: Option<PathBuf>,
    debug_dir: Option<PathBuf>,
    no_artifacts: bool,
    language: Option<String>,
    timeout_ms: Option<u64>,
    json: bool,
    write_default_config: Option<PathBuf>,
    help: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{} requires a value", name))
            };
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--json" => parsed.json = true,
                "--no-artifacts" => parsed.no_artifacts = true,
                "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
                "--debug-dir" => parsed.debug_dir = Some(PathBuf::from(value("--debug-dir")?)),
                "--lang" => parsed.language = Some(value("--lang")?),
                "--timeout-ms" => {
                    let raw = value("--timeout-ms")?;
                    let ms = raw
                        .parse()
                        .with_context(|| format!("invalid --timeout-ms value: {}", raw))?;
                    parsed.timeout_ms = Some(ms);
                }
                "--write-default-config" => {
                    parsed.write_default_config =
                        Some(PathBuf::from(value("--write-default-config")?))
                }
                other if other.starts_with('-') => return Err(anyhow!("unknown option: {}", other)),
                other => {
                    if parsed.image.is_some() {
                        return Err(anyhow!("only one image can be processed at a time"));
                    }
                    parsed.image = Some(PathBuf::from(other));
                }
            }
        }

        Ok(parsed)
    }

    /// Applies command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.debug_dir {
            config.debug_dir = Some(dir.clone());
            config.save_artifacts = true;
        }
        if self.no_artifacts {
            config.save_artifacts = false;
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Warning: could not create output directories: {}", e);
    }
    loot_ocr::init_logging(&paths::get_logs_dir());

    match run() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = CliArgs::parse(std::env::args().skip(1))?;

    if args.help {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(path) = &args.write_default_config {
        PipelineConfig::save_default(path)?;
        println!("Default config written to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let image_path = args
        .image
        .clone()
        .ok_or_else(|| anyhow!("no image given\n\n{}", USAGE))?;

    let config_path = args.config.clone().unwrap_or_else(paths::get_config_path);
    let mut config = PipelineConfig::load(&config_path);
    args.apply(&mut config);

    tracing::info!("Input file: {}", image_path.display());
    if let Some(dir) = config.artifact_dir() {
        tracing::info!("Debug directory: {}", dir.display());
    }

    let timeout = config.timeout();
    let pipeline = LootPipeline::with_tesseract(config).context("Failed to set up Tesseract")?;

    let bytes = std::fs::read(&image_path)
        .with_context(|| format!("Failed to read {}", image_path.display()))?;

    let outcome = match pipeline.process_with_timeout(bytes, timeout) {
        Ok(outcome) => outcome,
        Err(PipelineError::Decode(e)) => {
            eprintln!("Could not read image {}: {}", image_path.display(), e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Processing failed"),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?;
        println!("{}", json);
    } else {
        print!("{}", outcome.report());
        if let ExtractionStatus::Found(count) = outcome.status() {
            println!("Found {} items", count);
        }
        if !outcome.artifacts.is_empty() {
            println!("Debug artifacts: {} files", outcome.artifacts.len());
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_image_and_flags() {
        let args = parse(&["shot.png", "--json", "--lang", "rus", "--timeout-ms", "1500"]).unwrap();
        assert_eq!(args.image, Some(PathBuf::from("shot.png")));
        assert!(args.json);
        assert_eq!(args.language.as_deref(), Some("rus"));
        assert_eq!(args.timeout_ms, Some(1500));
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing_values() {
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["shot.png", "--config"]).is_err());
        assert!(parse(&["--timeout-ms", "soon"]).is_err());
        assert!(parse(&["a.png", "b.png"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let args = parse(&["x.png", "--debug-dir", "out", "--lang", "deu"]).unwrap();
        let mut config = PipelineConfig {
            save_artifacts: false,
            ..PipelineConfig::default()
        };
        args.apply(&mut config);
        assert_eq!(config.language, "deu");
        assert_eq!(config.artifact_dir(), Some(std::path::Path::new("out")));

        let args = parse(&["x.png", "--no-artifacts"]).unwrap();
        args.apply(&mut config);
        assert!(config.artifact_dir().is_none());
    }
}
