//! Candidate selection: method choice followed by an engine-config sweep.
//!
//! Both levels rank text by [`score`], its character count after trimming
//! surrounding whitespace. The common failure on low-contrast input is
//! near-empty output, so longer text is treated as better recognition.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::engine::{EngineConfig, TextRecognizer};
use super::preprocess::{EnhancementVariant, Method};
use crate::error::RecognitionError;

/// Raw OCR output for one candidate image under one configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub method: Method,
    pub config: EngineConfig,
    pub text: String,
}

/// Outcome of both selection levels.
#[derive(Clone, Debug, Serialize)]
pub struct Selection {
    pub method: Method,
    pub config: EngineConfig,
    pub text: String,
    /// Every recognition attempt in the order it ran
    pub attempts: Vec<RecognitionResult>,
}

/// Length of the text with surrounding whitespace removed.
pub fn score(text: &str) -> usize {
    text.trim().chars().count()
}

/// Index of the highest-scoring candidate; the earliest wins ties.
///
/// Returns `None` only for an empty slice.
pub fn pick_best<T>(candidates: &[T], score: impl Fn(&T) -> usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let s = score(candidate);
        match best {
            Some((_, best_score)) if s <= best_score => {}
            _ => best = Some((idx, s)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Runs one OCR call, turning a per-call failure into empty text.
///
/// Only an unusable engine is returned as an error.
pub fn recognize_or_empty(
    recognizer: &dyn TextRecognizer,
    variant: &EnhancementVariant,
    config: EngineConfig,
) -> Result<RecognitionResult, RecognitionError> {
    let text = match recognizer.recognize(&variant.image, config) {
        Ok(text) => text,
        Err(RecognitionError::Invocation { reason, .. }) => {
            warn!(
                "OCR failed for {} with {}: {}; continuing with empty text",
                variant.method, config, reason
            );
            String::new()
        }
        Err(err) => return Err(err),
    };

    debug!(
        "OCR {} with {}: {} characters",
        variant.method,
        config,
        score(&text)
    );

    Ok(RecognitionResult {
        method: variant.method,
        config,
        text,
    })
}

/// Picks the best variant under `configs[0]`, then sweeps the remaining configs on it.
///
/// An empty `configs` falls back to [`EngineConfig::ALL`].
///
/// # Panics
/// Panics if `variants` is empty.
pub fn select_best(
    recognizer: &dyn TextRecognizer,
    variants: &[EnhancementVariant],
    configs: &[EngineConfig],
) -> Result<Selection, RecognitionError> {
    select_best_with(recognizer, variants, configs, score)
}

/// [`select_best`] with a caller-supplied scoring function.
pub fn select_best_with(
    recognizer: &dyn TextRecognizer,
    variants: &[EnhancementVariant],
    configs: &[EngineConfig],
    score: impl Fn(&str) -> usize,
) -> Result<Selection, RecognitionError> {
    assert!(!variants.is_empty(), "select_best needs at least one variant");
    let configs = if configs.is_empty() {
        EngineConfig::ALL
    } else {
        configs
    };

    // Level 1: same config on every variant
    let first_config = configs[0];
    let mut attempts = Vec::with_capacity(variants.len() + configs.len() - 1);
    for variant in variants {
        attempts.push(recognize_or_empty(recognizer, variant, first_config)?);
    }

    let winner = pick_best(&attempts, |r| score(&r.text)).unwrap_or(0);
    let variant = &variants[winner];
    let mut best = attempts[winner].clone();
    info!(
        "Selected {} method ({} characters with {})",
        best.method,
        score(&best.text),
        first_config
    );

    // Level 2: sweep the remaining configs, replacing only on strict improvement
    for &config in &configs[1..] {
        let attempt = recognize_or_empty(recognizer, variant, config)?;
        if score(&attempt.text) > score(&best.text) {
            info!(
                "{} improved recognition: {} -> {} characters",
                config,
                score(&best.text),
                score(&attempt.text)
            );
            best = attempt.clone();
        }
        attempts.push(attempt);
    }

    Ok(Selection {
        method: best.method,
        config: best.config,
        text: best.text,
        attempts,
    })
}
