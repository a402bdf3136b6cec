// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LesewerkError, Result};
use crate::types::{ExtractionOptions, PreprocessingProfile};

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default options for new extraction requests.
    pub extraction: ExtractionOptions,
    /// Name of the preprocessing preset applied when the request has none.
    pub default_profile: String,
    pub engines: EngineConfig,
    pub upload: UploadLimits,
    /// Record every successful extraction in the local history.
    pub history_enabled: bool,
    /// Number of history entries kept; older ones are pruned.
    pub history_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionOptions::default(),
            default_profile: "none".into(),
            engines: EngineConfig::default(),
            upload: UploadLimits::default(),
            history_enabled: true,
            history_limit: 50,
        }
    }
}

impl AppConfig {
    /// Reject values the extraction core cannot work with.
    pub fn validate(&self) -> Result<()> {
        let min = self.extraction.min_confidence;
        if !(0.0..=100.0).contains(&min) {
            return Err(LesewerkError::Config(format!(
                "min_confidence must be within 0..=100, got {min}"
            )));
        }
        if PreprocessingProfile::from_name(&self.default_profile).is_none() {
            return Err(LesewerkError::Config(format!(
                "unknown preprocessing profile '{}'",
                self.default_profile
            )));
        }
        if self.engines.timeout_secs == 0 {
            return Err(LesewerkError::Config("engine timeout must be at least 1s".into()));
        }
        if self.upload.max_file_bytes == 0 || self.upload.max_dimension == 0 {
            return Err(LesewerkError::Config("upload limits must be non-zero".into()));
        }
        Ok(())
    }

    /// The configured default preset, or no preprocessing when it is `none`.
    pub fn default_preprocessing(&self) -> Option<PreprocessingProfile> {
        PreprocessingProfile::from_name(&self.default_profile).filter(|p| !p.is_noop())
    }
}

/// Engine wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path or name of the `tesseract` executable.
    pub tesseract_binary: PathBuf,
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// `None` uses the default model cache.
    pub model_dir: Option<PathBuf>,
    /// Upper bound for a single engine invocation.
    pub timeout_secs: u64,
    /// Whether the neural fallback engine is used at all.
    pub fallback_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tesseract_binary: PathBuf::from("tesseract"),
            model_dir: None,
            timeout_secs: 60,
            fallback_enabled: true,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Limits enforced on uploaded images before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    /// Largest accepted width or height in pixels.
    pub max_dimension: u32,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_dimension: 10_000,
        }
    }
}
