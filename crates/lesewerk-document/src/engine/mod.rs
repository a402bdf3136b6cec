// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition engines: the capability shared by the fast and fallback
// engines, and its concrete implementations.

use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use lesewerk_core::error::{OcrError, OcrErrorCode};
use lesewerk_core::Recognition;
use thiserror::Error;

pub mod tesseract;

#[cfg(feature = "ocr")]
pub mod neural;

pub use tesseract::TesseractEngine;

#[cfg(feature = "ocr")]
pub use neural::{ModelPaths, NeuralEngine};

/// Settings passed to an engine for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// Tesseract-style language code (`eng`, `deu+eng`). Engines that are
    /// language-agnostic ignore it.
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "eng".into(),
        }
    }
}

/// Why a single engine invocation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{engine} is not available: {detail}")]
    Unavailable { engine: String, detail: String },

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("engine could not read the image: {0}")]
    Image(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

impl EngineError {
    /// The taxonomy code this failure surfaces as.
    pub fn code(&self) -> OcrErrorCode {
        match self {
            Self::Unavailable { .. } => OcrErrorCode::PlatformUnsupported,
            Self::ModelLoad(_) => OcrErrorCode::ModelLoadFailed,
            Self::Image(_) => OcrErrorCode::ImageLoadFailed,
            Self::Recognition(_) => OcrErrorCode::ProcessingFailed,
            Self::Timeout(_) => OcrErrorCode::Timeout,
            Self::OutOfMemory(_) => OcrErrorCode::OutOfMemory,
        }
    }
}

impl From<EngineError> for OcrError {
    fn from(err: EngineError) -> Self {
        OcrError::new(err.code(), err.to_string())
    }
}

/// A text recognition backend.
///
/// Both the fast engine and the neural fallback implement this; the
/// coordinator decides which one runs.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Short name used in logs and error details.
    fn name(&self) -> &str;

    /// Recognise all text in `image`.
    ///
    /// `confidence` in the returned [`Recognition`] is `None` when the engine
    /// does not score its output.
    async fn recognize(
        &self,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<Recognition, EngineError>;
}
