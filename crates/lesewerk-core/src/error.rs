// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lesewerk.
//
// Two layers: `OcrError` is the user-facing, request-scoped failure carrying a
// machine-readable code. `LesewerkError` covers infrastructure (I/O, storage,
// config) around the extraction core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::human_errors::humanize_code;

/// Machine-readable failure codes for a single extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrErrorCode {
    FileTooLarge,
    InvalidFileType,
    CorruptedFile,
    NoTextFound,
    LowQualityResult,
    ProcessingFailed,
    Timeout,
    /// Always recovered locally by falling back to the unmodified image.
    PreprocessingFailed,
    ImageLoadFailed,
    ModelLoadFailed,
    NetworkError,
    /// The engine cannot run on this host (binary missing, feature disabled).
    PlatformUnsupported,
    OutOfMemory,
    /// A newer request superseded this one.
    Cancelled,
}

impl OcrErrorCode {
    /// Stable kebab-case identifier, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileTooLarge => "file-too-large",
            Self::InvalidFileType => "invalid-file-type",
            Self::CorruptedFile => "corrupted-file",
            Self::NoTextFound => "no-text-found",
            Self::LowQualityResult => "low-quality-result",
            Self::ProcessingFailed => "processing-failed",
            Self::Timeout => "timeout",
            Self::PreprocessingFailed => "preprocessing-failed",
            Self::ImageLoadFailed => "image-load-failed",
            Self::ModelLoadFailed => "model-load-failed",
            Self::NetworkError => "network-error",
            Self::PlatformUnsupported => "platform-unsupported",
            Self::OutOfMemory => "out-of-memory",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OcrErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Technical payload attached to an [`OcrError`] for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDetail {
    /// Raw detail for single-cause failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Error raised by the fast engine, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_error: Option<String>,
    /// Error raised by the fallback engine, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_error: Option<String>,
    /// Set only when both independent engines were exhausted.
    pub both_methods_attempted: bool,
}

/// A request-scoped extraction failure.
///
/// Created once and never mutated. `message` is plain English suitable for
/// display; `detail` is for logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} [{code}]")]
pub struct OcrError {
    pub code: OcrErrorCode,
    pub message: String,
    pub detail: TechnicalDetail,
    pub recoverable: bool,
}

impl OcrError {
    /// Build an error for `code`, taking the message and recoverability from
    /// the human error table.
    pub fn new(code: OcrErrorCode, source: impl Into<String>) -> Self {
        let human = humanize_code(code);
        Self {
            code,
            message: human.message,
            detail: TechnicalDetail {
                source: Some(source.into()),
                ..TechnicalDetail::default()
            },
            recoverable: human.retriable,
        }
    }

    /// Aggregated terminal failure after both engines were tried.
    pub fn both_methods_failed(fast_error: impl Into<String>, fallback_error: impl Into<String>) -> Self {
        Self {
            code: OcrErrorCode::ProcessingFailed,
            message: "We couldn't read any text from this image, even with the slower AI method."
                .into(),
            detail: TechnicalDetail {
                source: None,
                fast_error: Some(fast_error.into()),
                fallback_error: Some(fallback_error.into()),
                both_methods_attempted: true,
            },
            recoverable: false,
        }
    }

    /// The request lost to a newer one before it finished.
    pub fn superseded(detail: impl Into<String>) -> Self {
        Self::new(OcrErrorCode::Cancelled, detail)
    }

    /// Attach the fast engine's error to an error raised later in the request.
    pub fn with_fast_error(mut self, fast_error: impl Into<String>) -> Self {
        self.detail.fast_error = Some(fast_error.into());
        self
    }
}

/// Infrastructure error type for everything around the extraction core.
#[derive(Debug, Error)]
pub enum LesewerkError {
    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LesewerkError>;
