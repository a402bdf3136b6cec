// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-document: image handling and recognition engines for Lesewerk.
//
// Provides image processing (grayscale, brightness/contrast, denoise, sharpen),
// the preprocessing filter, upload validation, text normalisation, and the
// `RecognitionEngine` capability with its Tesseract (fast) and `ocrs` neural
// (fallback) implementations.

pub mod engine;
pub mod image;
pub mod scan;

pub use engine::{EngineError, RecognitionConfig, RecognitionEngine, TesseractEngine};
pub use crate::image::processor::ImageProcessor;
pub use scan::{ImageFilter, Preprocessor, normalize_text, validate_upload};

#[cfg(feature = "ocr")]
pub use engine::{ModelPaths, NeuralEngine};
