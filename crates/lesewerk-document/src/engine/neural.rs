// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fallback engine: neural network OCR using the `ocrs` crate, a pure-Rust
// engine whose detection and recognition models run via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// lesewerk-document = { path = "crates/lesewerk-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`): locates text regions in the image.
// - **Recognition model** (`text-recognition.rten`): decodes characters from detected regions.
//
// Running the `ocrs-cli` tool once downloads both into the default cache:
//   ```sh
//   cargo install ocrs-cli
//   ocrs some-image.png  # downloads models to ~/.cache/ocrs/
//   ```
//
// The default cache directory is `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use lesewerk_core::Recognition;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::{EngineError, RecognitionConfig, RecognitionEngine};

/// Default directory for cached OCR model files.
///
/// Follows the XDG Base Directory specification: `$XDG_CACHE_HOME/ocrs`, falling
/// back to `~/.cache/ocrs` when `XDG_CACHE_HOME` is unset.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Model locations for a [`NeuralEngine`].
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl ModelPaths {
    /// Expects the directory to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<(), EngineError> {
        for path in [&self.detection, &self.recognition] {
            if !path.exists() {
                return Err(EngineError::ModelLoad(format!(
                    "model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Neural OCR engine.
///
/// Loading the models is the expensive step, so the engine is built once and
/// shared. Inference is CPU-bound and runs on the blocking thread pool. The
/// engine does not score its output, so results carry no confidence.
pub struct NeuralEngine {
    engine: Arc<OcrsEngine>,
}

impl NeuralEngine {
    /// Load both models and initialise the engine.
    ///
    /// **Important:** `ocrs` and `rten` must be compiled in release mode;
    /// debug builds are 10-100x slower.
    #[instrument(skip_all, fields(
        detection = %paths.detection.display(),
        recognition = %paths.recognition.display(),
    ))]
    pub fn load(paths: &ModelPaths) -> Result<Self, EngineError> {
        paths.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&paths.detection).map_err(|err| {
            EngineError::ModelLoad(format!(
                "failed to load detection model from {}: {}",
                paths.detection.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model = Model::load_file(&paths.recognition).map_err(|err| {
            EngineError::ModelLoad(format!(
                "failed to load recognition model from {}: {}",
                paths.recognition.display(),
                err
            ))
        })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| EngineError::ModelLoad(format!("failed to initialise OCR engine: {}", err)))?;

        info!("Neural OCR engine initialised");
        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

#[async_trait]
impl RecognitionEngine for NeuralEngine {
    fn name(&self) -> &str {
        "ocrs"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    async fn recognize(
        &self,
        image: &DynamicImage,
        _config: &RecognitionConfig,
    ) -> Result<Recognition, EngineError> {
        let engine = Arc::clone(&self.engine);
        let rgb = image.to_rgb8();

        let text = tokio::task::spawn_blocking(move || -> Result<String, EngineError> {
            let (width, height) = rgb.dimensions();
            let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
                EngineError::Image(format!(
                    "failed to create image source ({}x{}): {}",
                    width, height, err
                ))
            })?;

            let input = engine
                .prepare_input(source)
                .map_err(|err| EngineError::Recognition(format!("input preparation failed: {}", err)))?;

            engine
                .get_text(&input)
                .map_err(|err| EngineError::Recognition(format!("text recognition failed: {}", err)))
        })
        .await
        .map_err(|err| EngineError::Recognition(format!("recognition task aborted: {}", err)))??;

        debug!(
            line_count = text.lines().count(),
            char_count = text.chars().count(),
            "Neural recognition complete"
        );
        Ok(Recognition::new(text, None))
    }
}
