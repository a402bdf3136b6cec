// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: loads settings, builds the engines and coordinator,
// and records finished extractions in the local history.
//
// The history store is optional. When it cannot be opened, extraction still
// works and nothing is recorded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lesewerk_core::config::EngineConfig;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::{AppConfig, ExtractionOptions, ExtractionResult, PreprocessingProfile, RequestId};
use lesewerk_document::{Preprocessor, RecognitionEngine, TesseractEngine, validate_upload};
use lesewerk_extract::{Coordinator, ExtractionRequest, ProgressReporter};
use lesewerk_history::{HistoryEntry, HistoryStore, fingerprint};
use tracing::{debug, info, warn};

use super::data_dir;
use crate::cli::ExtractArgs;

pub struct AppServices {
    config: AppConfig,
    coordinator: Coordinator,
    history: Option<HistoryStore>,
}

impl AppServices {
    /// Initialise against the user's data directory.
    pub async fn init() -> Result<Self> {
        Self::init_in(data_dir::data_dir()?).await
    }

    /// Initialise against `dir`: load (or create) `config.json`, build the
    /// engines, and open the history database.
    pub async fn init_in(dir: PathBuf) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");

        let config = match load_config(&dir)? {
            Some(config) => config,
            None => {
                let config = AppConfig::default();
                persist_config(&dir, &config)?;
                info!("wrote default settings");
                config
            }
        };
        config.validate()?;

        let coordinator = build_coordinator(&config).await;

        let history = if config.history_enabled {
            match HistoryStore::open(data_dir::history_path(&dir)) {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!(error = %e, "history unavailable; results will not be recorded");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config,
            coordinator,
            history,
        })
    }

    /// Validate, extract and record one image file.
    pub async fn extract(&self, args: &ExtractArgs) -> Result<ExtractionResult> {
        let bytes = tokio::fs::read(&args.image).await?;
        let format = validate_upload(&bytes, &self.config.upload)?;
        debug!(?format, bytes = bytes.len(), "upload accepted");

        let options = self.options_for(args.profile.as_deref())?;
        let image_hash = fingerprint(&bytes);

        let (reporter, mut stream) = ProgressReporter::channel();
        let logger = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                info!(state = ?event.state, percent = event.percent, "{}", event.label);
            }
        });

        let request = ExtractionRequest::new(bytes, options).with_progress(reporter);
        let request_id = request.id;
        let outcome = self.coordinator.extract(request).await;
        if let Err(e) = logger.await {
            warn!(error = %e, "progress logger stopped early");
        }
        let result = outcome?;

        if !args.no_history {
            self.remember(request_id, &image_hash, &result);
        }
        Ok(result)
    }

    /// Request options from the settings, with `profile` overriding the
    /// configured preprocessing preset.
    pub fn options_for(&self, profile: Option<&str>) -> Result<ExtractionOptions> {
        let mut options = self.config.extraction.clone();
        let preset = match profile {
            Some(name) => Some(PreprocessingProfile::from_name(name).ok_or_else(|| {
                LesewerkError::Config(format!("unknown preprocessing profile '{name}'"))
            })?),
            None => options.preprocessing.or_else(|| self.config.default_preprocessing()),
        };
        options.preprocessing = preset.filter(|p| !p.is_noop());
        Ok(options)
    }

    /// The `limit` most recent history entries, newest first.
    pub fn recent_history(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        self.history_store()?.recent(limit)
    }

    /// Delete every history entry and return how many were removed.
    pub fn clear_history(&self) -> Result<usize> {
        let removed = self.history_store()?.clear()?;
        info!(removed, "history cleared");
        Ok(removed)
    }

    fn history_store(&self) -> Result<&HistoryStore> {
        self.history.as_ref().ok_or_else(|| {
            LesewerkError::Config(if self.config.history_enabled {
                "history database could not be opened".to_string()
            } else {
                "history is disabled in settings".to_string()
            })
        })
    }

    /// Record a finished extraction. History failures never fail the request.
    fn remember(&self, request_id: RequestId, image_hash: &str, result: &ExtractionResult) {
        let Some(history) = &self.history else {
            return;
        };
        match history.for_fingerprint(image_hash) {
            Ok(previous) if !previous.is_empty() => {
                info!(times = previous.len(), "this image was extracted before");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "history lookup failed"),
        }
        if let Err(e) = history.record(request_id, image_hash, result) {
            warn!(error = %e, "failed to record history entry");
            return;
        }
        if let Err(e) = history.prune(self.config.history_limit) {
            warn!(error = %e, "failed to prune history");
        }
    }
}

async fn build_coordinator(config: &AppConfig) -> Coordinator {
    let engines = &config.engines;
    let fast = TesseractEngine::new(engines.tesseract_binary.clone());
    if !fast.is_available().await {
        warn!(
            binary = %engines.tesseract_binary.display(),
            "tesseract not runnable; every request will need the fallback engine"
        );
    }

    let mut coordinator = Coordinator::new(Arc::new(fast))
        .with_filter(Arc::new(preprocessor_for(config)))
        .with_engine_timeout(engines.timeout());
    if engines.fallback_enabled {
        if let Some(fallback) = load_fallback(engines) {
            coordinator = coordinator.with_fallback(fallback);
        }
    } else {
        info!("fallback engine disabled in settings");
    }
    if !coordinator.has_fallback() {
        warn!("no fallback engine; low-confidence results will not be escalated");
    }
    coordinator
}

/// Enhancement accepts every image the upload check lets through.
fn preprocessor_for(config: &AppConfig) -> Preprocessor {
    Preprocessor::new(config.upload.max_dimension)
}

#[cfg(feature = "ocr")]
fn load_fallback(engines: &EngineConfig) -> Option<Arc<dyn RecognitionEngine>> {
    use lesewerk_document::{ModelPaths, NeuralEngine};

    let paths = engines
        .model_dir
        .as_ref()
        .map(ModelPaths::from_dir)
        .unwrap_or_default();
    match NeuralEngine::load(&paths) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            warn!(error = %e, "neural fallback unavailable");
            None
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn load_fallback(_engines: &EngineConfig) -> Option<Arc<dyn RecognitionEngine>> {
    debug!("built without the `ocr` feature; no fallback engine");
    None
}

// -- Config file persistence -------------------------------------------------

/// `None` when no settings file exists yet.
fn load_config(dir: &Path) -> Result<Option<AppConfig>> {
    let path = data_dir::config_path(dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|e| LesewerkError::Config(format!("{}: {e}", path.display())))
}

fn persist_config(dir: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(data_dir::config_path(dir), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use lesewerk_core::{Method, OcrErrorCode, TextStats};
    use lesewerk_document::{ImageFilter, ImageProcessor};

    /// Settings that can never reach a real OCR engine.
    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.engines.tesseract_binary = PathBuf::from("/nonexistent/lesewerk-tesseract");
        config.engines.fallback_enabled = false;
        config
    }

    async fn services_with(config: &AppConfig) -> (tempfile::TempDir, AppServices) {
        let dir = tempfile::tempdir().unwrap();
        persist_config(dir.path(), config).unwrap();
        let services = AppServices::init_in(dir.path().to_path_buf()).await.unwrap();
        (dir, services)
    }

    fn args_for(image: PathBuf) -> ExtractArgs {
        ExtractArgs {
            image,
            profile: None,
            output: None,
            json: false,
            no_history: false,
        }
    }

    #[tokio::test]
    async fn first_run_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::init_in(dir.path().to_path_buf()).await.unwrap();

        assert_eq!(&services.config, &AppConfig::default());
        let saved = load_config(dir.path()).unwrap().unwrap();
        assert_eq!(saved, AppConfig::default());
        assert!(services.history.is_some());
    }

    #[tokio::test]
    async fn malformed_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(data_dir::config_path(dir.path()), "{ not json").unwrap();

        let err = AppServices::init_in(dir.path().to_path_buf()).await.err().unwrap();
        assert!(matches!(err, LesewerkError::Config(_)));
    }

    #[tokio::test]
    async fn history_can_be_disabled() {
        let mut config = offline_config();
        config.history_enabled = false;
        let (_dir, services) = services_with(&config).await;
        assert!(services.history.is_none());
    }

    #[tokio::test]
    async fn profile_flag_overrides_default() {
        let mut config = offline_config();
        config.default_profile = "document".into();
        let (_dir, services) = services_with(&config).await;

        let default = services.options_for(None).unwrap();
        assert_eq!(default.preprocessing, Some(PreprocessingProfile::document()));

        let photo = services.options_for(Some("photo")).unwrap();
        assert_eq!(photo.preprocessing, Some(PreprocessingProfile::photo()));

        let none = services.options_for(Some("none")).unwrap();
        assert_eq!(none.preprocessing, None);

        assert!(matches!(
            services.options_for(Some("sepia")),
            Err(LesewerkError::Config(_))
        ));
    }

    #[tokio::test]
    async fn invalid_upload_is_rejected_before_extraction() {
        let (dir, services) = services_with(&offline_config()).await;
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text, not an image").unwrap();

        let err = services.extract(&args_for(path)).await.unwrap_err();
        match err {
            LesewerkError::Ocr(ocr) => assert_eq!(ocr.code, OcrErrorCode::InvalidFileType),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let (dir, services) = services_with(&offline_config()).await;
        let err = services
            .extract(&args_for(dir.path().join("absent.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, LesewerkError::Io(_)));
    }

    #[tokio::test]
    async fn unavailable_engine_surfaces_and_records_nothing() {
        let (dir, services) = services_with(&offline_config()).await;
        let png = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            32,
            32,
            Luma([200]),
        )))
        .to_png_bytes()
        .unwrap();
        let path = dir.path().join("blank.png");
        std::fs::write(&path, png).unwrap();

        let err = services.extract(&args_for(path)).await.unwrap_err();
        match err {
            LesewerkError::Ocr(ocr) => {
                assert_eq!(ocr.code, OcrErrorCode::PlatformUnsupported);
                assert!(!ocr.detail.both_methods_attempted);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(services.history.as_ref().unwrap().count().unwrap(), 0);
    }

    fn recorded(text: &str, confidence: Option<f32>) -> ExtractionResult {
        ExtractionResult {
            text: text.to_string(),
            method: Method::Fast,
            confidence,
            fallback_used: false,
            preprocessed: false,
            stats: TextStats::of(text),
        }
    }

    #[tokio::test]
    async fn history_lists_newest_first() {
        let (_dir, services) = services_with(&offline_config()).await;
        let store = services.history.as_ref().unwrap();
        for (i, text) in ["first page", "second page", "third page"].iter().enumerate() {
            store
                .record(RequestId::new(), &format!("{i:064x}"), &recorded(text, Some(80.0)))
                .unwrap();
        }

        let recent = services.recent_history(2).unwrap();
        let texts: Vec<_> = recent.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["third page", "second page"]);
        assert_eq!(services.recent_history(20).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn clear_history_removes_everything() {
        let (_dir, services) = services_with(&offline_config()).await;
        let store = services.history.as_ref().unwrap();
        store
            .record(RequestId::new(), &"a".repeat(64), &recorded("receipt", None))
            .unwrap();
        store
            .record(RequestId::new(), &"b".repeat(64), &recorded("invoice", Some(91.0)))
            .unwrap();

        assert_eq!(services.clear_history().unwrap(), 2);
        assert!(services.recent_history(20).unwrap().is_empty());
        assert_eq!(services.clear_history().unwrap(), 0);
    }

    #[tokio::test]
    async fn history_commands_fail_when_disabled() {
        let mut config = offline_config();
        config.history_enabled = false;
        let (_dir, services) = services_with(&config).await;

        assert!(matches!(
            services.recent_history(5),
            Err(LesewerkError::Config(_))
        ));
        assert!(matches!(services.clear_history(), Err(LesewerkError::Config(_))));
    }

    #[tokio::test]
    async fn missing_models_leave_no_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config();
        assert!(!build_coordinator(&config).await.has_fallback());

        config.engines.fallback_enabled = true;
        config.engines.model_dir = Some(dir.path().join("no-models-here"));
        assert!(!build_coordinator(&config).await.has_fallback());
    }

    #[test]
    fn enhancement_limit_follows_upload_limit() {
        let wide = DynamicImage::ImageLuma8(GrayImage::from_pixel(12_000, 2, Luma([180])));
        let profile = PreprocessingProfile::document();

        let mut config = offline_config();
        config.upload.max_dimension = 16_000;
        assert!(preprocessor_for(&config).apply(&wide, &profile).is_ok());

        config.upload.max_dimension = 8_000;
        let err = preprocessor_for(&config).apply(&wide, &profile).unwrap_err();
        assert_eq!(err.code, OcrErrorCode::PreprocessingFailed);
    }
}
