// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hybrid extraction coordinator.
//
// Runs one request through: decode → optional preprocessing → fast engine →
// confidence gate → (at most one) fallback engine. Preprocessing failures are
// recovered by using the original image; a fast-engine failure is recovered
// by escalation; only an exhausted fallback is surfaced as terminal.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use lesewerk_core::error::{OcrError, OcrErrorCode};
use lesewerk_core::{
    ExtractionResult, ExtractionState, Method, PreprocessingProfile, Recognition, RequestId,
    TextStats,
};
use lesewerk_document::{
    EngineError, ImageFilter, ImageProcessor, Preprocessor, RecognitionConfig, RecognitionEngine,
    normalize_text,
};
use tracing::{debug, error, info, instrument, warn};

use crate::gate::{ConfidenceGate, EscalationReason, GateDecision};
use crate::progress::ProgressReporter;
use crate::request::ExtractionRequest;
use crate::supersede::{Supersession, Ticket};

/// Upper bound for one engine invocation unless configured otherwise.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces one [`ExtractionResult`] per [`ExtractionRequest`].
///
/// Concurrent calls on the same coordinator follow last-write-wins: a request
/// started later supersedes earlier ones, which stop with
/// [`OcrErrorCode::Cancelled`] at their next engine checkpoint and never start
/// the fallback engine.
pub struct Coordinator {
    fast: Arc<dyn RecognitionEngine>,
    fallback: Option<Arc<dyn RecognitionEngine>>,
    filter: Arc<dyn ImageFilter>,
    engine_timeout: Duration,
    supersession: Supersession,
}

impl Coordinator {
    /// A coordinator with only a fast engine and the default preprocessor.
    pub fn new(fast: Arc<dyn RecognitionEngine>) -> Self {
        Self {
            fast,
            fallback: None,
            filter: Arc::new(Preprocessor::default()),
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
            supersession: Supersession::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn RecognitionEngine>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn ImageFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Run one request to completion.
    #[instrument(skip_all, fields(request = %request.id, bytes = request.image.len()))]
    pub async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionResult, OcrError> {
        let ticket = self.supersession.issue();
        let ExtractionRequest {
            id,
            image,
            options,
            progress,
        } = request;
        let mut run = Run::new(id, progress);

        run.enter(ExtractionState::Preprocessing, "preparing image", 5);
        let original = match ImageProcessor::from_bytes(&image) {
            Ok(processor) => processor.into_dynamic(),
            Err(err) => return Err(run.fail(err)),
        };
        let (working, preprocessed) =
            self.preprocess(original, options.preprocessing.as_ref(), &run);

        let config = RecognitionConfig {
            language: options.language.clone(),
        };
        let gate = ConfidenceGate::from_options(&options);

        run.enter(ExtractionState::FastAttempt, "rendering", 10);
        let fast_outcome = self
            .invoke(self.fast.as_ref(), &working, &config)
            .await
            .map(normalized);
        self.checkpoint(ticket, &mut run)?;
        run.report("processing", 40);

        let reason = match (gate.evaluate(&fast_outcome), fast_outcome) {
            (GateDecision::Accept, Ok(recognition)) => {
                return run.finish(Method::Fast, recognition, preprocessed);
            }
            (GateDecision::Escalate(reason), _) => reason,
            (GateDecision::Accept, Err(err)) => {
                // The gate never accepts an engine error.
                error!(%err, "gate accepted a failed fast attempt");
                return Err(run.fail(err.into()));
            }
        };
        info!(%reason, "fast result rejected");
        run.enter(ExtractionState::Escalate, "escalating", 55);

        let Some(fallback) = self.fallback.as_deref() else {
            return Err(run.fail(unescalated_error(reason)));
        };

        run.enter(ExtractionState::FallbackAttempt, "trying AI method", 60);
        let fallback_outcome = self
            .invoke(fallback, &working, &config)
            .await
            .map(normalized);
        self.checkpoint(ticket, &mut run)?;

        match fallback_outcome {
            Ok(recognition) => run
                .finish(Method::Fallback, recognition, preprocessed)
                .map_err(|err| err.with_fast_error(reason.to_string())),
            Err(err) => {
                warn!(fast = %reason, fallback = %err, "both engines failed");
                Err(run.fail(OcrError::both_methods_failed(
                    reason.to_string(),
                    err.to_string(),
                )))
            }
        }
    }

    /// Apply the request's profile to a derived image. On failure the
    /// original image is used and a diagnostic is emitted.
    fn preprocess(
        &self,
        original: DynamicImage,
        profile: Option<&PreprocessingProfile>,
        run: &Run,
    ) -> (DynamicImage, bool) {
        let Some(profile) = profile.filter(|p| !p.is_noop()) else {
            return (original, false);
        };
        match self.filter.apply(&original, profile) {
            Ok(enhanced) => (enhanced, true),
            Err(err) => {
                warn!(
                    code = %err.code,
                    detail = err.detail.source.as_deref().unwrap_or(""),
                    "preprocessing failed; continuing with the original image"
                );
                run.report("preprocessing failed, using original image", 8);
                (original, false)
            }
        }
    }

    async fn invoke(
        &self,
        engine: &dyn RecognitionEngine,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<Recognition, EngineError> {
        debug!(engine = engine.name(), "invoking engine");
        match tokio::time::timeout(self.engine_timeout, engine.recognize(image, config)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(engine = engine.name(), timeout = ?self.engine_timeout, "engine timed out");
                Err(EngineError::Timeout(self.engine_timeout))
            }
        }
    }

    fn checkpoint(&self, ticket: Ticket, run: &mut Run) -> Result<(), OcrError> {
        if self.supersession.is_current(ticket) {
            return Ok(());
        }
        info!("request superseded by a newer one");
        Err(run.fail(OcrError::superseded(format!(
            "request {} superseded by a newer upload",
            run.id
        ))))
    }
}

/// State carried through a single request.
struct Run {
    id: RequestId,
    state: ExtractionState,
    progress: ProgressReporter,
}

impl Run {
    fn new(id: RequestId, progress: ProgressReporter) -> Self {
        Self {
            id,
            state: ExtractionState::Idle,
            progress,
        }
    }

    fn enter(&mut self, next: ExtractionState, label: &str, percent: u8) {
        match self.state.advance(next) {
            Some(state) => self.state = state,
            None => {
                error!(from = ?self.state, to = ?next, "illegal extraction state transition");
                self.state = next;
            }
        }
        debug!(state = ?next, label, "extraction state");
        self.progress.report(next, label, percent);
    }

    fn report(&self, label: &str, percent: u8) {
        self.progress.report(self.state, label, percent);
    }

    fn fail(&mut self, err: OcrError) -> OcrError {
        self.enter(ExtractionState::Failed, err.code.as_str(), 100);
        err
    }

    fn finish(
        &mut self,
        method: Method,
        recognition: Recognition,
        preprocessed: bool,
    ) -> Result<ExtractionResult, OcrError> {
        if recognition.text.is_empty() {
            return Err(self.fail(OcrError::new(
                OcrErrorCode::NoTextFound,
                format!("{method} engine returned no text"),
            )));
        }
        self.enter(ExtractionState::Done, "done", 100);
        Ok(ExtractionResult {
            stats: TextStats::of(&recognition.text),
            text: recognition.text,
            method,
            confidence: recognition.confidence,
            fallback_used: method == Method::Fallback,
            preprocessed,
        })
    }
}

fn normalized(recognition: Recognition) -> Recognition {
    Recognition {
        text: normalize_text(&recognition.text),
        confidence: recognition.confidence,
    }
}

/// The error surfaced when the fast result is rejected and there is no
/// fallback engine to escalate to.
fn unescalated_error(reason: EscalationReason) -> OcrError {
    match reason {
        EscalationReason::EngineFailed(err) => err.into(),
        EscalationReason::TooShort { length: 0, .. } => {
            OcrError::new(OcrErrorCode::NoTextFound, reason.to_string())
        }
        other => OcrError::new(OcrErrorCode::LowQualityResult, other.to_string()),
    }
}
