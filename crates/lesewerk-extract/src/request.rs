// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction request.

use std::sync::Arc;

use lesewerk_core::{ExtractionOptions, RequestId};

use crate::progress::ProgressReporter;

/// One image plus the options it is extracted with.
///
/// The image bytes are shared and never modified; preprocessing always works
/// on a derived copy.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub id: RequestId,
    pub image: Arc<[u8]>,
    pub options: ExtractionOptions,
    pub progress: ProgressReporter,
}

impl ExtractionRequest {
    pub fn new(image: impl Into<Arc<[u8]>>, options: ExtractionOptions) -> Self {
        Self {
            id: RequestId::new(),
            image: image.into(),
            options,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }
}
