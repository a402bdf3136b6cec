// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fast engine: the Tesseract command-line tool.
//
// The image is piped to `tesseract stdin stdout ... tsv` as PNG. TSV output
// carries a per-word confidence, which is averaged into the request-level
// score the confidence gate needs.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::DynamicImage;
use lesewerk_core::Recognition;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::{EngineError, RecognitionConfig, RecognitionEngine};
use crate::image::processor::ImageProcessor;

/// Page segmentation mode 3: fully automatic, no orientation detection.
const PAGE_SEGMENTATION_MODE: &str = "3";

/// Tesseract CLI wrapper.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check whether the binary can be executed.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height(), lang = %config.language))]
    async fn recognize(
        &self,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<Recognition, EngineError> {
        let png = ImageProcessor::from_dynamic(image.clone())
            .to_png_bytes()
            .map_err(|err| EngineError::Image(err.to_string()))?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", config.language.as_str()])
            .args(["--psm", PAGE_SEGMENTATION_MODE, "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    EngineError::Unavailable {
                        engine: self.binary.display().to_string(),
                        detail: err.to_string(),
                    }
                }
                _ => EngineError::Recognition(format!("failed to run tesseract: {}", err)),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A broken pipe means tesseract exited early; its stderr explains why.
            if let Err(err) = stdin.write_all(&png).await {
                warn!(%err, "Failed to stream image to tesseract");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| EngineError::Recognition(format!("tesseract did not finish: {}", err)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let recognition = parse_tsv(&tsv);
        info!(
            chars = recognition.char_count(),
            confidence = ?recognition.confidence,
            "Tesseract recognition complete"
        );
        Ok(recognition)
    }
}

/// Map tesseract's stderr onto an engine error.
fn classify_failure(stderr: &str) -> EngineError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("failed loading language") || lower.contains("could not initialize tesseract") {
        EngineError::ModelLoad(stderr.to_string())
    } else if lower.contains("out of memory") || lower.contains("bad_alloc") {
        EngineError::OutOfMemory(stderr.to_string())
    } else if lower.contains("image") && (lower.contains("read") || lower.contains("unsupported")) {
        EngineError::Image(stderr.to_string())
    } else {
        EngineError::Recognition(format!("tesseract failed: {}", stderr))
    }
}

/// Rebuild text and a mean word confidence from tesseract TSV output.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. Only level-5 (word) rows carry text. Words on
/// the same line are joined by spaces; a new paragraph or block starts after
/// a blank line. Confidence is `None` when no word was recognised.
pub fn parse_tsv(tsv: &str) -> Recognition {
    let mut text = String::new();
    let mut last_line: Option<(u32, u32, u32)> = None;
    let mut last_paragraph: Option<(u32, u32)> = None;
    let mut confidence_sum = 0.0f64;
    let mut scored_words = 0u32;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let field = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let (block, paragraph, line) = (field(2), field(3), field(4));

        match last_line {
            Some(prev) if prev == (block, paragraph, line) => text.push(' '),
            Some(_) => {
                text.push('\n');
                if last_paragraph != Some((block, paragraph)) {
                    text.push('\n');
                }
            }
            None => {}
        }
        text.push_str(word);
        last_line = Some((block, paragraph, line));
        last_paragraph = Some((block, paragraph));

        if let Ok(conf) = cols[10].parse::<f64>()
            && conf >= 0.0
        {
            confidence_sum += conf;
            scored_words += 1;
        }
    }

    let confidence = (scored_words > 0).then(|| (confidence_sum / scored_words as f64) as f32);
    debug!(scored_words, "Parsed tesseract TSV");
    Recognition { text, confidence }
}
