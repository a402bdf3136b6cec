// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Lesewerk text extraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which engine produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Traditional engine, tried first.
    Fast,
    /// Slower neural engine, used after escalation.
    Fallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw output of a single recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    /// Engine-reported score in 0..=100. `None` means the engine reports no
    /// score, which is not the same as a score of zero.
    pub confidence: Option<f32>,
}

impl Recognition {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// Length in characters, not bytes.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Simple counts over the extracted text, shown next to the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
    pub lines: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
            lines: text.lines().filter(|l| !l.trim().is_empty()).count(),
        }
    }
}

/// The unified outcome of one extraction request.
///
/// Carries no timestamps, so identical inputs with deterministic engines
/// produce identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub fallback_used: bool,
    /// Whether the engines saw a preprocessed image (false when the profile
    /// was absent, a no-op, or failed).
    pub preprocessed: bool,
    pub stats: TextStats,
}

/// Image enhancement toggles applied before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingProfile {
    pub grayscale: bool,
    /// Contrast factor; 1.0 is a no-op.
    pub contrast: f32,
    /// Additive brightness in -255..=255; 0 is a no-op.
    pub brightness: i32,
    /// Otsu binarization to pure black and white.
    pub binarize: bool,
    /// 1px median filter.
    pub denoise: bool,
    /// Unsharp mask.
    pub sharpen: bool,
}

impl Default for PreprocessingProfile {
    fn default() -> Self {
        Self::none()
    }
}

impl PreprocessingProfile {
    /// Leaves the image untouched.
    pub fn none() -> Self {
        Self {
            grayscale: false,
            contrast: 1.0,
            brightness: 0,
            binarize: false,
            denoise: false,
            sharpen: false,
        }
    }

    /// Scanned pages and screenshots: flat black text on a light background.
    pub fn document() -> Self {
        Self {
            grayscale: true,
            contrast: 1.4,
            binarize: true,
            ..Self::none()
        }
    }

    /// Camera photos of signs, labels and whiteboards.
    pub fn photo() -> Self {
        Self {
            contrast: 1.2,
            denoise: true,
            sharpen: true,
            ..Self::none()
        }
    }

    /// Underexposed photos.
    pub fn low_light() -> Self {
        Self {
            grayscale: true,
            brightness: 30,
            contrast: 1.3,
            ..Self::none()
        }
    }

    /// Look up a named preset (`none`, `document`, `photo`, `low-light`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Some(Self::none()),
            "document" => Some(Self::document()),
            "photo" => Some(Self::photo()),
            "low-light" => Some(Self::low_light()),
            _ => None,
        }
    }

    /// True when applying the profile would not change any pixel.
    pub fn is_noop(&self) -> bool {
        !self.grayscale
            && (self.contrast - 1.0).abs() < f32::EPSILON
            && self.brightness == 0
            && !self.binarize
            && !self.denoise
            && !self.sharpen
    }
}

/// Per-request knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    /// Minimum acceptable fast-engine confidence, 0..=100, inclusive.
    pub min_confidence: f32,
    /// Minimum acceptable length of normalised text, in characters.
    pub min_text_length: usize,
    /// Tesseract-style language code, e.g. `eng` or `deu+eng`.
    pub language: String,
    pub preprocessing: Option<PreprocessingProfile>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            min_confidence: 60.0,
            min_text_length: 3,
            language: "eng".into(),
            preprocessing: None,
        }
    }
}

/// Lifecycle of a single extraction request.
///
/// Linear: `Idle → Preprocessing → FastAttempt → {Done | Escalate}`,
/// `Escalate → FallbackAttempt → {Done | Failed}`. No state is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    Idle,
    Preprocessing,
    FastAttempt,
    Escalate,
    FallbackAttempt,
    Done,
    Failed,
}

impl ExtractionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ExtractionState::*;
        matches!(
            (self, next),
            (Idle, Preprocessing)
                | (Preprocessing, FastAttempt)
                | (FastAttempt, Done)
                | (FastAttempt, Escalate)
                | (FastAttempt, Failed)
                | (Escalate, FallbackAttempt)
                | (Escalate, Failed)
                | (FallbackAttempt, Done)
                | (FallbackAttempt, Failed)
                // Undecodable input or a superseded request.
                | (Idle | Preprocessing, Failed)
        )
    }

    /// Move to `next`, returning `None` for an illegal transition.
    pub fn advance(self, next: Self) -> Option<Self> {
        self.can_transition_to(next).then_some(next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// A single progress milestone reported while a request runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub state: ExtractionState,
    /// Short status label, e.g. `"rendering"` or `"trying AI method"`.
    pub label: String,
    /// 0..=100.
    pub percent: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_counts_characters() {
        let rec = Recognition::new("Grüße, 東京", Some(88.0));
        assert_eq!(rec.char_count(), 9);
        assert!(rec.text.len() > 9);
        assert_eq!(Recognition::new("", None).char_count(), 0);
    }

    #[test]
    fn text_stats_counts() {
        let stats = TextStats::of("Hello world\n\nsecond line");
        assert_eq!(stats.words, 4);
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.characters, 24);
    }

    #[test]
    fn presets_by_name() {
        assert_eq!(PreprocessingProfile::from_name("low_light"), Some(PreprocessingProfile::low_light()));
        assert_eq!(PreprocessingProfile::from_name("DOCUMENT"), Some(PreprocessingProfile::document()));
        assert!(PreprocessingProfile::from_name("sepia").is_none());
        assert!(PreprocessingProfile::none().is_noop());
        assert!(!PreprocessingProfile::photo().is_noop());
    }

    #[test]
    fn state_machine_is_linear() {
        use ExtractionState::*;
        assert_eq!(Idle.advance(Preprocessing), Some(Preprocessing));
        assert_eq!(FastAttempt.advance(Escalate), Some(Escalate));
        assert!(Done.advance(Idle).is_none());
        assert!(FallbackAttempt.advance(FastAttempt).is_none());
        assert!(Escalate.advance(Done).is_none());
        assert!(Failed.is_terminal() && Done.is_terminal());
    }

    #[test]
    fn method_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Method::Fallback).unwrap(), "\"fallback\"");
    }
}
