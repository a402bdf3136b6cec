// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Confidence gate. Decides whether the fast engine's output is good enough
// or the request must escalate to the fallback engine.
//
// Independent checks: the engine succeeded, the normalised text is long
// enough, and the engine reported a usable confidence at or above the
// threshold. A score that is NaN, infinite or outside 0..=100 never passes.

use lesewerk_core::{ExtractionOptions, Recognition};
use lesewerk_document::EngineError;
use tracing::{debug, warn};

const MAX_CONFIDENCE: f32 = 100.0;

/// Why the fast result was not accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationReason {
    /// The engine raised an error.
    EngineFailed(EngineError),
    /// The engine reported no confidence score.
    Unscored,
    /// The engine reported a score that is not a number in 0..=100.
    InvalidScore(f32),
    /// Reported confidence is below the threshold.
    LowConfidence { confidence: f32, threshold: f32 },
    /// Normalised text is shorter than the minimum.
    TooShort { length: usize, minimum: usize },
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EngineFailed(err) => write!(f, "{err}"),
            Self::Unscored => f.write_str("engine reported no confidence"),
            Self::InvalidScore(score) => write!(f, "engine reported an invalid confidence {score}"),
            Self::LowConfidence {
                confidence,
                threshold,
            } => write!(f, "confidence {confidence:.1} below threshold {threshold:.1}"),
            Self::TooShort { length, minimum } => {
                write!(f, "text length {length} below minimum {minimum}")
            }
        }
    }
}

/// Outcome of evaluating a fast-engine result.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Return the fast result as-is.
    Accept,
    /// Try the fallback engine.
    Escalate(EscalationReason),
}

/// Thresholds for accepting a fast-engine result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    /// Inclusive lower bound, 0..=100.
    pub min_confidence: f32,
    /// Minimum number of characters.
    pub min_text_length: usize,
}

impl ConfidenceGate {
    /// Build a gate from request options. A threshold outside 0..=100 is
    /// clamped; a NaN threshold becomes 100 so only perfect scores pass.
    pub fn from_options(options: &ExtractionOptions) -> Self {
        let requested = options.min_confidence;
        let min_confidence = if requested.is_nan() {
            MAX_CONFIDENCE
        } else {
            requested.clamp(0.0, MAX_CONFIDENCE)
        };
        if min_confidence != requested {
            warn!(requested, used = min_confidence, "confidence threshold out of range");
        }
        Self {
            min_confidence,
            min_text_length: options.min_text_length,
        }
    }

    /// Evaluate a fast-engine outcome whose text is already normalised.
    pub fn evaluate(&self, outcome: &Result<Recognition, EngineError>) -> GateDecision {
        let recognition = match outcome {
            Ok(recognition) => recognition,
            Err(err) => return GateDecision::Escalate(EscalationReason::EngineFailed(err.clone())),
        };

        let length = recognition.char_count();
        if length < self.min_text_length {
            return GateDecision::Escalate(EscalationReason::TooShort {
                length,
                minimum: self.min_text_length,
            });
        }

        match recognition.confidence {
            None => GateDecision::Escalate(EscalationReason::Unscored),
            Some(score) if !(0.0..=MAX_CONFIDENCE).contains(&score) => {
                GateDecision::Escalate(EscalationReason::InvalidScore(score))
            }
            Some(confidence)
                if self.min_confidence.is_nan() || confidence < self.min_confidence =>
            {
                GateDecision::Escalate(EscalationReason::LowConfidence {
                    confidence,
                    threshold: self.min_confidence,
                })
            }
            Some(confidence) => {
                debug!(confidence, length, "fast result accepted");
                GateDecision::Accept
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ConfidenceGate {
        ConfidenceGate {
            min_confidence: 60.0,
            min_text_length: 3,
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let outcome = Ok(Recognition::new("invoice", Some(60.0)));
        assert_eq!(gate().evaluate(&outcome), GateDecision::Accept);
    }

    #[test]
    fn below_threshold_escalates() {
        let outcome = Ok(Recognition::new("invoice", Some(59.9)));
        assert!(matches!(
            gate().evaluate(&outcome),
            GateDecision::Escalate(EscalationReason::LowConfidence { .. })
        ));
    }

    #[test]
    fn length_gate_is_independent_of_confidence() {
        let outcome = Ok(Recognition::new("ab", Some(90.0)));
        assert_eq!(
            gate().evaluate(&outcome),
            GateDecision::Escalate(EscalationReason::TooShort {
                length: 2,
                minimum: 3
            })
        );
    }

    #[test]
    fn absent_confidence_escalates() {
        let outcome = Ok(Recognition::new("plenty of text", None));
        assert_eq!(
            gate().evaluate(&outcome),
            GateDecision::Escalate(EscalationReason::Unscored)
        );
    }

    #[test]
    fn zero_confidence_is_scored_but_low() {
        let outcome = Ok(Recognition::new("plenty of text", Some(0.0)));
        assert!(matches!(
            gate().evaluate(&outcome),
            GateDecision::Escalate(EscalationReason::LowConfidence { confidence, .. }) if confidence == 0.0
        ));
    }

    #[test]
    fn engine_error_escalates() {
        let outcome = Err(EngineError::Recognition("boom".into()));
        let decision = gate().evaluate(&outcome);
        assert!(matches!(decision, GateDecision::Escalate(EscalationReason::EngineFailed(_))));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let outcome = Ok(Recognition::new("äöü", Some(99.0)));
        assert_eq!(gate().evaluate(&outcome), GateDecision::Accept);
    }

    #[test]
    fn nan_confidence_escalates() {
        let outcome = Ok(Recognition::new("some text", Some(f32::NAN)));
        assert!(matches!(
            gate().evaluate(&outcome),
            GateDecision::Escalate(EscalationReason::InvalidScore(score)) if score.is_nan()
        ));
    }

    #[test]
    fn out_of_range_confidence_escalates() {
        for score in [f32::INFINITY, f32::NEG_INFINITY, -0.5, 100.5, 250.0] {
            let outcome = Ok(Recognition::new("some text", Some(score)));
            assert!(
                matches!(
                    gate().evaluate(&outcome),
                    GateDecision::Escalate(EscalationReason::InvalidScore(_))
                ),
                "score {score} was accepted"
            );
        }
        let perfect = Ok(Recognition::new("some text", Some(100.0)));
        assert_eq!(gate().evaluate(&perfect), GateDecision::Accept);
    }

    #[test]
    fn nan_threshold_accepts_nothing_below_perfect() {
        let raw = ConfidenceGate {
            min_confidence: f32::NAN,
            min_text_length: 3,
        };
        let outcome = Ok(Recognition::new("some text", Some(99.0)));
        assert!(matches!(
            raw.evaluate(&outcome),
            GateDecision::Escalate(EscalationReason::LowConfidence { .. })
        ));

        let options = ExtractionOptions {
            min_confidence: f32::NAN,
            ..ExtractionOptions::default()
        };
        let gate = ConfidenceGate::from_options(&options);
        assert_eq!(gate.min_confidence, 100.0);
        assert!(matches!(
            gate.evaluate(&outcome),
            GateDecision::Escalate(EscalationReason::LowConfidence { .. })
        ));
    }

    #[test]
    fn threshold_is_clamped_to_score_range() {
        let options = |min_confidence| ExtractionOptions {
            min_confidence,
            ..ExtractionOptions::default()
        };
        assert_eq!(ConfidenceGate::from_options(&options(-20.0)).min_confidence, 0.0);
        assert_eq!(ConfidenceGate::from_options(&options(f32::INFINITY)).min_confidence, 100.0);
        assert_eq!(ConfidenceGate::from_options(&options(75.0)).min_confidence, 75.0);
    }
}
