// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk Extract: runs an image through the fast engine, judges the result
// with the confidence gate, and escalates to the fallback engine at most once.
// Engines and preprocessing live in `lesewerk-document`; this crate only
// sequences them.

pub mod coordinator;
pub mod gate;
pub mod progress;
pub mod request;
pub mod supersede;

pub use coordinator::{Coordinator, DEFAULT_ENGINE_TIMEOUT};
pub use gate::{ConfidenceGate, EscalationReason, GateDecision};
pub use progress::{ProgressReporter, ProgressStream};
pub use request::ExtractionRequest;
pub use supersede::{Supersession, Ticket};
