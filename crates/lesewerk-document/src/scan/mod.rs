// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan pipeline: upload validation, preprocessing, and text cleanup around
// the recognition engines.

pub mod enhance;
pub mod text;
pub mod validate;

pub use enhance::{ImageFilter, Preprocessor};
pub use text::normalize_text;
pub use validate::validate_upload;
