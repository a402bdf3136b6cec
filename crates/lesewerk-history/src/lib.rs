// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-history: local record of past extractions.
//
// Every successful extraction is stored with the SHA-256 fingerprint of the
// uploaded image so repeated uploads of the same file can be recognised.

pub mod fingerprint;
pub mod store;

pub use fingerprint::{fingerprint, is_fingerprint};
pub use store::{HistoryEntry, HistoryStore};
