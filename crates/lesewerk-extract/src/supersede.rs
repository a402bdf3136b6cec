// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Last-write-wins supersession.
//
// Every request draws a ticket from a shared generation counter. A request
// whose ticket is no longer the latest has been superseded by a newer upload
// and stops at its next checkpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A request's position in the generation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Shared generation counter.
#[derive(Debug, Clone, Default)]
pub struct Supersession {
    latest: Arc<AtomicU64>,
}

impl Supersession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding every ticket issued before it.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is still the most recent one.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}
