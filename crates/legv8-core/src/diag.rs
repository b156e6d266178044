//! Diagnostic side channel owned by a simulator instance.

use std::collections::VecDeque;

use crate::{Diagnostic, DiagnosticClass};

/// Default number of recent diagnostics retained by a [`DiagnosticLog`].
pub const DEFAULT_DIAGNOSTIC_HISTORY: usize = 64;

/// Bounded record of non-fatal diagnostics with per-class counters.
///
/// Every recorded entry is also forwarded to the `log` facade, so hosts that
/// only configure a logger still see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLog {
    recent: VecDeque<Diagnostic>,
    capacity: usize,
    decode_count: u64,
    memory_count: u64,
    dispatch_count: u64,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_DIAGNOSTIC_HISTORY)
    }
}

impl DiagnosticLog {
    /// Creates a log that retains at most `capacity` recent entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity.min(DEFAULT_DIAGNOSTIC_HISTORY)),
            capacity,
            decode_count: 0,
            memory_count: 0,
            dispatch_count: 0,
        }
    }

    /// Records a diagnostic, bumping its class counter and logging it.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        match diagnostic.class() {
            DiagnosticClass::Decode => self.decode_count = self.decode_count.saturating_add(1),
            DiagnosticClass::Memory => self.memory_count = self.memory_count.saturating_add(1),
            DiagnosticClass::Dispatch => {
                self.dispatch_count = self.dispatch_count.saturating_add(1);
            }
        }

        if matches!(diagnostic, Diagnostic::UnsupportedInstruction { .. }) {
            log::error!("{diagnostic}");
        } else {
            log::warn!("{diagnostic}");
        }

        if self.capacity == 0 {
            return;
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(diagnostic);
    }

    /// Number of diagnostics recorded for `class` since creation or [`clear`](Self::clear).
    #[must_use]
    pub const fn count(&self, class: DiagnosticClass) -> u64 {
        match class {
            DiagnosticClass::Decode => self.decode_count,
            DiagnosticClass::Memory => self.memory_count,
            DiagnosticClass::Dispatch => self.dispatch_count,
        }
    }

    /// Total number of diagnostics recorded.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.decode_count
            .saturating_add(self.memory_count)
            .saturating_add(self.dispatch_count)
    }

    /// Retained diagnostics, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.recent.iter()
    }

    /// Most recently recorded diagnostic, if retained.
    #[must_use]
    pub fn last(&self) -> Option<&Diagnostic> {
        self.recent.back()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Drops retained entries and resets counters.
    pub fn clear(&mut self) {
        self.recent.clear();
        self.decode_count = 0;
        self.memory_count = 0;
        self.dispatch_count = 0;
    }
}
