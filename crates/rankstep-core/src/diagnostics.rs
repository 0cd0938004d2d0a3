//! Non-fatal diagnostics raised while expanding and aggregating
//!
//! Sinks are shared across worker threads, so every sink must accept
//! concurrent appends.

use crate::common::PageId;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

/// Which invariant a group broke
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Violation {
    /// Shares of the source's edges do not add up to 1.0
    ShareSum { sum: f64 },
    /// Share is NaN, infinite, or outside (0, 1]
    InvalidShare { destination: PageId, share: f64 },
    /// Computed amount is NaN, infinite, or negative
    InvalidAmount { destination: PageId, amount: f64 },
    /// More than one prior rank for the page; the last one is used
    DuplicateRank { count: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ShareSum { sum } => write!(f, "edge shares sum to {}", sum),
            Violation::InvalidShare { destination, share } => {
                write!(f, "invalid share {} towards {}", share, destination)
            }
            Violation::InvalidAmount { destination, amount } => {
                write!(f, "invalid contribution {} towards {}", amount, destination)
            }
            Violation::DuplicateRank { count } => write!(f, "{} prior ranks", count),
        }
    }
}

/// A recoverable condition reported to a [`DiagnosticSink`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Diagnostic {
    /// Source page has no outbound links; its mass is dropped
    DanglingPage { page: PageId, line: String },
    /// A group broke a numeric invariant
    InvariantViolation { source: PageId, violation: Violation },
    /// A source with edges had no prior rank and was treated as rank 0
    MissingRank { page: PageId },
}

impl Diagnostic {
    /// Page the diagnostic is about
    pub fn page(&self) -> &str {
        match self {
            Diagnostic::DanglingPage { page, .. } => page,
            Diagnostic::InvariantViolation { source, .. } => source,
            Diagnostic::MissingRank { page } => page,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DanglingPage { page, line } => write!(
                f,
                "web page {} has no links to other pages. Origin line: {}",
                page, line
            ),
            Diagnostic::InvariantViolation { source, violation } => {
                write!(f, "source page {}: {}", source, violation)
            }
            Diagnostic::MissingRank { page } => {
                write!(f, "source page {} has no prior rank, using 0", page)
            }
        }
    }
}

/// Destination for diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs each diagnostic as a warning and keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        log_diagnostic(&diagnostic);
    }
}

/// Append-only diagnostic log.
///
/// Each diagnostic is logged through `tracing` and retained in arrival order.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything reported so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Count entries matching a predicate
    pub fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.lock().iter().filter(|d| predicate(d)).count()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        // Entries are pushed whole, so a poisoned log is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&self, diagnostic: Diagnostic) {
        log_diagnostic(&diagnostic);
        self.lock().push(diagnostic);
    }
}

fn log_diagnostic(diagnostic: &Diagnostic) {
    let kind = match diagnostic {
        Diagnostic::DanglingPage { .. } => "dangling_page",
        Diagnostic::InvariantViolation { .. } => "invariant_violation",
        Diagnostic::MissingRank { .. } => "missing_rank",
    };
    warn!(page = diagnostic.page(), kind, "{}", diagnostic);
}
