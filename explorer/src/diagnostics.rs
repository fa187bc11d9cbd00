//! # Diagnostics Sink
//!
//! The listing engine never fails a request because one transaction could
//! not be hydrated, and it keeps going on stale address data when a refresh
//! fails. Those events are still worth counting, so the engine reports them
//! to a [`DiagnosticSink`] supplied by the host process.
//!
//! [`TracingDiagnostics`] is the default: it emits structured `tracing`
//! events and leaves subscriber setup to the binary.

use std::fmt;

use crate::error::{IndexError, ListingError};
use crate::types::ScopeKind;

/// Why a transaction was returned as a stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    /// The store has no decoded info for the id.
    NotFound,
    /// The store call itself failed.
    LookupFailed(String),
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::LookupFailed(msg) => write!(f, "lookup failed: {}", msg),
        }
    }
}

/// Host-provided observer for degraded results and scope failures.
///
/// Implementations must be cheap and non-blocking; they are called inline
/// on the request path.
pub trait DiagnosticSink: Send + Sync {
    /// A transaction in a listing was replaced by a stub.
    fn item_degraded(&self, txid: &str, reason: &DegradeReason);

    /// An address refresh failed and the previous aggregate was served.
    fn stale_aggregate_used(&self, address: &str, error: &IndexError);

    /// A listing request failed at scope level.
    fn scope_failed(&self, scope: ScopeKind, error: &ListingError);
}

/// Default sink: structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn item_degraded(&self, txid: &str, reason: &DegradeReason) {
        tracing::warn!(txid, reason = %reason, "transaction hydration degraded to stub");
    }

    fn stale_aggregate_used(&self, address: &str, error: &IndexError) {
        tracing::warn!(address, error = %error, "address refresh failed, serving stale aggregate");
    }

    fn scope_failed(&self, scope: ScopeKind, error: &ListingError) {
        tracing::info!(scope = scope.as_str(), error = %error, "listing request rejected");
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticSink for NoopDiagnostics {
    fn item_degraded(&self, _txid: &str, _reason: &DegradeReason) {}

    fn stale_aggregate_used(&self, _address: &str, _error: &IndexError) {}

    fn scope_failed(&self, _scope: ScopeKind, _error: &ListingError) {}
}
