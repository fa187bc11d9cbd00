//! Transaction detail fetcher.
//!
//! Hydrates transaction ids into full records. A failed or empty lookup
//! becomes a `{txid}` stub in the same position and is reported to the
//! diagnostic sink; it never fails the batch.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::diagnostics::{DegradeReason, DiagnosticSink};
use crate::ports::TransactionStore;
use crate::types::{TransactionSummary, TxId};

/// Bounded, order-preserving hydration over a [`TransactionStore`].
#[derive(Clone)]
pub struct DetailFetcher {
    store: Arc<dyn TransactionStore>,
    diagnostics: Arc<dyn DiagnosticSink>,
    concurrency: usize,
}

impl DetailFetcher {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        diagnostics: Arc<dyn DiagnosticSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            diagnostics,
            concurrency: concurrency.max(1),
        }
    }

    /// Hydrates a single id.
    pub async fn fetch(&self, txid: &str) -> TransactionSummary {
        let reason = match self.store.fetch_detail(txid).await {
            Ok(Some(info)) => return TransactionSummary::Full(Box::new(info)),
            Ok(None) => DegradeReason::NotFound,
            Err(e) => DegradeReason::LookupFailed(e.to_string()),
        };
        self.diagnostics.item_degraded(txid, &reason);
        TransactionSummary::Stub {
            txid: txid.to_string(),
        }
    }

    /// Hydrates `txids` with at most `concurrency` lookups in flight.
    /// Output position `i` always corresponds to `txids[i]`.
    pub async fn fetch_all(&self, txids: &[TxId]) -> Vec<TransactionSummary> {
        stream::iter(txids.iter().cloned())
            .map(|txid| {
                let this = self.clone();
                async move { this.fetch(&txid).await }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
