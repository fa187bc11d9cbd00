//! Listing orchestrator.
//!
//! [`Explorer`] is the entry point the HTTP layer talks to. It classifies
//! the request into exactly one scope, expands the scope into its id
//! sequence, takes the requested page and hydrates it.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::config::ListingConfig;
use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::error::ListingError;
use crate::listing::{paginate, DetailFetcher, RangeResolver, ScopeProvider};
use crate::ports::{AddressIndex, BlockIndex, TransactionStore};
use crate::types::{Scope, ScopeParams, TransactionInfo, TransactionListing, TxId};

/// Transaction listing service over injected indices.
#[derive(Clone)]
pub struct Explorer {
    blocks: Arc<dyn BlockIndex>,
    addresses: Arc<dyn AddressIndex>,
    store: Arc<dyn TransactionStore>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: ListingConfig,
    ranges: RangeResolver,
    scopes: ScopeProvider,
    fetcher: DetailFetcher,
}

impl Explorer {
    /// Builds an explorer with default tunables and the tracing sink.
    pub fn new(
        blocks: Arc<dyn BlockIndex>,
        addresses: Arc<dyn AddressIndex>,
        store: Arc<dyn TransactionStore>,
    ) -> Self {
        let diagnostics: Arc<dyn DiagnosticSink> = Arc::new(TracingDiagnostics);
        let config = ListingConfig::default();
        Self {
            ranges: RangeResolver::new(
                blocks.clone(),
                config.fanout_concurrency,
                config.max_range_width,
            ),
            scopes: ScopeProvider::new(
                blocks.clone(),
                addresses.clone(),
                diagnostics.clone(),
                config.fanout_concurrency,
            ),
            fetcher: DetailFetcher::new(
                store.clone(),
                diagnostics.clone(),
                config.fanout_concurrency,
            ),
            blocks,
            addresses,
            store,
            diagnostics,
            config,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self.rebuild()
    }

    pub fn with_config(mut self, config: ListingConfig) -> Self {
        self.config = config;
        self.rebuild()
    }

    fn rebuild(mut self) -> Self {
        let n = self.config.fanout_concurrency;
        self.ranges = RangeResolver::new(self.blocks.clone(), n, self.config.max_range_width);
        self.scopes = ScopeProvider::new(
            self.blocks.clone(),
            self.addresses.clone(),
            self.diagnostics.clone(),
            n,
        );
        self.fetcher = DetailFetcher::new(self.store.clone(), self.diagnostics.clone(), n);
        self
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    /// Lists the transactions of the scope `params` select.
    ///
    /// Scope-level failures are reported to the diagnostic sink and returned;
    /// per-item hydration failures show up as stub entries in an `Ok`
    /// listing.
    pub async fn list_transactions(
        &self,
        params: &ScopeParams,
    ) -> Result<TransactionListing, ListingError> {
        let scope = Scope::classify(params);
        let kind = scope.kind();
        tracing::debug!(scope = kind.as_str(), "listing transactions");

        let result = self.list_scope(scope).await;
        if let Err(err) = &result {
            self.diagnostics.scope_failed(kind, err);
        }
        result
    }

    async fn list_scope(&self, scope: Scope) -> Result<TransactionListing, ListingError> {
        match scope {
            Scope::Range { from, to } => {
                let hashes = self.ranges.resolve(from, to).await?;
                let txids = self.scopes.range_transactions(&hashes).await?;
                Ok(TransactionListing {
                    pages_total: None,
                    txs: self.fetcher.fetch_all(&txids).await,
                })
            }
            Scope::Block { id, page } => {
                let txids = self.scopes.block_transactions(&id).await?;
                Ok(self.paged(&txids, page).await)
            }
            Scope::Address { address, page } => {
                let txids = self.scopes.address_transactions(&address).await?;
                Ok(self.paged(&txids, page).await)
            }
            Scope::Empty => Ok(TransactionListing::empty()),
        }
    }

    async fn paged(&self, txids: &[TxId], page: Option<usize>) -> TransactionListing {
        let window = paginate(txids, page);
        TransactionListing {
            pages_total: Some(window.total_pages),
            txs: self.fetcher.fetch_all(window.items).await,
        }
    }

    /// Direct single-transaction lookup with confirmations filled in.
    ///
    /// Unlike listings, a missing record here is an error.
    pub async fn transaction(&self, txid: &str) -> Result<TransactionInfo, ListingError> {
        let mut info = self
            .store
            .fetch_detail(txid)
            .await?
            .ok_or_else(|| ListingError::TransactionNotFound(txid.to_string()))?;

        let tip = self.blocks.tip_height().await?;
        info.confirmations = Some(confirmations(tip, info.block_height));
        self.fill_input_confirmations(&mut info, tip).await?;
        Ok(info)
    }

    /// Sets each input's confirmations from the block of the transaction it
    /// spends. Coinbase inputs and funding transactions missing from the
    /// store stay `None`.
    async fn fill_input_confirmations(
        &self,
        info: &mut TransactionInfo,
        tip: Option<u64>,
    ) -> Result<(), ListingError> {
        let funding: Vec<Option<TxId>> = info.inputs.iter().map(|i| i.prev_txid.clone()).collect();
        let heights: Vec<Option<Option<u64>>> = stream::iter(funding)
            .map(|prev| {
                let store = Arc::clone(&self.store);
                async move {
                    match prev {
                        Some(id) => store
                            .fetch_detail(&id)
                            .await
                            .map(|tx| tx.map(|tx| tx.block_height)),
                        None => Ok(None),
                    }
                }
            })
            .buffered(self.config.fanout_concurrency)
            .try_collect()
            .await?;

        for (input, funding_height) in info.inputs.iter_mut().zip(heights) {
            input.confirmations = funding_height.map(|height| confirmations(tip, height));
        }
        Ok(())
    }

    /// Height of the best indexed block.
    pub async fn tip_height(&self) -> Result<Option<u64>, ListingError> {
        Ok(self.blocks.tip_height().await?)
    }
}

/// Blocks on top of and including `height`; 0 when unconfirmed.
fn confirmations(tip: Option<u64>, height: Option<u64>) -> u64 {
    match (tip, height) {
        (Some(tip), Some(height)) if tip >= height => tip - height + 1,
        _ => 0,
    }
}
