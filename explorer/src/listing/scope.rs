//! Scope transaction provider.
//!
//! Expands a resolved scope into its full, ordered transaction-id
//! sequence: one block, a run of blocks, or one address's history.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::diagnostics::DiagnosticSink;
use crate::error::ListingError;
use crate::ports::{AddressIndex, BlockIndex};
use crate::types::{BlockHash, BlockId, TxId};

#[derive(Clone)]
pub struct ScopeProvider {
    blocks: Arc<dyn BlockIndex>,
    addresses: Arc<dyn AddressIndex>,
    diagnostics: Arc<dyn DiagnosticSink>,
    concurrency: usize,
}

impl ScopeProvider {
    pub fn new(
        blocks: Arc<dyn BlockIndex>,
        addresses: Arc<dyn AddressIndex>,
        diagnostics: Arc<dyn DiagnosticSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            blocks,
            addresses,
            diagnostics,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolves a client block reference to its canonical hash.
    pub async fn resolve_block_id(&self, raw: &str) -> Result<BlockHash, ListingError> {
        match BlockId::parse(raw) {
            Some(BlockId::Hash(hash)) => Ok(hash),
            Some(BlockId::Height(height)) => self
                .blocks
                .resolve_height(height)
                .await?
                .ok_or_else(|| ListingError::BlockNotFound(raw.to_string())),
            None => Err(ListingError::BlockNotFound(raw.to_string())),
        }
    }

    /// Transaction ids of a single block, in block order.
    pub async fn block_transactions(&self, raw_id: &str) -> Result<Vec<TxId>, ListingError> {
        let hash = self.resolve_block_id(raw_id).await?;
        match self.blocks.fetch_by_hash(&hash).await? {
            Some(block) => Ok(block.tx),
            None => Err(ListingError::BlockNotFound(raw_id.to_string())),
        }
    }

    /// Transaction ids of consecutive blocks, concatenated in the order of
    /// `hashes`, each block's own order preserved.
    ///
    /// The hashes come from the range resolver, so a block that cannot be
    /// fetched is an index inconsistency rather than a client error.
    pub async fn range_transactions(
        &self,
        hashes: &[BlockHash],
    ) -> Result<Vec<TxId>, ListingError> {
        let per_block: Vec<Vec<TxId>> = stream::iter(hashes.iter().cloned())
            .map(|hash| {
                let blocks = Arc::clone(&self.blocks);
                async move {
                    match blocks.fetch_by_hash(&hash).await? {
                        Some(block) => Ok(block.tx),
                        None => Err(ListingError::MissingBlock(hash)),
                    }
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(per_block.into_iter().flatten().collect())
    }

    /// Refreshes and reads an address's history.
    ///
    /// A failed refresh is fatal only when the index knows of no funds ever
    /// received by the address; otherwise the previous aggregate is used.
    pub async fn address_transactions(&self, address: &str) -> Result<Vec<TxId>, ListingError> {
        match self.addresses.refresh(address).await {
            Ok(history) => Ok(history.transactions),
            Err(err) => match err.stale {
                Some(stale) if stale.has_received_funds() => {
                    self.diagnostics.stale_aggregate_used(address, &err.source);
                    Ok(stale.transactions)
                }
                _ => {
                    tracing::debug!(address, error = %err.source, "address refresh failed");
                    Err(ListingError::AddressNotFound(address.to_string()))
                }
            },
        }
    }
}
