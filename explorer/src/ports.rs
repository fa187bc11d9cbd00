//! Outbound ports.
//!
//! The listing engine depends on these traits only. Concrete stores are
//! passed in as `Arc<dyn ...>` so tests can swap in fakes and the server can
//! decide which backend to wire up.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::error::IndexError;
use crate::types::{AddressHistory, BlockHash, BlockRecord, TransactionInfo};

/// Height and hash lookups over the block index.
#[async_trait]
pub trait BlockIndex: Send + Sync {
    /// Canonical hash of the block at `height`, `None` past the tip.
    async fn resolve_height(&self, height: u64) -> Result<Option<BlockHash>, IndexError>;

    /// Block record for `hash`, `None` if the index does not know it.
    async fn fetch_by_hash(&self, hash: &str) -> Result<Option<BlockRecord>, IndexError>;

    /// Height of the best block, `None` for an empty index.
    async fn tip_height(&self) -> Result<Option<u64>, IndexError>;
}

/// Decoded transaction lookups.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Full record for `txid`. `None` when the store has no decoded info
    /// for it.
    async fn fetch_detail(&self, txid: &str) -> Result<Option<TransactionInfo>, IndexError>;
}

/// Per-address transaction history.
#[async_trait]
pub trait AddressIndex: Send + Sync {
    /// Brings the aggregate for `address` up to date and returns it.
    async fn refresh(&self, address: &str) -> Result<AddressHistory, RefreshError>;
}

/// A failed address refresh. `stale` carries whatever aggregate the index
/// held before the refresh was attempted.
#[derive(Debug, Error)]
#[error("address refresh failed: {source}")]
pub struct RefreshError {
    #[source]
    pub source: IndexError,
    pub stale: Option<AddressHistory>,
}

impl RefreshError {
    pub fn new(source: IndexError) -> Self {
        Self {
            source,
            stale: None,
        }
    }

    pub fn with_stale(source: IndexError, stale: AddressHistory) -> Self {
        Self {
            source,
            stale: Some(stale),
        }
    }
}

#[async_trait]
impl<T: BlockIndex + ?Sized> BlockIndex for Arc<T> {
    async fn resolve_height(&self, height: u64) -> Result<Option<BlockHash>, IndexError> {
        (**self).resolve_height(height).await
    }

    async fn fetch_by_hash(&self, hash: &str) -> Result<Option<BlockRecord>, IndexError> {
        (**self).fetch_by_hash(hash).await
    }

    async fn tip_height(&self) -> Result<Option<u64>, IndexError> {
        (**self).tip_height().await
    }
}

#[async_trait]
impl<T: TransactionStore + ?Sized> TransactionStore for Arc<T> {
    async fn fetch_detail(&self, txid: &str) -> Result<Option<TransactionInfo>, IndexError> {
        (**self).fetch_detail(txid).await
    }
}

#[async_trait]
impl<T: AddressIndex + ?Sized> AddressIndex for Arc<T> {
    async fn refresh(&self, address: &str) -> Result<AddressHistory, RefreshError> {
        (**self).refresh(address).await
    }
}
