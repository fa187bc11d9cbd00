//! Last-good address aggregate cache.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::ports::{AddressIndex, RefreshError};
use crate::types::AddressHistory;

/// Wraps an [`AddressIndex`] and remembers the last aggregate each address
/// refreshed to.
///
/// When the inner refresh fails without stale data of its own, the cached
/// aggregate is attached instead, so the listing engine can keep serving
/// the address.
pub struct CachedAddressIndex<I> {
    inner: I,
    last_good: DashMap<String, AddressHistory>,
}

impl<I: AddressIndex> CachedAddressIndex<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            last_good: DashMap::new(),
        }
    }

    /// Cached aggregate for `address`, if any refresh ever succeeded.
    pub fn cached(&self, address: &str) -> Option<AddressHistory> {
        self.last_good.get(address).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.last_good.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_good.is_empty()
    }
}

#[async_trait]
impl<I: AddressIndex> AddressIndex for CachedAddressIndex<I> {
    async fn refresh(&self, address: &str) -> Result<AddressHistory, RefreshError> {
        match self.inner.refresh(address).await {
            Ok(history) => {
                self.last_good.insert(address.to_string(), history.clone());
                Ok(history)
            }
            Err(mut err) => {
                if err.stale.is_none() {
                    err.stale = self.cached(address);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::test_support::history;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Succeeds until switched off.
    struct Flaky {
        down: AtomicBool,
    }

    #[async_trait]
    impl AddressIndex for Flaky {
        async fn refresh(&self, address: &str) -> Result<AddressHistory, RefreshError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(RefreshError::new(IndexError::Unavailable("down".into())));
            }
            Ok(history(address, vec!["t1".into()], 42))
        }
    }

    fn flaky() -> CachedAddressIndex<Flaky> {
        CachedAddressIndex::new(Flaky {
            down: AtomicBool::new(false),
        })
    }

    #[tokio::test]
    async fn successful_refresh_is_cached() {
        let index = flaky();
        assert!(index.is_empty());
        index.refresh("1a").await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.cached("1a").unwrap().total_received, 42);
    }

    #[tokio::test]
    async fn failure_after_success_carries_cached_aggregate() {
        let index = flaky();
        index.refresh("1a").await.unwrap();
        index.inner.down.store(true, Ordering::SeqCst);

        let err = index.refresh("1a").await.unwrap_err();
        let stale = err.stale.unwrap();
        assert_eq!(stale.transactions, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn failure_without_history_has_no_stale_data() {
        let index = flaky();
        index.inner.down.store(true, Ordering::SeqCst);
        let err = index.refresh("1b").await.unwrap_err();
        assert!(err.stale.is_none());
    }
}
