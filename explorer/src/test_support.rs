//! In-memory fakes for the ports, with failure and latency injection.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::diagnostics::{DegradeReason, DiagnosticSink};
use crate::error::{IndexError, ListingError};
use crate::ports::{AddressIndex, BlockIndex, RefreshError, TransactionStore};
use crate::types::{
    AddressHistory, BlockHash, BlockRecord, ScopeKind, TransactionInfo, TxId, TxOutput,
};

pub fn block_hash(height: u64) -> BlockHash {
    format!("{:064x}", height + 0xb10c)
}

pub fn txid(height: u64, index: usize) -> TxId {
    format!("{:08x}{:056x}", height, index)
}

pub fn tx_info(id: &str) -> TransactionInfo {
    TransactionInfo::new(
        id,
        vec![],
        vec![TxOutput {
            n: 0,
            address: None,
            value: 1,
        }],
    )
}

#[derive(Default)]
pub struct FakeChain {
    blocks: HashMap<u64, BlockRecord>,
    failing_heights: HashSet<u64>,
    failing_hashes: HashSet<BlockHash>,
    unlisted_hashes: HashSet<BlockHash>,
    height_delays: HashMap<u64, Duration>,
    transactions: HashMap<TxId, TransactionInfo>,
    failing_txids: HashSet<TxId>,
    tx_delays: HashMap<TxId, Duration>,
    call_delay: Option<Duration>,
    pub detail_calls: AtomicUsize,
    pub height_calls: AtomicUsize,
    pub in_flight: InFlight,
}

/// Counts concurrent calls into a fake and remembers the highest count.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeChain {
    /// Blocks `0..counts.len()`, block `h` holding `counts[h]` transactions,
    /// every transaction hydratable.
    pub fn with_blocks(counts: &[usize]) -> Self {
        let mut chain = Self::default();
        for (height, &count) in counts.iter().enumerate() {
            let height = height as u64;
            let tx: Vec<TxId> = (0..count).map(|i| txid(height, i)).collect();
            for id in &tx {
                chain.transactions.insert(id.clone(), tx_info(id));
            }
            chain.blocks.insert(
                height,
                BlockRecord {
                    hash: block_hash(height),
                    height,
                    previous_hash: height.checked_sub(1).map(block_hash),
                    time: 1_600_000_000 + height * 600,
                    tx,
                },
            );
        }
        chain
    }

    pub fn failing_height(mut self, height: u64) -> Self {
        self.failing_heights.insert(height);
        self
    }

    pub fn missing_height(mut self, height: u64) -> Self {
        self.blocks.remove(&height);
        self
    }

    pub fn failing_block_fetch(mut self, height: u64) -> Self {
        self.failing_hashes.insert(block_hash(height));
        self
    }

    /// Height still resolves, but the record behind its hash is gone.
    pub fn unlisted_block(mut self, height: u64) -> Self {
        self.unlisted_hashes.insert(block_hash(height));
        self
    }

    pub fn height_delay(mut self, height: u64, delay: Duration) -> Self {
        self.height_delays.insert(height, delay);
        self
    }

    pub fn without_detail(mut self, id: &str) -> Self {
        self.transactions.remove(id);
        self
    }

    pub fn failing_detail(mut self, id: &str) -> Self {
        self.failing_txids.insert(id.to_string());
        self
    }

    pub fn detail_delay(mut self, id: &str, delay: Duration) -> Self {
        self.tx_delays.insert(id.to_string(), delay);
        self
    }

    /// Every index call sleeps for `delay` before answering.
    pub fn call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn with_transaction(mut self, info: TransactionInfo) -> Self {
        self.transactions.insert(info.txid.clone(), info);
        self
    }

    pub fn block_txids(&self, height: u64) -> Vec<TxId> {
        self.blocks
            .get(&height)
            .map(|b| b.tx.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlockIndex for FakeChain {
    async fn resolve_height(&self, height: u64) -> Result<Option<BlockHash>, IndexError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        let _call = self.in_flight.enter();
        self.pause().await;
        if let Some(delay) = self.height_delays.get(&height) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_heights.contains(&height) {
            return Err(IndexError::Unavailable(format!("height {}", height)));
        }
        Ok(self.blocks.get(&height).map(|b| b.hash.clone()))
    }

    async fn fetch_by_hash(&self, hash: &str) -> Result<Option<BlockRecord>, IndexError> {
        let _call = self.in_flight.enter();
        self.pause().await;
        if self.failing_hashes.contains(hash) {
            return Err(IndexError::Unavailable(format!("block {}", hash)));
        }
        if self.unlisted_hashes.contains(hash) {
            return Ok(None);
        }
        Ok(self.blocks.values().find(|b| b.hash == hash).cloned())
    }

    async fn tip_height(&self) -> Result<Option<u64>, IndexError> {
        Ok(self.blocks.keys().max().copied())
    }
}

#[async_trait]
impl TransactionStore for FakeChain {
    async fn fetch_detail(&self, txid: &str) -> Result<Option<TransactionInfo>, IndexError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let _call = self.in_flight.enter();
        self.pause().await;
        if let Some(delay) = self.tx_delays.get(txid) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_txids.contains(txid) {
            return Err(IndexError::Unavailable(format!("tx {}", txid)));
        }
        Ok(self.transactions.get(txid).cloned())
    }
}

/// Address index answering from a fixed table.
#[derive(Default)]
pub struct FakeAddresses {
    fresh: HashMap<String, AddressHistory>,
    failing: HashMap<String, Option<AddressHistory>>,
}

impl FakeAddresses {
    pub fn with_history(mut self, address: &str, transactions: Vec<TxId>, received: u64) -> Self {
        self.fresh.insert(address.to_string(), history(address, transactions, received));
        self
    }

    /// Refresh fails; `stale` is what the index held before.
    pub fn failing(mut self, address: &str, stale: Option<AddressHistory>) -> Self {
        self.failing.insert(address.to_string(), stale);
        self
    }
}

pub fn history(address: &str, transactions: Vec<TxId>, received: u64) -> AddressHistory {
    AddressHistory {
        address: address.to_string(),
        transactions,
        total_received: received,
        total_sent: 0,
    }
}

#[async_trait]
impl AddressIndex for FakeAddresses {
    async fn refresh(&self, address: &str) -> Result<AddressHistory, RefreshError> {
        if let Some(stale) = self.failing.get(address) {
            let source = IndexError::Unavailable(format!("address {}", address));
            return Err(match stale {
                Some(h) => RefreshError::with_stale(source, h.clone()),
                None => RefreshError::new(source),
            });
        }
        Ok(self
            .fresh
            .get(address)
            .cloned()
            .unwrap_or_else(|| AddressHistory::empty(address)))
    }
}

/// Sink that records every event for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub degraded: Mutex<Vec<(String, DegradeReason)>>,
    pub stale: Mutex<Vec<String>>,
    pub failures: Mutex<Vec<ScopeKind>>,
}

impl RecordingSink {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn degraded_ids(&self) -> Vec<String> {
        self.degraded
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn item_degraded(&self, txid: &str, reason: &DegradeReason) {
        self.degraded
            .lock()
            .unwrap()
            .push((txid.to_string(), reason.clone()));
    }

    fn stale_aggregate_used(&self, address: &str, _error: &IndexError) {
        self.stale.lock().unwrap().push(address.to_string());
    }

    fn scope_failed(&self, scope: ScopeKind, _error: &ListingError) {
        self.failures.lock().unwrap().push(scope);
    }
}
