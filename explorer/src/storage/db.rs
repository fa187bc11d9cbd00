//! # ChainStore — Persistent Chain Index
//!
//! sled-backed index of blocks, decoded transactions and per-address
//! aggregates. Each kind of record lives in its own tree:
//!
//! | Tree           | Key                 | Value                     |
//! |----------------|---------------------|---------------------------|
//! | `blocks`       | `height` (8B BE)    | `bincode(BlockRecord)`    |
//! | `block_hashes` | hash (hex, UTF-8)   | `height` (8B BE)          |
//! | `transactions` | txid (hex, UTF-8)   | `bincode(TransactionInfo)`|
//! | `addresses`    | address (UTF-8)     | `bincode(AddressHistory)` |
//! | `metadata`     | key (UTF-8)         | value (bytes)             |
//!
//! Heights are big-endian so sled's byte ordering matches numeric order.
//!
//! Address aggregates are folded at write time: every transaction stored
//! through [`ChainStore::put_block`] appends its id to the history of each
//! address it touches, so a refresh is a single read.

use async_trait::async_trait;
use sled::{Batch, Db, Tree};
use std::collections::HashMap;
use std::path::Path;

use super::import::BlockImport;
use crate::address;
use crate::error::{IndexError, IndexResult};
use crate::ports::{AddressIndex, BlockIndex, RefreshError, TransactionStore};
use crate::types::{AddressHistory, BlockHash, BlockRecord, TransactionInfo};

/// Key in the `metadata` tree holding the best block height.
const META_TIP_HEIGHT: &[u8] = b"tip_height";

fn encode<T: serde::Serialize>(value: &T) -> IndexResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| IndexError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> IndexResult<T> {
    bincode::deserialize(bytes).map_err(|e| IndexError::Serialization(e.to_string()))
}

fn decode_height(bytes: &[u8]) -> IndexResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| IndexError::Serialization("invalid height bytes".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

/// Persistent chain index.
///
/// Cheap to clone; clones share the same sled handles.
#[derive(Debug, Clone)]
pub struct ChainStore {
    db: Db,
    blocks: Tree,
    block_hashes: Tree,
    transactions: Tree,
    addresses: Tree,
    metadata: Tree,
}

impl ChainStore {
    /// Opens or creates a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> IndexResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory store removed on drop.
    pub fn open_temporary() -> IndexResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> IndexResult<Self> {
        Ok(Self {
            blocks: db.open_tree("blocks")?,
            block_hashes: db.open_tree("block_hashes")?,
            transactions: db.open_tree("transactions")?,
            addresses: db.open_tree("addresses")?,
            metadata: db.open_tree("metadata")?,
            db,
        })
    }

    // -- Block operations ---------------------------------------------------

    /// Persists a block with its transactions and folds them into the
    /// address aggregates.
    ///
    /// Transactions already confirmed in the store are rewritten but not
    /// folded a second time, so re-importing a block leaves the aggregates
    /// intact. A stored record without block context is folded when its
    /// block arrives. A different block at an already stored height
    /// replaces the old one, whose hash stops resolving.
    pub fn put_block(&self, block: &BlockImport) -> IndexResult<()> {
        let record = block.record();
        let height_key = record.height.to_be_bytes();

        let mut tx_batch = Batch::default();
        let mut touched: HashMap<String, AddressHistory> = HashMap::new();
        let mut touched_order: Vec<String> = Vec::new();

        for tx in &block.transactions {
            let mut tx = tx.clone();
            tx.block_hash = Some(record.hash.clone());
            tx.block_height = Some(record.height);
            tx.time = record.time;
            tx.confirmations = None;

            if !self.is_confirmed(&tx.txid)? {
                self.fold_addresses(&tx, &mut touched, &mut touched_order)?;
            }
            tx_batch.insert(tx.txid.as_bytes(), encode(&tx)?);
        }

        self.transactions.apply_batch(tx_batch)?;

        let mut addr_batch = Batch::default();
        for addr in &touched_order {
            if let Some(history) = touched.get(addr) {
                addr_batch.insert(addr.as_bytes(), encode(history)?);
            }
        }
        self.addresses.apply_batch(addr_batch)?;

        if let Some(previous) = self.get_block(record.height)? {
            if previous.hash != record.hash {
                self.block_hashes.remove(previous.hash.as_bytes())?;
                tracing::info!(
                    height = record.height,
                    old = %previous.hash,
                    new = %record.hash,
                    "block replaced"
                );
            }
        }
        self.blocks.insert(height_key, encode(&record)?)?;
        self.block_hashes
            .insert(record.hash.as_bytes(), &height_key)?;

        let tip = self.tip_height()?;
        if tip.map_or(true, |t| record.height > t) {
            self.metadata.insert(META_TIP_HEIGHT, &height_key)?;
        }

        self.db.flush()?;
        tracing::debug!(
            height = record.height,
            hash = %record.hash,
            txs = record.tx.len(),
            "block stored"
        );
        Ok(())
    }

    /// Whether `txid` is stored with the block that confirmed it.
    fn is_confirmed(&self, txid: &str) -> IndexResult<bool> {
        Ok(self
            .get_transaction(txid)?
            .is_some_and(|tx| tx.block_hash.is_some()))
    }

    fn fold_addresses(
        &self,
        tx: &TransactionInfo,
        touched: &mut HashMap<String, AddressHistory>,
        order: &mut Vec<String>,
    ) -> IndexResult<()> {
        let spent = tx
            .inputs
            .iter()
            .filter_map(|i| i.address.as_deref().map(|a| (a, i.value, false)));
        let received = tx
            .outputs
            .iter()
            .filter_map(|o| o.address.as_deref().map(|a| (a, o.value, true)));

        for (addr, value, is_output) in spent.chain(received) {
            if !touched.contains_key(addr) {
                let history = self
                    .get_address(addr)?
                    .unwrap_or_else(|| AddressHistory::empty(addr));
                touched.insert(addr.to_string(), history);
                order.push(addr.to_string());
            }
            let Some(history) = touched.get_mut(addr) else {
                continue;
            };
            if !history.transactions.contains(&tx.txid) {
                history.transactions.push(tx.txid.clone());
            }
            if is_output {
                history.total_received = history.total_received.saturating_add(value);
            } else {
                history.total_sent = history.total_sent.saturating_add(value);
            }
        }
        Ok(())
    }

    /// Block at `height`, if stored.
    pub fn get_block(&self, height: u64) -> IndexResult<Option<BlockRecord>> {
        self.blocks
            .get(height.to_be_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Block with `hash`, via the hash-to-height index. `None` when the
    /// height now holds a different block.
    pub fn get_block_by_hash(&self, hash: &str) -> IndexResult<Option<BlockRecord>> {
        let hash = hash.to_ascii_lowercase();
        let Some(height) = self.block_hashes.get(hash.as_bytes())? else {
            return Ok(None);
        };
        Ok(self
            .get_block(decode_height(&height)?)?
            .filter(|block| block.hash == hash))
    }

    // -- Transaction operations ---------------------------------------------

    pub fn get_transaction(&self, txid: &str) -> IndexResult<Option<TransactionInfo>> {
        self.transactions
            .get(txid.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    // -- Address operations -------------------------------------------------

    /// Stored aggregate for `address`, `None` if never seen.
    pub fn get_address(&self, address: &str) -> IndexResult<Option<AddressHistory>> {
        self.addresses
            .get(address.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    // -- Metadata operations ------------------------------------------------

    /// Best stored height, `None` for an empty store.
    pub fn tip_height(&self) -> IndexResult<Option<u64>> {
        self.metadata
            .get(META_TIP_HEIGHT)?
            .map(|bytes| decode_height(&bytes))
            .transpose()
    }

    // -- Utility operations -------------------------------------------------

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn flush(&self) -> IndexResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Port implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl BlockIndex for ChainStore {
    async fn resolve_height(&self, height: u64) -> Result<Option<BlockHash>, IndexError> {
        Ok(self.get_block(height)?.map(|b| b.hash))
    }

    async fn fetch_by_hash(&self, hash: &str) -> Result<Option<BlockRecord>, IndexError> {
        self.get_block_by_hash(hash)
    }

    async fn tip_height(&self) -> Result<Option<u64>, IndexError> {
        ChainStore::tip_height(self)
    }
}

#[async_trait]
impl TransactionStore for ChainStore {
    async fn fetch_detail(&self, txid: &str) -> Result<Option<TransactionInfo>, IndexError> {
        self.get_transaction(txid)
    }
}

#[async_trait]
impl AddressIndex for ChainStore {
    /// Validates the address and reads its aggregate. A well-formed address
    /// the chain never paid yields an empty history.
    async fn refresh(&self, addr: &str) -> Result<AddressHistory, RefreshError> {
        let stored = self.get_address(addr).map_err(RefreshError::new)?;
        if let Err(e) = address::decode(addr) {
            return Err(match stored {
                Some(stale) => RefreshError::with_stale(e, stale),
                None => RefreshError::new(e),
            });
        }
        Ok(stored.unwrap_or_else(|| AddressHistory::empty(addr)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
