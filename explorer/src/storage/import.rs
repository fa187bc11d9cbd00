//! JSON block dumps.
//!
//! A dump is a JSON array of [`BlockImport`] objects in any order. Blocks
//! are written in ascending height so address histories come out in chain
//! order.

use serde::{Deserialize, Serialize};
use std::io::Read;

use super::db::ChainStore;
use crate::error::{IndexError, IndexResult};
use crate::types::{BlockHash, BlockRecord, TransactionInfo};

/// One block of a dump, with its transactions fully decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockImport {
    pub hash: BlockHash,
    pub height: u64,
    #[serde(default)]
    pub previous_hash: Option<BlockHash>,
    pub time: u64,
    #[serde(default)]
    pub transactions: Vec<TransactionInfo>,
}

impl BlockImport {
    /// The index record for this block: identity plus ordered txids.
    pub fn record(&self) -> BlockRecord {
        BlockRecord {
            hash: self.hash.to_ascii_lowercase(),
            height: self.height,
            previous_hash: self.previous_hash.as_ref().map(|h| h.to_ascii_lowercase()),
            time: self.time,
            tx: self.transactions.iter().map(|t| t.txid.clone()).collect(),
        }
    }
}

/// Parses a dump.
pub fn read_dump<R: Read>(reader: R) -> IndexResult<Vec<BlockImport>> {
    serde_json::from_reader(reader).map_err(|e| IndexError::Serialization(e.to_string()))
}

/// Stores `blocks` in ascending height order. Returns the number stored.
pub fn import_blocks(store: &ChainStore, mut blocks: Vec<BlockImport>) -> IndexResult<usize> {
    blocks.sort_by_key(|b| b.height);
    for block in &blocks {
        store.put_block(block)?;
    }
    tracing::info!(
        blocks = blocks.len(),
        tip = ?store.tip_height()?,
        stored_transactions = store.transaction_count(),
        known_addresses = store.address_count(),
        "block import finished"
    );
    Ok(blocks.len())
}
