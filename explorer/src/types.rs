//! Core type definitions for the explorer.
//!
//! Everything here is request-scoped on the listing path: built when a
//! request arrives, dropped once the response is serialized. The storage
//! layer persists [`BlockRecord`], [`TransactionInfo`] and
//! [`AddressHistory`] with bincode, so those types must not use serde
//! attributes that skip fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction hash, hex-encoded. The join key between indices and the
/// transaction store.
pub type TxId = String;

/// Canonical block hash, hex-encoded.
pub type BlockHash = String;

// ---------------------------------------------------------------------------
// BlockId
// ---------------------------------------------------------------------------

/// A block reference as supplied by a client: a height or a hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockId {
    Height(u64),
    Hash(BlockHash),
}

impl BlockId {
    /// Length of a hex-encoded 32-byte block hash.
    pub const HASH_HEX_LEN: usize = 64;

    /// Parses a client-supplied block reference.
    ///
    /// 64 hex characters are a hash (normalized to lowercase); a decimal
    /// number is a height. Anything else is not a block reference.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() == Self::HASH_HEX_LEN && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Some(Self::Hash(raw.to_ascii_lowercase()));
        }
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            return raw.parse().ok().map(Self::Height);
        }
        None
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Height(h) => write!(f, "height {}", h),
            Self::Hash(hash) => write!(f, "{}", hash),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A block as seen by the block index: identity plus the ordered list of
/// transaction ids it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub hash: BlockHash,
    pub height: u64,
    pub previous_hash: Option<BlockHash>,
    /// Unix timestamp (seconds).
    pub time: u64,
    /// Transaction ids in block order.
    pub tx: Vec<TxId>,
}

/// One spent output referenced by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    /// Funding transaction. `None` for coinbase inputs.
    pub prev_txid: Option<TxId>,
    pub prev_vout: Option<u32>,
    pub address: Option<String>,
    /// Value in base units (satoshis).
    pub value: u64,
    /// Confirmations of the funding transaction. Filled on direct lookups
    /// only.
    #[serde(default)]
    pub confirmations: Option<u64>,
}

/// One output created by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub n: u32,
    /// Decoded destination, if the script has a standard address form.
    pub address: Option<String>,
    /// Value in base units (satoshis).
    pub value: u64,
}

/// Fully decoded transaction, as returned by the transaction store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub txid: TxId,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub locktime: u32,
    pub block_hash: Option<BlockHash>,
    pub block_height: Option<u64>,
    /// Unix timestamp (seconds) of the containing block, 0 if unknown.
    #[serde(default)]
    pub time: u64,
    /// Number of blocks on top of (and including) the containing block.
    /// Filled on direct lookups only.
    pub confirmations: Option<u64>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub value_in: u64,
    #[serde(default)]
    pub value_out: u64,
    #[serde(default)]
    pub fees: u64,
    /// Serialized size in bytes.
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub is_coinbase: bool,
}

fn default_version() -> u32 {
    1
}

impl TransactionInfo {
    /// Builds an unconfirmed transaction and derives its value totals.
    pub fn new(txid: impl Into<TxId>, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let is_coinbase = !inputs.is_empty() && inputs.iter().all(|i| i.prev_txid.is_none());
        let mut info = Self {
            txid: txid.into(),
            version: default_version(),
            locktime: 0,
            block_hash: None,
            block_height: None,
            time: 0,
            confirmations: None,
            inputs,
            outputs,
            value_in: 0,
            value_out: 0,
            fees: 0,
            size: 0,
            is_coinbase,
        };
        info.recompute_totals();
        info
    }

    /// Recomputes `value_in`, `value_out` and `fees` from inputs and
    /// outputs. Coinbase transactions pay no fee.
    pub fn recompute_totals(&mut self) {
        self.value_in = self.inputs.iter().map(|i| i.value).sum();
        self.value_out = self.outputs.iter().map(|o| o.value).sum();
        self.fees = if self.is_coinbase {
            0
        } else {
            self.value_in.saturating_sub(self.value_out)
        };
    }
}

/// Aggregate transaction history of one address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressHistory {
    pub address: String,
    /// Transaction ids in discovery order.
    pub transactions: Vec<TxId>,
    pub total_received: u64,
    pub total_sent: u64,
}

impl AddressHistory {
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Whether the index has ever seen funds arrive at this address.
    pub fn has_received_funds(&self) -> bool {
        self.total_received > 0
    }
}

// ---------------------------------------------------------------------------
// Listing Request
// ---------------------------------------------------------------------------

/// Scope parameters of a listing request. Field names on the wire follow
/// the query string of the public API (`from`, `to`, `block`, `address`,
/// `pageNum`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeParams {
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub block: Option<String>,
    pub address: Option<String>,
    /// Zero-indexed page. Ignored for range scopes.
    #[serde(rename = "pageNum")]
    pub page: Option<usize>,
}

/// The single scope a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Range { from: u64, to: u64 },
    Block { id: String, page: Option<usize> },
    Address { address: String, page: Option<usize> },
    Empty,
}

impl Scope {
    /// Applies the precedence rule: a complete height range wins, then a
    /// block, then an address. A lone `from` or `to` is not a range.
    pub fn classify(params: &ScopeParams) -> Self {
        if let (Some(from), Some(to)) = (params.from, params.to) {
            return Self::Range { from, to };
        }
        if let Some(id) = params.block.as_deref().filter(|b| !b.is_empty()) {
            return Self::Block {
                id: id.to_string(),
                page: params.page,
            };
        }
        if let Some(address) = params.address.as_deref().filter(|a| !a.is_empty()) {
            return Self::Address {
                address: address.to_string(),
                page: params.page,
            };
        }
        Self::Empty
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Range { .. } => ScopeKind::Range,
            Self::Block { .. } => ScopeKind::Block,
            Self::Address { .. } => ScopeKind::Address,
            Self::Empty => ScopeKind::Empty,
        }
    }
}

/// Label-friendly discriminant of [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Range,
    Block,
    Address,
    Empty,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::Block => "block",
            Self::Address => "address",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Listing Response
// ---------------------------------------------------------------------------

/// One entry of a listing: the full record, or a stub carrying only the id
/// when hydration failed. Both are valid list elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionSummary {
    Full(Box<TransactionInfo>),
    Stub { txid: TxId },
}

impl TransactionSummary {
    pub fn txid(&self) -> &str {
        match self {
            Self::Full(info) => &info.txid,
            Self::Stub { txid } => txid,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub { .. })
    }
}

/// Response of a listing request. `pages_total` is present for block and
/// address scopes only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListing {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pages_total: Option<usize>,
    pub txs: Vec<TransactionSummary>,
}

impl TransactionListing {
    pub fn empty() -> Self {
        Self::default()
    }
}
