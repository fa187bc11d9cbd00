//! Error types for the explorer.
//!
//! [`IndexError`] is what a collaborator (block index, address index,
//! transaction store) reports. [`ListingError`] is what a listing request
//! fails with; every variant carries an [`ErrorKind`] so the HTTP layer can
//! pick a status code without matching on variants.

use thiserror::Error;

use crate::types::{BlockHash, TxId};

// ---------------------------------------------------------------------------
// IndexError
// ---------------------------------------------------------------------------

/// Failures reported by the backing indices and stores.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

// ---------------------------------------------------------------------------
// ListingError
// ---------------------------------------------------------------------------

/// Coarse classification of a [`ListingError`], mapped 1:1 to HTTP status
/// classes by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 400: the request describes a scope that cannot be resolved.
    BadRequest,
    /// 404: the block, address, or transaction does not exist.
    NotFound,
    /// 500: an index failed while resolving an otherwise valid scope.
    Internal,
}

/// Scope-level failures. Any of these aborts the whole listing request.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("invalid block range: from {from} is greater than to {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("block range spans {width} heights, limit is {max}")]
    RangeTooWide { width: u64, max: u64 },

    #[error("block height {height} could not be resolved")]
    UnresolvedHeight { height: u64 },

    #[error("lookup of block height {height} failed: {source}")]
    RangeLookupFailed {
        height: u64,
        #[source]
        source: IndexError,
    },

    #[error("block {0} resolved but its record is missing")]
    MissingBlock(BlockHash),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("invalid address: {0}")]
    AddressNotFound(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(TxId),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

impl ListingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange { .. }
            | Self::RangeTooWide { .. }
            | Self::UnresolvedHeight { .. }
            | Self::RangeLookupFailed { .. } => ErrorKind::BadRequest,
            Self::BlockNotFound(_) | Self::AddressNotFound(_) | Self::TransactionNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::MissingBlock(_) | Self::Index(_) => ErrorKind::Internal,
        }
    }
}
