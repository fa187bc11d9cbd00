//! Block range resolver.
//!
//! Maps `[from, to)` to canonical block hashes. Lookups run concurrently up
//! to the configured bound, but output position `i` is always height
//! `from + i`. One unresolvable height voids the whole range.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::error::ListingError;
use crate::ports::BlockIndex;
use crate::types::BlockHash;

#[derive(Clone)]
pub struct RangeResolver {
    blocks: Arc<dyn BlockIndex>,
    concurrency: usize,
    max_width: u64,
}

impl RangeResolver {
    pub fn new(blocks: Arc<dyn BlockIndex>, concurrency: usize, max_width: u64) -> Self {
        Self {
            blocks,
            concurrency: concurrency.max(1),
            max_width,
        }
    }

    /// Rejects inverted and over-wide ranges before any index call.
    /// `from == to` is a valid, empty range.
    pub fn check_bounds(&self, from: u64, to: u64) -> Result<(), ListingError> {
        if from > to {
            return Err(ListingError::InvalidRange { from, to });
        }
        let width = to - from;
        if width > self.max_width {
            return Err(ListingError::RangeTooWide {
                width,
                max: self.max_width,
            });
        }
        Ok(())
    }

    /// Resolves every height in `[from, to)` to its block hash, in height
    /// order.
    pub async fn resolve(&self, from: u64, to: u64) -> Result<Vec<BlockHash>, ListingError> {
        self.check_bounds(from, to)?;

        stream::iter(from..to)
            .map(|height| {
                let blocks = Arc::clone(&self.blocks);
                async move {
                    match blocks.resolve_height(height).await {
                        Ok(Some(hash)) => Ok(hash),
                        Ok(None) => Err(ListingError::UnresolvedHeight { height }),
                        Err(source) => Err(ListingError::RangeLookupFailed { height, source }),
                    }
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}
