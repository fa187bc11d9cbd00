//! # Listing Configuration & Constants
//!
//! The page length is part of the API contract and never changes per
//! scope. The fan-out bounds are tunables: they cap how many concurrent
//! calls a single listing request issues against the block index and the
//! transaction store, and should be sized to what those services sustain.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of transactions in one page. Identical for every scope.
pub const PAGE_LENGTH: usize = 10;

/// Default number of in-flight index/store calls per fan-out.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 8;

/// Hard ceiling on the configurable fan-out concurrency.
pub const MAX_FANOUT_CONCURRENCY: usize = 64;

/// Default maximum number of heights a single range request may span.
pub const DEFAULT_MAX_RANGE_WIDTH: u64 = 100;

/// Default timeout for calls to the upstream node RPC.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upstream node RPC endpoint (bitcoind-style).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8332";

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Rejected configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fanout_concurrency must be between 1 and {max}, got {got}")]
    FanoutConcurrency { got: usize, max: usize },

    #[error("max_range_width must be at least 1")]
    MaxRangeWidth,

    #[error("rpc url must not be empty")]
    EmptyRpcUrl,
}

// ---------------------------------------------------------------------------
// ListingConfig
// ---------------------------------------------------------------------------

/// Tunables for the listing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Maximum concurrent calls while resolving heights, fetching blocks,
    /// or hydrating transactions.
    pub fanout_concurrency: usize,
    /// Widest `[from, to)` range accepted by the range scope.
    pub max_range_width: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            max_range_width: DEFAULT_MAX_RANGE_WIDTH,
        }
    }
}

impl ListingConfig {
    /// Checks the bounds. Call once after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fanout_concurrency == 0 || self.fanout_concurrency > MAX_FANOUT_CONCURRENCY {
            return Err(ConfigError::FanoutConcurrency {
                got: self.fanout_concurrency,
                max: MAX_FANOUT_CONCURRENCY,
            });
        }
        if self.max_range_width == 0 {
            return Err(ConfigError::MaxRangeWidth);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Connection settings for the upstream node's JSON-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            user: None,
            password: None,
            timeout_secs: DEFAULT_RPC_TIMEOUT.as_secs(),
        }
    }
}

impl RpcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyRpcUrl);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
