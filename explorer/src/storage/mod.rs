//! # Storage Layer
//!
//! A sled-backed chain index that implements every port the listing engine
//! queries, plus the pieces around it:
//!
//! - **db** — [`ChainStore`]: blocks, transactions, address aggregates and
//!   chain metadata in named sled trees.
//! - **cache** — [`CachedAddressIndex`]: remembers the last good aggregate
//!   per address and offers it as stale data when a refresh fails.
//! - **import** — [`BlockImport`] and the loader for JSON block dumps.

pub mod cache;
pub mod db;
pub mod import;

pub use cache::CachedAddressIndex;
pub use db::ChainStore;
pub use import::{import_blocks, read_dump, BlockImport};
