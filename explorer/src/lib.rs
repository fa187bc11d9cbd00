// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Chainsight Explorer — Core Library
//!
//! Read-only aggregation over a chain's blocks and transactions. Explorers
//! and wallets that cannot talk to a node directly ask this crate for
//! transaction listings scoped by a block-height range, a single block, or
//! an address, and get back ordered, paginated, hydrated records.
//!
//! ## Architecture
//!
//! - **types** — Scope parameters, block/transaction/address records, and
//!   the listing response shape.
//! - **ports** — The collaborator traits the engine queries: block index,
//!   address index, transaction store.
//! - **listing** — The enumeration and pagination engine: range resolver,
//!   scope provider, pagination slicer, detail fetcher, and the
//!   [`listing::Explorer`] that ties them together.
//! - **diagnostics** — Injected sink for degraded items and scope failures.
//! - **storage** — A sled-backed store implementing every port, plus a
//!   caching wrapper for address aggregates.
//! - **rpc** — Pass-through client for raw transaction submission and
//!   retrieval against the upstream node.
//! - **address** — Base58check address encoding and validation.
//! - **config** — Constants and tunables (page length, fan-out bounds).
//! - **error** — Error types shared across the crate.
//!
//! ## Failure Model
//!
//! Scope-level failures (an unresolvable height, an unknown block, an
//! invalid address) fail the whole request. Item-level failures (one
//! transaction that cannot be hydrated) degrade to a stub `{txid}` entry and
//! are reported through the [`diagnostics::DiagnosticSink`]. A successful
//! listing may therefore contain stub entries.

pub mod address;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod listing;
pub mod ports;
pub mod rpc;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{IndexError, ListingError};
pub use listing::Explorer;
