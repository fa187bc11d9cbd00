//! # Listing Engine
//!
//! Turns scope parameters into an ordered, paginated, hydrated transaction
//! list.
//!
//! ## Data Flow
//!
//! ```text
//! ScopeParams ─► Scope::classify
//!                   │
//!        ┌──────────┼───────────────┐
//!        ▼          ▼               ▼
//!  RangeResolver  ScopeProvider   ScopeProvider
//!  (heights→hash) (block → txids) (address → txids)
//!        │          │               │
//!        ▼          ▼               ▼
//!  ScopeProvider   paginate        paginate
//!  (flatten)        │               │
//!        └──────────┴───────┬───────┘
//!                           ▼
//!                    DetailFetcher (bounded fan-out, order kept)
//!                           ▼
//!                  TransactionListing
//! ```
//!
//! Range listings are never paginated; callers narrow the range instead.

pub mod fetcher;
pub mod orchestrator;
pub mod pagination;
pub mod range;
pub mod scope;

pub use fetcher::DetailFetcher;
pub use orchestrator::Explorer;
pub use pagination::{paginate, total_pages, Page};
pub use range::RangeResolver;
pub use scope::ScopeProvider;
