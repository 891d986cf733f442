//! # folio-search
//!
//! Cache synchronization and substring search over the folder tree.
//!
//! This crate provides:
//! - `CacheSynchronizer`: walks the tree and keeps the local text cache
//!   in step with each file's `modifiedDate`
//! - `SearchService`: case-insensitive substring search over cached
//!   titles and contents, resolved back against a fresh walk
//!
//! Search is read-your-writes: every query runs a synchronization pass
//! first, so a document edited upstream is searchable as soon as the
//! query that follows it completes.

pub mod search;
pub mod sync;

pub use search::SearchService;
pub use sync::CacheSynchronizer;
