//! # folio-drive
//!
//! Google Drive access for the published folder tree.
//!
//! This crate provides:
//! - A read-only client for the Drive v2 API (`DriveClient`)
//! - The `TreeProvider` implementation used by search and the HTTP API
//! - Document export for the local content cache
//! - Timestamp parsing for Drive's millisecond-precision `modifiedDate`
//!
//! The tree is rooted at a single configured folder. Folders are matched
//! by exact MIME type, files by the Docs document family; anything else
//! Drive returns is invisible to callers.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::TreeProvider;
//! use folio_drive::DriveClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = DriveClient::from_env().unwrap();
//!     let folders = client.list_root_folders().await.unwrap();
//!     for folder in folders {
//!         println!("{} ({})", folder.name, folder.id);
//!     }
//! }
//! ```

pub mod client;
pub mod config;

pub use client::{parse_modified_timestamp, DriveClient, DRIVE_TIMESTAMP_FORMAT};
pub use config::DriveConfig;
