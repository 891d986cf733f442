//! Trait definitions for repositories and the remote tree provider.
//!
//! These traits define the interfaces between the storage layer, the remote
//! document tree, and the services built on top of them. Implementations
//! live in `folio-db` (Postgres) and `folio-drive` (Google Drive).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AuthUser, CachedFileMeta, CreateUserRequest, File, Folder, Node, UpdateUserRequest, User,
};

/// Read-only view over a remote folder/file tree.
///
/// One outbound request per call; implementations do not retry or paginate.
/// Every failure surfaces as an error, never as an empty result.
#[async_trait]
pub trait TreeProvider: Send + Sync {
    /// List the folders sitting at the configured root, sorted by name.
    ///
    /// Files directly in the root are not part of the tree and are skipped.
    async fn list_root_folders(&self) -> Result<Vec<Folder>>;

    /// List a folder's direct children (sub-folders and files), sorted by name.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<Node>>;

    /// Fetch a single folder by id. Fails with `NotFound` when the id does
    /// not resolve to a folder.
    async fn get_folder(&self, id: &str) -> Result<Folder>;

    /// Fetch a single file by id. Fails with `NotFound` when the id does
    /// not resolve to a document.
    async fn get_file(&self, id: &str) -> Result<File>;

    /// Fetch a file's exported plain-content body.
    async fn export_content(&self, file_id: &str) -> Result<String>;
}

/// Persistence for the searchable text cache.
#[async_trait]
pub trait FileCacheRepository: Send + Sync {
    /// Bulk-read cache metadata, keyed by file id. Taken once per refresh;
    /// callers must not re-read mid-loop.
    async fn snapshot(&self) -> Result<HashMap<String, CachedFileMeta>>;

    /// Replace a cache entry (delete + insert in one transaction), stamping
    /// the snapshot timestamp with the current time.
    async fn replace(&self, file_id: &str, title: &str, contents: &str) -> Result<()>;

    /// Ids of entries whose title or contents contain `query` as a
    /// case-insensitive literal substring.
    async fn search(&self, query: &str) -> Result<Vec<String>>;
}

/// User account persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create an account. New accounts must change their password on first
    /// login.
    async fn create(&self, req: CreateUserRequest) -> Result<User>;

    /// Fetch one user by id.
    async fn get(&self, id: Uuid) -> Result<Option<User>>;

    /// Fetch one user by username.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// List all users.
    async fn list(&self) -> Result<Vec<User>>;

    /// Update profile fields; absent fields are left unchanged.
    async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<User>;

    /// Delete an account and (via cascade) its sessions.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Grant or revoke the admin role.
    async fn set_role(&self, id: Uuid, is_admin: bool) -> Result<()>;

    /// Set a new password and clear the force-change flag.
    async fn set_password(&self, id: Uuid, password: &str) -> Result<()>;

    /// Verify a username/password pair.
    ///
    /// Returns `Unauthorized` for an unknown username or wrong password and
    /// `Forbidden` for a disabled account.
    async fn validate_login(&self, username: &str, password: &str) -> Result<User>;
}

/// Session token persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a session for `user_id` expiring at `expires`; returns the
    /// generated token.
    async fn create(&self, user_id: Uuid, expires: DateTime<Utc>) -> Result<String>;

    /// Resolve a token to its user. Expired tokens and disabled accounts
    /// resolve to `None`.
    async fn find_user(&self, token: &str) -> Result<Option<AuthUser>>;

    /// Delete every session belonging to `user_id`; returns the count.
    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64>;
}
