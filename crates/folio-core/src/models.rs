//! Core data models for folio.
//!
//! These types are shared across all folio crates and represent the core
//! domain entities: the remote document tree, the local text cache, and
//! user accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// DOCUMENT TREE TYPES
// =============================================================================

/// A folder node in the remote document tree.
///
/// Folders are transient: they are constructed per request from remote
/// listings and never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Opaque identifier assigned by the remote provider.
    pub id: String,
    pub name: String,
}

/// A file (leaf document) in the remote document tree.
///
/// `created` and `last_updated` carry the provider's timestamp strings
/// verbatim. Parsing is deferred to the cache refresh, where a malformed
/// value fails the whole refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub name: String,
    pub created: String,
    pub last_updated: String,
    pub last_modified_by: String,
}

/// A single entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Folder(Folder),
    File(File),
}

impl Node {
    /// Remote identifier of the underlying node.
    pub fn id(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.id,
            Node::File(file) => &file.id,
        }
    }

    /// Display name of the underlying node.
    pub fn name(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.name,
            Node::File(file) => &file.name,
        }
    }
}

// =============================================================================
// CACHE TYPES
// =============================================================================

/// One row of the cache snapshot batch read (contents column not loaded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFileMeta {
    pub file_id: String,
    pub title: String,
    /// When the cached contents were captured (UTC, set at replacement time).
    pub snapshot_timestamp: DateTime<Utc>,
}

/// Identity subset of a matched file returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
}

// =============================================================================
// USER TYPES
// =============================================================================

/// An application user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub is_admin: bool,
    pub is_disabled: bool,
    /// Set on account creation; cleared when the user picks a new password.
    pub force_password_change: bool,
    pub created_at_utc: DateTime<Utc>,
}

/// User identity resolved from a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub is_disabled: bool,
    pub is_admin: bool,
}

impl AuthUser {
    /// Whether this user currently holds admin rights. Use this instead of
    /// reading `is_admin` directly: a disabled account never has rights.
    pub fn has_admin_rights(&self) -> bool {
        self.is_admin && !self.is_disabled
    }
}

/// Request to create a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Request to update a user's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_disabled: Option<bool>,
}

/// Credentials presented at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_accessors() {
        let folder = Node::Folder(Folder {
            id: "f1".to_string(),
            name: "Policies".to_string(),
        });
        assert_eq!(folder.id(), "f1");
        assert_eq!(folder.name(), "Policies");

        let file = Node::File(File {
            id: "d1".to_string(),
            name: "Onboarding".to_string(),
            created: "2023-01-01T00:00:00.000Z".to_string(),
            last_updated: "2023-02-01T00:00:00.000Z".to_string(),
            last_modified_by: "jdoe".to_string(),
        });
        assert_eq!(file.id(), "d1");
        assert_eq!(file.name(), "Onboarding");
    }

    #[test]
    fn test_node_serde_tagging() {
        let node = Node::Folder(Folder {
            id: "f1".to_string(),
            name: "Policies".to_string(),
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "folder");
        assert_eq!(json["id"], "f1");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_admin_rights_require_enabled_account() {
        let mut user = AuthUser {
            id: Uuid::nil(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            is_disabled: false,
            is_admin: true,
        };
        assert!(user.has_admin_rights());

        user.is_disabled = true;
        assert!(!user.has_admin_rights());

        user.is_disabled = false;
        user.is_admin = false;
        assert!(!user.has_admin_rights());
    }
}
