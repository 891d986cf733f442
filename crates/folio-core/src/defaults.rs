//! Centralized default constants for the folio system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates should reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// SESSIONS
// =============================================================================

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "folio_session";

/// Days a session stays valid when `SESSION_TTL_DAYS` is unset.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Length of generated session tokens.
pub const SESSION_TOKEN_LEN: usize = 48;

// =============================================================================
// DRIVE
// =============================================================================

/// Default Drive API base URL (v2 file listings and lookups).
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v2";

/// Default document export base URL.
pub const DRIVE_EXPORT_BASE: &str = "https://docs.google.com/document/d";

/// Default outbound request timeout in seconds.
pub const DRIVE_TIMEOUT_SECS: u64 = 30;

/// Mime type the provider uses for folder nodes.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host.
pub const HOST: &str = "0.0.0.0";

/// Default bind port.
pub const PORT: u16 = 8080;

/// Default request body size limit in bytes (user management payloads are
/// small; nothing larger should arrive).
pub const BODY_LIMIT_BYTES: usize = 256 * 1024;
