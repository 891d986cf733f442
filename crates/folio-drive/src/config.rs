//! Drive connection settings.

use folio_core::{defaults, Error, Result};

/// Connection settings for the Drive API.
///
/// The tree served by the application is the subtree rooted at
/// `root_folder_id`. All metadata requests carry `api_key`; export
/// downloads go through the public export endpoint and need no key.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Base URL of the Drive v2 API.
    pub api_base: String,
    /// Base URL for document export downloads.
    pub export_base: String,
    /// API key appended to every metadata request.
    pub api_key: String,
    /// Folder at the top of the published tree.
    pub root_folder_id: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl DriveConfig {
    /// Create from environment variables.
    ///
    /// `DRIVE_API_KEY` and `DRIVE_ROOT_FOLDER_ID` are required. The
    /// endpoints and timeout fall back to the public Google defaults
    /// (`DRIVE_API_BASE`, `DRIVE_EXPORT_BASE`, `DRIVE_TIMEOUT_SECS`).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("DRIVE_API_KEY")
            .map_err(|_| Error::Config("DRIVE_API_KEY is not set".to_string()))?;
        let root_folder_id = std::env::var("DRIVE_ROOT_FOLDER_ID")
            .map_err(|_| Error::Config("DRIVE_ROOT_FOLDER_ID is not set".to_string()))?;

        let api_base = std::env::var("DRIVE_API_BASE")
            .unwrap_or_else(|_| defaults::DRIVE_API_BASE.to_string());
        let export_base = std::env::var("DRIVE_EXPORT_BASE")
            .unwrap_or_else(|_| defaults::DRIVE_EXPORT_BASE.to_string());
        let timeout_secs = std::env::var("DRIVE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::DRIVE_TIMEOUT_SECS);

        Ok(Self {
            api_base,
            export_base,
            api_key,
            root_folder_id,
            timeout_secs,
        })
    }
}
