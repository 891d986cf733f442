//! Google Drive v2 API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use folio_core::{defaults, Error, File, Folder, Node, Result, TreeProvider};

use crate::config::DriveConfig;

/// Timestamp layout used by the Drive v2 API.
///
/// Drive reports `modifiedDate` with exactly three fractional digits and
/// a literal `Z` suffix, e.g. `2023-02-01T10:30:00.250Z`.
pub const DRIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Parse a Drive `modifiedDate` value into a UTC instant.
///
/// Anything that deviates from [`DRIVE_TIMESTAMP_FORMAT`] is rejected,
/// including offsets spelled as `+00:00` instead of `Z`.
pub fn parse_modified_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, DRIVE_TIMESTAMP_FORMAT)
        .map_err(|e| Error::Serialization(format!("invalid Drive timestamp {value:?}: {e}")))?;
    Ok(naive.and_utc())
}

/// Read-only client for the published Drive folder tree.
pub struct DriveClient {
    client: Client,
    api_base: String,
    export_base: String,
    api_key: String,
    root_folder_id: String,
}

impl DriveClient {
    /// Create a client with custom configuration.
    pub fn with_config(config: DriveConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            "Initializing Drive client: api_base={}, root={}",
            config.api_base, config.root_folder_id
        );

        Self {
            client,
            api_base: config.api_base,
            export_base: config.export_base,
            api_key: config.api_key,
            root_folder_id: config.root_folder_id,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(DriveConfig::from_env()?))
    }

    /// Folder at the top of the published tree.
    pub fn root_folder_id(&self) -> &str {
        &self.root_folder_id
    }

    /// Fetch the raw children of a folder, in Drive's own order.
    async fn list_items(&self, folder_id: &str) -> Result<Vec<DriveItem>> {
        let start = Instant::now();
        let url = format!("{}/files", self.api_base);
        let parent_query = format!("\"{folder_id}\" in parents");

        let response = self
            .client
            .get(&url)
            .query(&[("q", parent_query.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::Request(format!("Drive listing failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Drive listing returned {status}: {body}"
            )));
        }

        let listing: DriveListResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse Drive listing: {e}")))?;

        debug!(
            subsystem = "drive",
            op = "list",
            folder_id = %folder_id,
            items = listing.items.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed folder children"
        );

        Ok(listing.items)
    }

    /// Fetch a single item's metadata by id.
    ///
    /// A Drive 404 becomes [`Error::NotFound`]; other failure statuses
    /// are reported as request errors with the response body attached.
    async fn fetch_item(&self, item_id: &str) -> Result<DriveItem> {
        let url = format!("{}/files/{}", self.api_base, item_id);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::Request(format!("Drive lookup failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Drive item {item_id}")));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Drive lookup returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse Drive item: {e}")))
    }
}

#[async_trait]
impl TreeProvider for DriveClient {
    async fn list_root_folders(&self) -> Result<Vec<Folder>> {
        let items = self.list_items(&self.root_folder_id).await?;

        // Only folders are shown at the top level; loose files at the
        // root are not part of the published tree.
        let mut folders: Vec<Folder> = items
            .into_iter()
            .filter(|item| item.mime_type == defaults::FOLDER_MIME_TYPE)
            .map(|item| Folder {
                id: item.id,
                name: item.title,
            })
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(folders)
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<Node>> {
        let mut items = self.list_items(folder_id).await?;

        // Sort before mapping so folders and files interleave by name.
        items.sort_by(|a, b| a.title.cmp(&b.title));

        Ok(items.into_iter().filter_map(item_to_node).collect())
    }

    async fn get_folder(&self, folder_id: &str) -> Result<Folder> {
        let item = self.fetch_item(folder_id).await?;
        if item.mime_type != defaults::FOLDER_MIME_TYPE {
            return Err(Error::NotFound(format!("folder {folder_id}")));
        }

        Ok(Folder {
            id: item.id,
            name: item.title,
        })
    }

    async fn get_file(&self, file_id: &str) -> Result<File> {
        let item = self.fetch_item(file_id).await?;

        // Point lookups also serve uploaded PDFs, which listings skip.
        if !item.mime_type.contains("document") && !item.mime_type.contains("pdf") {
            return Err(Error::NotFound(format!("file {file_id}")));
        }

        Ok(item_to_file(item))
    }

    async fn export_content(&self, file_id: &str) -> Result<String> {
        let start = Instant::now();
        let url = format!("{}/{}/export", self.export_base, file_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Drive export failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Drive export returned {status}: {body}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("Failed to read export body: {e}")))?;

        debug!(
            subsystem = "drive",
            op = "export",
            file_id = %file_id,
            bytes = body.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Exported document"
        );

        Ok(body)
    }
}

fn item_to_file(item: DriveItem) -> File {
    File {
        id: item.id,
        name: item.title,
        created: item.created_date,
        last_updated: item.modified_date,
        last_modified_by: item.last_modifying_user_name,
    }
}

/// Map a listing entry onto the tree model.
///
/// Folders match the folder MIME type exactly; files must carry a Docs
/// document MIME. Everything else is dropped from listings.
fn item_to_node(item: DriveItem) -> Option<Node> {
    if item.mime_type == defaults::FOLDER_MIME_TYPE {
        Some(Node::Folder(Folder {
            id: item.id,
            name: item.title,
        }))
    } else if item.mime_type.contains("document") {
        Some(Node::File(item_to_file(item)))
    } else {
        None
    }
}

/// Response envelope for the Drive v2 file listing endpoint.
#[derive(Debug, Deserialize)]
struct DriveListResponse {
    #[serde(default)]
    items: Vec<DriveItem>,
}

/// A single file or folder as Drive reports it.
///
/// Fields default to empty when absent so partially populated items
/// (folders have no modifying user, for example) decode cleanly.
#[derive(Debug, Deserialize)]
struct DriveItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(rename = "createdDate", default)]
    created_date: String,
    #[serde(rename = "modifiedDate", default)]
    modified_date: String,
    #[serde(rename = "lastModifyingUserName", default)]
    last_modifying_user_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, title: &str, mime: &str) -> DriveItem {
        DriveItem {
            id: id.to_string(),
            title: title.to_string(),
            mime_type: mime.to_string(),
            created_date: "2023-01-01T08:00:00.000Z".to_string(),
            modified_date: "2023-01-02T09:30:00.000Z".to_string(),
            last_modifying_user_name: "Pat Doe".to_string(),
        }
    }

    #[test]
    fn parse_timestamp_accepts_drive_layout() {
        let parsed = parse_modified_timestamp("2023-02-01T10:30:00.250Z").unwrap();
        let expected = Utc.with_ymd_and_hms(2023, 2, 1, 10, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parse_timestamp_rejects_missing_millis() {
        assert!(parse_modified_timestamp("2023-02-01T10:30:00Z").is_err());
    }

    #[test]
    fn parse_timestamp_rejects_numeric_offset() {
        // Only the literal Z suffix is accepted.
        assert!(parse_modified_timestamp("2023-02-01T10:30:00.000+00:00").is_err());
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        let err = parse_modified_timestamp("not-a-timestamp").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn folder_items_map_to_folder_nodes() {
        let node = item_to_node(item("f1", "Reports", defaults::FOLDER_MIME_TYPE)).unwrap();
        match node {
            Node::Folder(folder) => {
                assert_eq!(folder.id, "f1");
                assert_eq!(folder.name, "Reports");
            }
            Node::File(_) => panic!("expected a folder node"),
        }
    }

    #[test]
    fn document_items_map_to_file_nodes() {
        let node = item_to_node(item(
            "d1",
            "Budget 2023",
            "application/vnd.google-apps.document",
        ))
        .unwrap();
        match node {
            Node::File(file) => {
                assert_eq!(file.id, "d1");
                assert_eq!(file.name, "Budget 2023");
                assert_eq!(file.created, "2023-01-01T08:00:00.000Z");
                assert_eq!(file.last_updated, "2023-01-02T09:30:00.000Z");
                assert_eq!(file.last_modified_by, "Pat Doe");
            }
            Node::Folder(_) => panic!("expected a file node"),
        }
    }

    #[test]
    fn unsupported_mime_types_are_dropped_from_listings() {
        assert!(item_to_node(item("s1", "Sheet", "application/vnd.google-apps.spreadsheet")).is_none());
        assert!(item_to_node(item("i1", "Photo", "image/png")).is_none());
        // PDFs are point-lookup only.
        assert!(item_to_node(item("p1", "Scan", "application/pdf")).is_none());
    }

    #[test]
    fn empty_envelope_decodes_to_no_items() {
        let listing: DriveListResponse = serde_json::from_str("{}").unwrap();
        assert!(listing.items.is_empty());
    }

    #[test]
    fn partial_items_decode_with_empty_defaults() {
        let listing: DriveListResponse = serde_json::from_str(
            r#"{"items": [{"id": "f1", "title": "Archive", "mimeType": "application/vnd.google-apps.folder"}]}"#,
        )
        .unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].last_modifying_user_name, "");
    }
}
