//! End-to-end synchronization and search tests against live Postgres.
//!
//! A fake tree provider stands in for Drive so the tests can control
//! listings, export bodies, and modification timestamps exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use folio_core::{Error, File, Folder, Node, Result, TreeProvider};
use folio_db::test_fixtures::{fetch_cache_row, seed_cache_entry, seed_cache_entry_at, TestDatabase};
use folio_search::{CacheSynchronizer, SearchService};

struct FakeTree {
    roots: Vec<Folder>,
    children: HashMap<String, Vec<Node>>,
    contents: HashMap<String, String>,
    exports: AtomicUsize,
}

impl FakeTree {
    fn new() -> Self {
        Self {
            roots: Vec::new(),
            children: HashMap::new(),
            contents: HashMap::new(),
            exports: AtomicUsize::new(0),
        }
    }

    fn with_root(mut self, id: &str, name: &str) -> Self {
        self.roots.push(folder(id, name));
        self
    }

    fn with_children(mut self, folder_id: &str, nodes: Vec<Node>) -> Self {
        self.children.insert(folder_id.to_string(), nodes);
        self
    }

    fn with_content(mut self, file_id: &str, body: &str) -> Self {
        self.contents.insert(file_id.to_string(), body.to_string());
        self
    }

    fn export_count(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TreeProvider for FakeTree {
    async fn list_root_folders(&self) -> Result<Vec<Folder>> {
        Ok(self.roots.clone())
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<Node>> {
        Ok(self.children.get(folder_id).cloned().unwrap_or_default())
    }

    async fn get_folder(&self, folder_id: &str) -> Result<Folder> {
        Err(Error::NotFound(format!("folder {folder_id}")))
    }

    async fn get_file(&self, file_id: &str) -> Result<File> {
        Err(Error::NotFound(format!("file {file_id}")))
    }

    async fn export_content(&self, file_id: &str) -> Result<String> {
        self.exports.fetch_add(1, Ordering::SeqCst);
        self.contents
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("file {file_id}")))
    }
}

fn folder(id: &str, name: &str) -> Folder {
    Folder {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn file_node(id: &str, name: &str, last_updated: &str) -> Node {
    Node::File(File {
        id: id.to_string(),
        name: name.to_string(),
        created: "2023-01-01T08:00:00.000Z".to_string(),
        last_updated: last_updated.to_string(),
        last_modified_by: "Pat Doe".to_string(),
    })
}

const MODIFIED_2023: &str = "2023-06-01T12:00:00.000Z";

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn synchronize_populates_cache_from_the_tree() {
    let test_db = TestDatabase::new().await;
    let started = Utc::now();

    let tree = Arc::new(
        FakeTree::new()
            .with_root("team", "Team")
            .with_children(
                "team",
                vec![
                    file_node("doc-minutes", "Minutes", MODIFIED_2023),
                    Node::Folder(folder("nested", "Nested")),
                ],
            )
            .with_children(
                "nested",
                vec![file_node("doc-budget", "Budget", MODIFIED_2023)],
            )
            .with_content("doc-minutes", "<p>Weekly&nbsp;minutes</p>")
            .with_content("doc-budget", "<h1>Budget</h1><p>Q3 numbers</p>"),
    );

    let synchronizer = CacheSynchronizer::new(Arc::clone(&tree), test_db.db.clone());
    let files = synchronizer.synchronize().await.unwrap();

    let mut ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["doc-budget", "doc-minutes"]);

    let (title, contents, snapshot) = fetch_cache_row(&test_db.db, "doc-minutes")
        .await
        .expect("row should exist");
    assert_eq!(title, "Minutes");
    assert_eq!(contents, "Weekly minutes");
    assert!(snapshot >= started);

    let (_, contents, _) = fetch_cache_row(&test_db.db, "doc-budget")
        .await
        .expect("row should exist");
    assert_eq!(contents, "BudgetQ3 numbers");
    assert_eq!(tree.export_count(), 2);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn fresh_entries_are_not_re_exported() {
    let test_db = TestDatabase::new().await;

    let tree = Arc::new(
        FakeTree::new()
            .with_root("team", "Team")
            .with_children("team", vec![file_node("doc-1", "Minutes", MODIFIED_2023)])
            .with_content("doc-1", "<p>new body</p>"),
    );

    // Snapshot taken now, well after the 2023 modification date.
    seed_cache_entry(&test_db.db, "doc-1", "Minutes", "cached body").await;

    let synchronizer = CacheSynchronizer::new(Arc::clone(&tree), test_db.db.clone());
    synchronizer.synchronize().await.unwrap();

    assert_eq!(tree.export_count(), 0);
    let (_, contents, _) = fetch_cache_row(&test_db.db, "doc-1").await.unwrap();
    assert_eq!(contents, "cached body");

    // A second pass is idempotent.
    synchronizer.synchronize().await.unwrap();
    assert_eq!(tree.export_count(), 0);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn stale_entries_are_replaced() {
    let test_db = TestDatabase::new().await;
    let started = Utc::now();

    let tree = Arc::new(
        FakeTree::new()
            .with_root("team", "Team")
            .with_children("team", vec![file_node("doc-1", "Minutes", MODIFIED_2023)])
            .with_content("doc-1", "<p>fresh body</p>"),
    );

    // Snapshot predates the modification date, so the entry is stale.
    let old = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    seed_cache_entry_at(&test_db.db, "doc-1", "Minutes", "stale body", old).await;

    let synchronizer = CacheSynchronizer::new(Arc::clone(&tree), test_db.db.clone());
    synchronizer.synchronize().await.unwrap();

    assert_eq!(tree.export_count(), 1);
    let (_, contents, snapshot) = fetch_cache_row(&test_db.db, "doc-1").await.unwrap();
    assert_eq!(contents, "fresh body");
    assert!(snapshot >= started);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn malformed_timestamp_aborts_the_pass() {
    let test_db = TestDatabase::new().await;

    let tree = Arc::new(
        FakeTree::new()
            .with_root("team", "Team")
            .with_children(
                "team",
                vec![
                    file_node("doc-bad", "Broken", "not-a-timestamp"),
                    file_node("doc-good", "Minutes", MODIFIED_2023),
                ],
            )
            .with_content("doc-bad", "<p>never read</p>")
            .with_content("doc-good", "<p>never read either</p>"),
    );

    let synchronizer = CacheSynchronizer::new(Arc::clone(&tree), test_db.db.clone());
    let err = synchronizer.synchronize().await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));

    // The pass died on the first file; nothing was exported or written.
    assert_eq!(tree.export_count(), 0);
    assert!(fetch_cache_row(&test_db.db, "doc-bad").await.is_none());
    assert!(fetch_cache_row(&test_db.db, "doc-good").await.is_none());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn empty_tree_synchronizes_and_searches_to_nothing() {
    let test_db = TestDatabase::new().await;
    let tree = Arc::new(FakeTree::new());

    let service = SearchService::new(Arc::clone(&tree), test_db.db.clone());
    assert!(service.search("anything").await.unwrap().is_empty());
    assert_eq!(tree.export_count(), 0);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn search_matches_titles_and_contents() {
    let test_db = TestDatabase::new().await;

    let tree = Arc::new(
        FakeTree::new()
            .with_root("team", "Team")
            .with_children(
                "team",
                vec![
                    file_node("doc-budget", "Budget", MODIFIED_2023),
                    file_node("doc-handbook", "Handbook", MODIFIED_2023),
                ],
            )
            .with_content("doc-budget", "<p>quarterly review numbers</p>")
            .with_content("doc-handbook", "<p>office policies</p>"),
    );

    let service = SearchService::new(Arc::clone(&tree), test_db.db.clone());

    // Content match, case-insensitive.
    let results = service.search("QUARTERLY").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "doc-budget");
    assert_eq!(results[0].name, "Budget");

    // Title match.
    let results = service.search("handbook").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "doc-handbook");

    // Miss.
    assert!(service.search("zzz-absent").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn search_treats_wildcards_as_literal_text() {
    let test_db = TestDatabase::new().await;

    let tree = Arc::new(
        FakeTree::new()
            .with_root("team", "Team")
            .with_children(
                "team",
                vec![
                    file_node("doc-pct", "Progress A", MODIFIED_2023),
                    file_node("doc-x", "Progress B", MODIFIED_2023),
                ],
            )
            .with_content("doc-pct", "<p>rollout 100% complete</p>")
            .with_content("doc-x", "<p>rollout 100x complete</p>"),
    );

    let service = SearchService::new(Arc::clone(&tree), test_db.db.clone());

    // "%" must match only the literal percent sign.
    let results = service.search("100%").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "doc-pct");

    // Same for "_": one literal underscore, not any-single-character.
    let results = service.search("100_").await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn cache_rows_for_vanished_files_never_surface() {
    let test_db = TestDatabase::new().await;

    // A row left behind by a file that no longer exists in the tree.
    seed_cache_entry(&test_db.db, "ghost", "Orphaned", "orphaned budget notes").await;

    let tree = Arc::new(
        FakeTree::new()
            .with_root("team", "Team")
            .with_children(
                "team",
                vec![file_node("doc-live", "Live", MODIFIED_2023)],
            )
            .with_content("doc-live", "<p>live budget notes</p>"),
    );

    let service = SearchService::new(Arc::clone(&tree), test_db.db.clone());
    let results = service.search("budget notes").await.unwrap();

    // The ghost row matches in SQL but cannot be resolved to a file.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "doc-live");
}
