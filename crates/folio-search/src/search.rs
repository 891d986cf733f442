//! Substring search over the cached file text.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use folio_core::{File, FileCacheRepository, Result, SearchResult, TreeProvider};
use folio_db::Database;

use crate::sync::CacheSynchronizer;

/// Search front end over the local content cache.
///
/// Every query synchronizes the cache first, then resolves the matched
/// ids against that same walk of the tree.
pub struct SearchService<P: TreeProvider> {
    synchronizer: CacheSynchronizer<P>,
    db: Database,
}

impl<P: TreeProvider> SearchService<P> {
    pub fn new(provider: Arc<P>, db: Database) -> Self {
        Self {
            synchronizer: CacheSynchronizer::new(provider, db.clone()),
            db,
        }
    }

    /// Case-insensitive substring search over titles and contents.
    ///
    /// The query text is matched literally; `%` and `_` have no wildcard
    /// meaning here.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let start = Instant::now();

        let files = self.synchronizer.synchronize().await?;
        let matched = self.db.file_cache.search(query).await?;
        let results = map_ids_to_results(&matched, &files);

        debug!(
            subsystem = "search",
            op = "query",
            matched = matched.len(),
            results = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );

        Ok(results)
    }
}

/// Resolve matched cache ids back to entries from the current walk.
///
/// A matched id with no counterpart in the walk is dropped without
/// notice; a file deleted upstream simply stops appearing.
fn map_ids_to_results(ids: &[String], files: &[File]) -> Vec<SearchResult> {
    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(file) = files.iter().find(|file| &file.id == id) {
            results.push(SearchResult {
                id: file.id.clone(),
                name: file.name.clone(),
            });
        }
    }
    results
}
