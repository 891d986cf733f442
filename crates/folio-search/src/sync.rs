//! Cache synchronization against the folder tree.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use folio_core::{strip_tags, File, FileCacheRepository, Node, Result, TreeProvider};
use folio_db::Database;
use folio_drive::parse_modified_timestamp;

/// Keeps the local text cache in step with the remote tree.
///
/// A pass walks every folder, exports the files whose `modifiedDate` is
/// newer than the cached snapshot, and stores their stripped text.
pub struct CacheSynchronizer<P: TreeProvider> {
    provider: Arc<P>,
    db: Database,
}

impl<P: TreeProvider> CacheSynchronizer<P> {
    pub fn new(provider: Arc<P>, db: Database) -> Self {
        Self { provider, db }
    }

    /// Walk the whole tree and return every file in it.
    pub async fn collect_files(&self) -> Result<Vec<File>> {
        walk_tree(self.provider.as_ref()).await
    }

    /// Bring the cache entries for `files` up to date.
    ///
    /// An entry is stale when it is missing or when the file's
    /// `modifiedDate` is strictly newer than the cached snapshot. A
    /// malformed timestamp aborts the whole pass; entries refreshed
    /// before the abort stay written.
    pub async fn refresh(&self, files: &[File]) -> Result<()> {
        let start = Instant::now();
        let snapshot = self.db.file_cache.snapshot().await?;
        let mut refreshed = 0usize;

        for file in files {
            let modified = parse_modified_timestamp(&file.last_updated)?;
            let stale = match snapshot.get(&file.id) {
                Some(entry) => modified > entry.snapshot_timestamp,
                None => true,
            };
            if !stale {
                continue;
            }

            let exported = self.provider.export_content(&file.id).await?;
            let text = strip_tags(&exported);
            self.db
                .file_cache
                .replace(&file.id, &file.name, &text)
                .await?;
            refreshed += 1;
        }

        debug!(
            subsystem = "search",
            op = "refresh",
            files = files.len(),
            refreshed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Cache refresh complete"
        );

        Ok(())
    }

    /// Full pass: walk the tree, refresh what changed, return the walk.
    pub async fn synchronize(&self) -> Result<Vec<File>> {
        let files = self.collect_files().await?;
        self.refresh(&files).await?;
        Ok(files)
    }
}

/// Iterative walk over the folder tree.
///
/// Folder ids go onto a worklist and are drained until none remain;
/// files are collected as their parent folder is listed.
async fn walk_tree<P: TreeProvider>(provider: &P) -> Result<Vec<File>> {
    let mut files = Vec::new();
    let mut pending: Vec<String> = provider
        .list_root_folders()
        .await?
        .into_iter()
        .map(|folder| folder.id)
        .collect();

    while let Some(folder_id) = pending.pop() {
        for node in provider.list_children(&folder_id).await? {
            match node {
                Node::Folder(folder) => pending.push(folder.id),
                Node::File(file) => files.push(file),
            }
        }
    }

    Ok(files)
}
