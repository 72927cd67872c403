//! Redb-backed document store for scrape results.
//!
//! Each collection is one table. Keys are 24 bytes: the capture instant as
//! big-endian order-preserving nanoseconds followed by the document UUID, so
//! a plain key scan is chronological. Values are JSON-encoded
//! [`PageExtract`] documents.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fetchlog_config::{ensure_parent_dir, resolve_path};
use fetchlog_web::PageExtract;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult, doc_err};

/// A scrape document as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredExtract {
    pub id: Uuid,
    pub page: PageExtract,
}

pub struct ScrapeStore {
    db: Arc<Database>,
    path: PathBuf,
    collection: Arc<str>,
}

impl std::fmt::Debug for ScrapeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeStore")
            .field("db", &"<Database>")
            .field("path", &self.path)
            .field("collection", &self.collection)
            .finish()
    }
}

fn table(name: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(name)
}

impl ScrapeStore {
    /// Open (or create) the database file and make sure `collection` exists.
    pub fn open(database_path: &str, collection: &str) -> StoreResult<Self> {
        let path = resolve_path(database_path);
        ensure_parent_dir(&path)?;

        let collection = collection.trim();
        if collection.is_empty() {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }

        let db = Database::create(&path).map_err(doc_err)?;
        let txn = db.begin_write().map_err(doc_err)?;
        {
            // Opening the table creates it if it doesn't exist
            let _ = txn.open_table(table(collection)).map_err(doc_err)?;
        }
        txn.commit().map_err(doc_err)?;

        debug!(path=%path.display(), collection, "store.documents.open");
        Ok(Self {
            db: Arc::new(db),
            path,
            collection: Arc::from(collection),
        })
    }

    pub fn resolved_path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Append `page`, returning its new document id.
    pub async fn insert(&self, page: &PageExtract) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        let key = document_key(&page.captured_at, &id);
        let value = serde_json::to_vec(page)?;
        let db = self.db.clone();
        let collection = self.collection.clone();

        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let txn = db.begin_write().map_err(doc_err)?;
            {
                let mut t = txn.open_table(table(&collection)).map_err(doc_err)?;
                t.insert(key.as_slice(), value.as_slice()).map_err(doc_err)?;
            }
            txn.commit().map_err(doc_err)?;
            Ok(())
        })
        .await??;

        info!(
            id=%id,
            url=%page.url,
            success=page.success,
            collection=%self.collection,
            "store.documents.insert"
        );
        Ok(id)
    }

    /// Up to `n` most recent documents, newest first.
    pub async fn latest(&self, n: usize) -> StoreResult<Vec<StoredExtract>> {
        let db = self.db.clone();
        let collection = self.collection.clone();

        let docs = tokio::task::spawn_blocking(move || -> StoreResult<Vec<StoredExtract>> {
            let txn = db.begin_read().map_err(doc_err)?;
            let t = txn.open_table(table(&collection)).map_err(doc_err)?;
            let mut out = Vec::with_capacity(n.min(64));
            for entry in t.iter().map_err(doc_err)?.rev().take(n) {
                let (k, v) = entry.map_err(doc_err)?;
                out.push(StoredExtract {
                    id: id_from_key(k.value())?,
                    page: serde_json::from_slice(v.value())?,
                });
            }
            Ok(out)
        })
        .await??;

        debug!(
            requested = n,
            returned = docs.len(),
            "store.documents.latest"
        );
        Ok(docs)
    }
}

fn document_key(at: &DateTime<Utc>, id: &Uuid) -> [u8; 24] {
    // Flip the sign bit so negative instants still sort before positive ones.
    let nanos = at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros().saturating_mul(1_000));
    let ordered = (nanos as u64) ^ (1 << 63);

    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&ordered.to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}

fn id_from_key(key: &[u8]) -> StoreResult<Uuid> {
    key.get(8..24)
        .and_then(|raw| Uuid::from_slice(raw).ok())
        .ok_or_else(|| StoreError::Corrupt(format!("document key of {} bytes", key.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fetchlog_common::{Failure, FailureKind};
    use fetchlog_web::{Extracted, LinkEntry};
    use tempfile::TempDir;

    fn page(url: &str, at: DateTime<Utc>) -> PageExtract {
        let mut page = PageExtract::success(
            url,
            200,
            Extracted {
                title: format!("title of {url}"),
                heading: "h".into(),
                links: vec![LinkEntry {
                    text: "a".into(),
                    href: format!("{url}a"),
                }],
            },
        );
        page.captured_at = at;
        page
    }

    fn db_path(tmp: &TempDir) -> String {
        tmp.path()
            .join("docs")
            .join("scraping.db")
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn latest_returns_newest_first_and_honours_n() {
        let tmp = TempDir::new().unwrap();
        let store = ScrapeStore::open(&db_path(&tmp), "scrape_results").unwrap();
        let t0 = Utc::now();
        // inserted out of order on purpose
        for (offset, url) in [
            (2, "https://c.test/"),
            (0, "https://a.test/"),
            (1, "https://b.test/"),
        ] {
            store
                .insert(&page(url, t0 + Duration::seconds(offset)))
                .await
                .unwrap();
        }

        let latest = store.latest(2).await.unwrap();
        let urls: Vec<&str> = latest.iter().map(|d| d.page.url.as_str()).collect();
        assert_eq!(urls, vec!["https://c.test/", "https://b.test/"]);
        assert_eq!(store.latest(10).await.unwrap().len(), 3);
        assert!(store.latest(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_documents_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = ScrapeStore::open(&db_path(&tmp), "scrape_results").unwrap();
        let failure = Failure::new(
            FailureKind::Timeout,
            "timeout: the page did not answer within 5s",
        );
        let doc = PageExtract::failure("https://slow.test/", 0, &failure);
        let id = store.insert(&doc).await.unwrap();

        let latest = store.latest(5).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, id);
        assert_eq!(latest[0].page, doc);
    }

    #[tokio::test]
    async fn collections_are_isolated_and_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = db_path(&tmp);
        {
            let store = ScrapeStore::open(&path, "one").unwrap();
            store
                .insert(&page("https://x.test/", Utc::now()))
                .await
                .unwrap();
            assert_eq!(store.collection(), "one");
        }
        let other = ScrapeStore::open(&path, "two").unwrap();
        assert!(other.latest(5).await.unwrap().is_empty());
        drop(other);
        let reopened = ScrapeStore::open(&path, "one").unwrap();
        assert_eq!(reopened.latest(5).await.unwrap().len(), 1);
    }

    #[test]
    fn keys_sort_chronologically() {
        let id = Uuid::new_v4();
        let t = Utc::now();
        let earlier = document_key(&(t - Duration::milliseconds(1)), &id);
        let later = document_key(&t, &id);
        assert!(earlier < later);
        assert_eq!(id_from_key(&later).unwrap(), id);
    }

    #[test]
    fn blank_collection_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = ScrapeStore::open(&db_path(&tmp), "  ").unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection(_)), "{err}");
        assert!(err.to_string().starts_with("invalid collection name"));
    }
}
