//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations. It also
//! owns the partition-level operations of the store: enumerating, opening,
//! and deleting partitions.

use super::migrations;
use super::partition::{Partition, read_entry};
use crate::{Error, Request, Response};
use std::path::Path;
use tokio_rusqlite::{Connection, params};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the same connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
    pub(crate) quota_bytes: Option<u64>,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations. `quota_bytes` caps the total size of
    /// stored bodies across all partitions.
    pub async fn open(path: impl AsRef<Path>, quota_bytes: Option<u64>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, quota_bytes).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, None).await
    }

    async fn init(conn: Connection, quota_bytes: Option<u64>) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, quota_bytes })
    }

    /// Same database with a different quota.
    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Open a partition, creating it if it does not exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }
        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![owned, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), name: name.to_string() })
    }

    /// Whether a partition with this name exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Partition names in creation order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no such partition existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name is not in `keep`.
    ///
    /// Returns the deleted names in creation order.
    pub async fn delete_all_except(&self, keep: &[String]) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.keys().await? {
            if keep.contains(&name) {
                continue;
            }
            if self.delete_partition(&name).await? {
                tracing::info!(partition = %name, "deleted stale cache partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Look a request up across every partition, oldest partition first.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let key = super::hash::request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.status, e.status_text, e.headers_json, e.body
                     FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.key_hash = ?1
                     ORDER BY p.rowid ASC
                     LIMIT 1",
                )?;
                read_entry(&mut stmt, &key)
            })
            .await
            .map_err(Error::from)
    }

    /// Total stored body bytes across all partitions.
    pub async fn stored_bytes(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let total: i64 = conn.query_row("SELECT COALESCE(SUM(body_size), 0) FROM entries", [], |row| row.get(0))?;
                Ok(total as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> ::url::Url {
        ::url::Url::parse("http://localhost:8080/").unwrap()
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_keys_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("static-v1").await.unwrap();
        db.open_partition("dynamic-v1").await.unwrap();
        db.open_partition("static-v0").await.unwrap();
        db.open_partition("static-v1").await.unwrap();

        assert_eq!(db.keys().await.unwrap(), vec!["static-v1", "dynamic-v1", "static-v0"]);
    }

    #[tokio::test]
    async fn test_delete_all_except() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["static-v1", "dynamic-v1", "static-v0"] {
            db.open_partition(name).await.unwrap();
        }

        let keep = vec!["static-v1".to_string(), "dynamic-v1".to_string()];
        let deleted = db.delete_all_except(&keep).await.unwrap();

        assert_eq!(deleted, vec!["static-v0"]);
        assert_eq!(db.keys().await.unwrap(), vec!["static-v1", "dynamic-v1"]);
    }

    #[tokio::test]
    async fn test_delete_partition_drops_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let partition = db.open_partition("old").await.unwrap();
        let request = Request::get("/app.js", &origin()).unwrap();
        partition.put(&request, &Response::new(200, "OK", "js")).await.unwrap();

        assert!(db.delete_partition("old").await.unwrap());
        assert!(!db.has_partition("old").await.unwrap());
        assert!(db.match_any(&request).await.unwrap().is_none());
        assert!(!db.delete_partition("old").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.open_partition("first").await.unwrap();
        let second = db.open_partition("second").await.unwrap();
        let request = Request::get("/index.html", &origin()).unwrap();

        second.put(&request, &Response::new(200, "OK", "second")).await.unwrap();
        first.put(&request, &Response::new(200, "OK", "first")).await.unwrap();

        let found = db.match_any(&request).await.unwrap().unwrap();
        assert_eq!(found.body, b"first");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!("ruralcare-reopen-{}.sqlite", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let request = Request::get("/styles.css", &origin()).unwrap();

        {
            let db = CacheDb::open(&path, None).await.unwrap();
            let partition = db.open_partition("static").await.unwrap();
            partition.put(&request, &Response::new(200, "OK", "body{}")).await.unwrap();
        }

        let db = CacheDb::open(&path, None).await.unwrap();
        let partition = db.open_partition("static").await.unwrap();
        let found = partition.match_request(&request).await.unwrap().unwrap();
        assert_eq!(found.body, b"body{}");

        drop(partition);
        drop(db);
        let _ = std::fs::remove_file(&path);
    }
}
