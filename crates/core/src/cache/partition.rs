//! Entry operations on a single named partition.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::{Error, Request, Response};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Statement, Transaction};

/// Handle to an open partition.
///
/// Cheap to clone; every operation goes through the shared connection.
#[derive(Clone, Debug)]
pub struct Partition {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

/// Row shape shared by every entry write.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("only GET requests are cached, got {}", request.method())));
        }
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::StorageFailure(format!("failed to encode headers: {e}")))?;
        Ok(Self {
            key_hash: request_key(request),
            method: request.method().to_string(),
            url: request.url().to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json,
            body: response.body.clone(),
        })
    }
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored response for this request, if any.
    ///
    /// Non-GET requests never match.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let name = self.name.clone();
        let key = request_key(request);
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                     FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;
                let result = stmt.query_row(params![name, key], row_to_response);
                match result {
                    Ok(r) => Ok(Some(r?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry for this request.
    ///
    /// Uses UPSERT semantics, so a second put of the same response leaves the
    /// entry unchanged. Fails with `StorageFailure` when the write would
    /// exceed the store quota; storage is left untouched in that case.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        let name = self.name.clone();
        let quota = self.db.quota_bytes;
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                upsert(&tx, &name, &row)?;
                enforce_quota(&tx, quota)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
            .map_err(as_storage_failure)
    }

    /// Write every entry in one transaction, or none of them.
    pub async fn put_all(&self, entries: &[(Request, Response)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let name = self.name.clone();
        let quota = self.db.quota_bytes;
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    upsert(&tx, &name, row)?;
                }
                enforce_quota(&tx, quota)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
            .map_err(as_storage_failure)
    }

    /// Remove the entry for this request.
    ///
    /// Returns false if nothing was stored.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let name = self.name.clone();
        let key = request_key(request);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2", params![
                    name, key
                ])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in this partition, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this partition.
    pub async fn len(&self) -> Result<usize, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

fn upsert(tx: &Transaction<'_>, partition: &str, row: &EntryRow) -> Result<(), Error> {
    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![partition, now],
    )?;
    tx.execute(
        "INSERT INTO entries (
            partition, key_hash, method, url, status, status_text,
            headers_json, body, body_size, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(partition, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            body_size = excluded.body_size,
            stored_at = excluded.stored_at",
        params![
            partition,
            &row.key_hash,
            &row.method,
            &row.url,
            row.status as i64,
            &row.status_text,
            &row.headers_json,
            &row.body,
            row.body.len() as i64,
            now,
        ],
    )?;
    Ok(())
}

fn enforce_quota(tx: &Transaction<'_>, quota: Option<u64>) -> Result<(), Error> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let used: i64 = tx.query_row("SELECT COALESCE(SUM(body_size), 0) FROM entries", [], |row| row.get(0))?;
    if used as u64 > quota {
        return Err(Error::StorageFailure(format!("quota exceeded: {used} bytes stored, quota is {quota}")));
    }
    Ok(())
}

/// Any failure while writing is reported as a storage failure.
fn as_storage_failure(err: Error) -> Error {
    match err {
        Error::Database(e) => Error::StorageFailure(e.to_string()),
        other => other,
    }
}

fn row_to_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Response, Error>> {
    let status: i64 = row.get(0)?;
    let status_text: String = row.get(1)?;
    let headers_json: String = row.get(2)?;
    let body: Vec<u8> = row.get(3)?;
    Ok(serde_json::from_str(&headers_json)
        .map(|headers| Response { status: status as u16, status_text, headers, body })
        .map_err(|e| Error::StorageFailure(format!("corrupt headers in cache entry: {e}"))))
}

/// Run a single-row entry lookup prepared by the caller, bound to `key`.
pub(crate) fn read_entry(stmt: &mut Statement<'_>, key: &str) -> Result<Option<Response>, Error> {
    match stmt.query_row(params![key], row_to_response) {
        Ok(r) => Ok(Some(r?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
