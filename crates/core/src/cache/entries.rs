//! Entry CRUD operations.
//!
//! Entries are owned by their partition, overwritten on re-fetch and never
//! merged. Every write is atomic at entry granularity.

use super::connection::PartitionStore;
use super::hash::compute_key_hash;
use super::partitions::Partition;
use crate::Error;
use crate::http::{Headers, Request, Response};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored request/response pair.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub partition: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub inserted_at: String,
}

struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            key_hash: compute_key_hash(request),
            method: request.method.to_string(),
            url: request.url.to_string(),
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

fn row_to_response(status: u16, headers_json: &str, body: Vec<u8>) -> Result<Response, Error> {
    let headers: Headers = serde_json::from_str(headers_json)?;
    Ok(Response { status, headers, body: Bytes::from(body) })
}

/// Current usage minus the bytes of the entry about to be replaced.
fn usage_excluding(conn: &rusqlite::Connection, partition_id: i64, key_hash: &str) -> Result<u64, Error> {
    let total: i64 = conn.query_row("SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries", [], |row| row.get(0))?;
    let existing: i64 = conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries WHERE partition_id = ?1 AND key_hash = ?2",
        params![partition_id, key_hash],
        |row| row.get(0),
    )?;
    Ok((total - existing).max(0) as u64)
}

fn upsert(conn: &rusqlite::Connection, partition_id: i64, row: &EntryRow, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (partition_id, key_hash, method, url, status, headers_json, body, inserted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(partition_id, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            inserted_at = excluded.inserted_at",
        params![partition_id, row.key_hash, row.method, row.url, row.status, row.headers_json, row.body, now],
    )?;
    Ok(())
}

impl PartitionStore {
    /// Store a response for a request, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::QuotaExceeded` if the write would push total usage past
    /// the store quota. Nothing is written in that case.
    pub async fn put(&self, partition: &Partition, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        let partition_id = partition.id;
        let quota = self.quota_bytes;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let used = usage_excluding(conn, partition_id, &row.key_hash)?;
                if used.saturating_add(row.body.len() as u64) > quota {
                    return Err(Error::QuotaExceeded(format!(
                        "{} bytes for {} exceeds remaining quota",
                        row.body.len(),
                        row.url
                    )));
                }
                upsert(conn, partition_id, &row, &now)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_all(&self, partition: &Partition, entries: &[(Request, Response)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(req, resp)| EntryRow::new(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let partition_id = partition.id;
        let quota = self.quota_bytes;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    let used = usage_excluding(&tx, partition_id, &row.key_hash)?;
                    if used.saturating_add(row.body.len() as u64) > quota {
                        return Err(Error::QuotaExceeded(format!("bulk write of {} entries", rows.len())));
                    }
                    upsert(&tx, partition_id, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in one partition.
    pub async fn match_entry(&self, partition: &Partition, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = compute_key_hash(request);
        let partition_id = partition.id;
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body FROM entries WHERE partition_id = ?1 AND key_hash = ?2",
                    params![partition_id, key_hash],
                    |row| Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                );

                match result {
                    Ok((status, headers_json, body)) => row_to_response(status, &headers_json, body).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request across every partition, oldest partition first.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = compute_key_hash(request);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT e.status, e.headers_json, e.body
                     FROM entries e JOIN partitions p ON p.id = e.partition_id
                     WHERE e.key_hash = ?1
                     ORDER BY p.id ASC LIMIT 1",
                    params![key_hash],
                    |row| Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                );

                match result {
                    Ok((status, headers_json, body)) => row_to_response(status, &headers_json, body).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of a partition in insertion-key order.
    pub async fn entries(&self, partition: &Partition) -> Result<Vec<CacheEntry>, Error> {
        let partition_id = partition.id;
        let partition_name = partition.name.clone();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, inserted_at
                     FROM entries WHERE partition_id = ?1 ORDER BY url ASC",
                )?;
                let rows = stmt
                    .query_map(params![partition_id], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u16>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(method, url, status, headers_json, body, inserted_at)| {
                        Ok(CacheEntry {
                            partition: partition_name.clone(),
                            method,
                            url,
                            response: row_to_response(status, &headers_json, body)?,
                            inserted_at,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn entry_count(&self, partition: &Partition) -> Result<u64, Error> {
        let partition_id = partition.id;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition_id = ?1", params![partition_id], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(url: &str) -> Request {
        Request::get(url).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let store = PartitionStore::open_in_memory().await.unwrap();
        let partition = store.open_partition("static-cache-v1.0.3").await.unwrap();
        let request = req("http://localhost:8000/static/css/style.css");
        let response = Response::new(200, "body{}").with_header("content-type", "text/css");

        store.put(&partition, &request, &response).await.unwrap();

        let cached = store.match_entry(&partition, &request).await.unwrap().unwrap();
        assert_eq!(cached, response);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let store = PartitionStore::open_in_memory().await.unwrap();
        let partition = store.open_partition("static-cache-v1.0.3").await.unwrap();
        let result = store
            .match_entry(&partition, &req("http://localhost:8000/missing.js"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = PartitionStore::open_in_memory().await.unwrap();
        let partition = store.open_partition("api-cache-v1.0.3").await.unwrap();
        let request = req("http://localhost:8000/api/historial");

        store.put(&partition, &request, &Response::new(200, "old")).await.unwrap();
        store.put(&partition, &request, &Response::new(200, "new")).await.unwrap();

        let cached = store.match_entry(&partition, &request).await.unwrap().unwrap();
        assert_eq!(cached.body, Bytes::from("new"));
        assert_eq!(store.entry_count(&partition).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_match_any_searches_all_partitions() {
        let store = PartitionStore::open_in_memory().await.unwrap();
        store.open_partition("static-cache-v1.0.3").await.unwrap();
        let api = store.open_partition("api-cache-v1.0.3").await.unwrap();
        let request = req("http://localhost:8000/api/productos/buscar?q=vino");

        store.put(&api, &request, &Response::new(200, "{}")).await.unwrap();

        let cached = store.match_any(&request).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn test_delete_partition_drops_entries() {
        let store = PartitionStore::open_in_memory().await.unwrap();
        let partition = store.open_partition("dynamic-cache-v1.0.0").await.unwrap();
        let request = req("http://localhost:8000/icons/icon-72x72.png");
        store.put(&partition, &request, &Response::new(200, "png")).await.unwrap();

        store.delete("dynamic-cache-v1.0.0").await.unwrap();

        assert!(store.match_any(&request).await.unwrap().is_none());
        assert_eq!(store.total_size_bytes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let store = PartitionStore::open_in_memory().await.unwrap().with_quota(10);
        let partition = store.open_partition("static-cache-v1.0.3").await.unwrap();

        store
            .put(&partition, &req("http://localhost:8000/a"), &Response::new(200, "123456"))
            .await
            .unwrap();
        let result = store
            .put(&partition, &req("http://localhost:8000/b"), &Response::new(200, "123456"))
            .await;
        assert!(matches!(result, Err(Error::QuotaExceeded(_))));
        assert_eq!(store.total_size_bytes().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_quota_counts_replaced_entry_once() {
        let store = PartitionStore::open_in_memory().await.unwrap().with_quota(10);
        let partition = store.open_partition("static-cache-v1.0.3").await.unwrap();
        let request = req("http://localhost:8000/a");

        store.put(&partition, &request, &Response::new(200, "12345678")).await.unwrap();
        store.put(&partition, &request, &Response::new(200, "87654321")).await.unwrap();
        assert_eq!(store.total_size_bytes().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_put_all_is_atomic() {
        let store = PartitionStore::open_in_memory().await.unwrap().with_quota(10);
        let partition = store.open_partition("static-cache-v1.0.3").await.unwrap();
        let batch = vec![
            (req("http://localhost:8000/a"), Response::new(200, "12345")),
            (req("http://localhost:8000/b"), Response::new(200, "12345")),
            (req("http://localhost:8000/c"), Response::new(200, "12345")),
        ];

        let result = store.put_all(&partition, &batch).await;
        assert!(matches!(result, Err(Error::QuotaExceeded(_))));
        assert_eq!(store.entry_count(&partition).await.unwrap(), 0);

        store.put_all(&partition, &batch[..2]).await.unwrap();
        assert_eq!(store.entry_count(&partition).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_entries_listing() {
        let store = PartitionStore::open_in_memory().await.unwrap();
        let partition = store.open_partition("static-cache-v1.0.3").await.unwrap();
        store
            .put(&partition, &req("http://localhost:8000/manifest.json"), &Response::new(200, "{}"))
            .await
            .unwrap();

        let entries = store.entries(&partition).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method, "GET");
        assert_eq!(entries[0].url, "http://localhost:8000/manifest.json");
        assert_eq!(entries[0].partition, "static-cache-v1.0.3");
    }
}
