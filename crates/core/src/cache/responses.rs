//! Cached response storage.
//!
//! Rows are keyed by [`compute_cache_key`] over the cache name and the
//! canonical request URL, so each worker scope gets an isolated cache.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A response held in a named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key: String,
    pub cache_name: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Build a row for `url` in `cache_name`, stamped with the current time.
    pub fn new(cache_name: &str, url: &str, status: u16, body: Vec<u8>) -> Self {
        Self {
            key: compute_cache_key(cache_name, url),
            cache_name: cache_name.to_string(),
            url: url.to_string(),
            status,
            content_type: None,
            headers_json: None,
            body,
            etag: None,
            last_modified: None,
            stored_at: timestamp(chrono::Utc::now()),
        }
    }
}

/// Response metadata without the body, for listings and tool output.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ResponseSummary {
    pub key: String,
    pub cache_name: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub stored_at: String,
    pub body_len: usize,
}

impl From<&StoredResponse> for ResponseSummary {
    fn from(r: &StoredResponse) -> Self {
        Self {
            key: r.key.clone(),
            cache_name: r.cache_name.clone(),
            url: r.url.clone(),
            status: r.status,
            content_type: r.content_type.clone(),
            etag: r.etag.clone(),
            last_modified: r.last_modified.clone(),
            stored_at: r.stored_at.clone(),
            body_len: r.body.len(),
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT key, cache_name, url, status, content_type, headers_json,
        body, etag, last_modified, stored_at FROM responses";

fn row_to_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredResponse> {
    Ok(StoredResponse {
        key: row.get(0)?,
        cache_name: row.get(1)?,
        url: row.get(2)?,
        status: row.get(3)?,
        content_type: row.get(4)?,
        headers_json: row.get(5)?,
        body: row.get(6)?,
        etag: row.get(7)?,
        last_modified: row.get(8)?,
        stored_at: row.get(9)?,
    })
}

impl CacheDb {
    /// Insert or replace a cached response.
    ///
    /// Uses UPSERT semantics on the key, so storing the same URL again in the
    /// same cache overwrites the previous copy.
    pub async fn put_response(&self, response: &StoredResponse) -> Result<(), Error> {
        let r = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (
                    key, cache_name, url, status, content_type, headers_json,
                    body, etag, last_modified, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(key) DO UPDATE SET
                    cache_name = excluded.cache_name,
                    url = excluded.url,
                    status = excluded.status,
                    content_type = excluded.content_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    etag = excluded.etag,
                    last_modified = excluded.last_modified,
                    stored_at = excluded.stored_at",
                    params![
                        &r.key,
                        &r.cache_name,
                        &r.url,
                        r.status,
                        &r.content_type,
                        &r.headers_json,
                        &r.body,
                        &r.etag,
                        &r.last_modified,
                        &r.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the cached copy of `url` in `cache_name`.
    pub async fn match_response(&self, cache_name: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let key = compute_cache_key(cache_name, url);
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE key = ?1"))?;
                match stmt.query_row(params![key], row_to_response) {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the cached copy of `url`. Returns whether a row was deleted.
    pub async fn delete_response(&self, cache_name: &str, url: &str) -> Result<bool, Error> {
        let key = compute_cache_key(cache_name, url);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let n = conn.execute("DELETE FROM responses WHERE key = ?1", params![key])?;
                Ok(n > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List metadata for every response in `cache_name`, newest first.
    pub async fn list_responses(&self, cache_name: &str) -> Result<Vec<ResponseSummary>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<ResponseSummary>, Error> {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_COLUMNS} WHERE cache_name = ?1 ORDER BY stored_at DESC"))?;
                let rows = stmt.query_map(params![cache_name], row_to_response)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(ResponseSummary::from(&row?));
                }
                Ok(out)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete responses stored more than `max_age` ago.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_older_than(&self, max_age: chrono::Duration) -> Result<u64, Error> {
        let cutoff = chrono::Utc::now()
            .checked_sub_signed(max_age)
            .map(timestamp)
            .ok_or_else(|| Error::InvalidInput(format!("max age of {} days is out of range", max_age.num_days())))?;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM responses WHERE stored_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete responses whose URL contains `domain`.
    ///
    /// `%` and `_` in `domain` match literally. Returns the number of
    /// deleted entries.
    pub async fn purge_by_domain(&self, domain: &str) -> Result<u64, Error> {
        let pattern = format!("%{}%", escape_like(domain));
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count =
                    conn.execute("DELETE FROM responses WHERE url LIKE ?1 ESCAPE '\\'", params![pattern])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries until at most `max_entries` remain.
    ///
    /// With a cache name only that cache is trimmed; without one the limit
    /// applies to the whole table. Returns the number of deleted entries.
    pub async fn purge_lru(&self, cache_name: Option<&str>, max_entries: usize) -> Result<u64, Error> {
        let max = max_entries as i64;
        let cache_name = cache_name.map(str::to_string);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = match cache_name {
                    Some(name) => {
                        let count: i64 = conn.query_row(
                            "SELECT COUNT(*) FROM responses WHERE cache_name = ?1",
                            params![name],
                            |row| row.get(0),
                        )?;
                        if count <= max {
                            return Ok(0);
                        }
                        conn.execute(
                            "DELETE FROM responses WHERE key IN (
                            SELECT key FROM responses WHERE cache_name = ?1
                            ORDER BY stored_at ASC LIMIT ?2
                        )",
                            params![name, count - max],
                        )?
                    }
                    None => {
                        let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
                        if count <= max {
                            return Ok(0);
                        }
                        conn.execute(
                            "DELETE FROM responses WHERE key IN (
                            SELECT key FROM responses ORDER BY stored_at ASC LIMIT ?1
                        )",
                            params![count - max],
                        )?
                    }
                };
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(cache_name: &str, url: &str, stored_at: &str) -> StoredResponse {
        StoredResponse {
            content_type: Some("text/css".to_string()),
            stored_at: stored_at.to_string(),
            ..StoredResponse::new(cache_name, url, 200, b"body { margin: 0 }".to_vec())
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let response = make_response("book", "https://example.com/reader.css", "2026-01-01T00:00:00+00:00");

        db.put_response(&response).await.unwrap();

        let found = db.match_response("book", "https://example.com/reader.css").await.unwrap().unwrap();
        assert_eq!(found, response);
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_cache_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_response(&make_response("book-a", "https://example.com/a.css", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();

        let other = db.match_response("book-b", "https://example.com/a.css").await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/ch1.html";
        db.put_response(&StoredResponse::new("book", url, 200, b"old".to_vec())).await.unwrap();
        db.put_response(&StoredResponse::new("book", url, 200, b"new".to_vec())).await.unwrap();

        let found = db.match_response("book", url).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.list_responses("book").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_response() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/cover.jpg";
        db.put_response(&StoredResponse::new("book", url, 200, vec![0xff, 0xd8])).await.unwrap();

        assert!(db.delete_response("book", url).await.unwrap());
        assert!(!db.delete_response("book", url).await.unwrap());
        assert!(db.match_response("book", url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_by_domain() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_response(&make_response("book", "https://example.com/a.css", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();
        db.put_response(&make_response("book", "https://other.com/b.css", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();

        let deleted = db.purge_by_domain("example.com").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.match_response("book", "https://other.com/b.css").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_by_domain_matches_wildcards_literally() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_response(&make_response("book", "https://example.com/a.css", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();
        db.put_response(&make_response("book", "https://ex_mple.org/b.css", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();

        assert_eq!(db.purge_by_domain("ex_mple.com").await.unwrap(), 0);
        assert_eq!(db.purge_by_domain("%").await.unwrap(), 0);
        assert!(db.match_response("book", "https://example.com/a.css").await.unwrap().is_some());

        assert_eq!(db.purge_by_domain("ex_mple.org").await.unwrap(), 1);
        assert!(db.match_response("book", "https://example.com/a.css").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_older_than_out_of_range() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_response(&StoredResponse::new("book", "https://example.com/a.css", 200, Vec::new()))
            .await
            .unwrap();

        let err = db.purge_older_than(chrono::Duration::MAX).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(db.match_response("book", "https://example.com/a.css").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = timestamp(chrono::Utc::now() - chrono::Duration::days(10));
        db.put_response(&make_response("book", "https://example.com/old.css", &old))
            .await
            .unwrap();
        db.put_response(&StoredResponse::new("book", "https://example.com/new.css", 200, Vec::new()))
            .await
            .unwrap();

        let deleted = db.purge_older_than(chrono::Duration::days(7)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.match_response("book", "https://example.com/new.css").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_lru_per_cache() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_response(&make_response("book", "https://example.com/1.css", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();
        db.put_response(&make_response("book", "https://example.com/2.css", "2026-01-02T00:00:00+00:00"))
            .await
            .unwrap();
        db.put_response(&make_response("other", "https://example.com/3.css", "2025-01-01T00:00:00+00:00"))
            .await
            .unwrap();

        let deleted = db.purge_lru(Some("book"), 1).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.match_response("book", "https://example.com/1.css").await.unwrap().is_none());
        assert!(db.match_response("book", "https://example.com/2.css").await.unwrap().is_some());
        assert!(db.match_response("other", "https://example.com/3.css").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_lru_global_under_limit() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_response(&StoredResponse::new("book", "https://example.com/a.js", 200, Vec::new()))
            .await
            .unwrap();
        assert_eq!(db.purge_lru(None, 5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_responses_newest_first() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_response(&make_response("book", "https://example.com/1.css", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();
        db.put_response(&make_response("book", "https://example.com/2.css", "2026-01-02T00:00:00+00:00"))
            .await
            .unwrap();

        let listed = db.list_responses("book").await.unwrap();
        assert_eq!(listed[0].url, "https://example.com/2.css");
        assert_eq!(listed[0].body_len, 18);
    }
}
