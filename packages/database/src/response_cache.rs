//! Persistent cache of live search API responses stored in `DuckDB`.
//!
//! Keys are the endpoint URL plus a canonical (sorted) parameter string,
//! so the same request with reordered parameters hits the same entry.
//! Entries never expire.

use std::path::Path;

use duckdb::Connection;
use serde_json::Value;

use crate::DbError;

/// Builds the cache key for a request.
#[must_use]
pub fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_unstable();

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        endpoint.to_string()
    } else {
        format!("{endpoint}?{query}")
    }
}

/// Key to JSON response mapping.
pub struct ResponseCache {
    conn: Connection,
}

impl ResponseCache {
    /// Opens (or creates) the response cache at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens the response cache at the default path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_default() -> Result<Self, DbError> {
        Self::open(&crate::paths::search_cache_db_path())
    }

    /// Opens a throwaway in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Looks up a cached response.
    ///
    /// An entry whose stored JSON no longer parses is treated as a miss.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn get(&self, key: &str) -> Result<Option<Value>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT response_json FROM api_response_cache WHERE cache_key = ?")?;
        let raw: String = match stmt.query_row([key], |row| row.get(0)) {
            Ok(v) => v,
            Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(DbError::DuckDb(e)),
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("Ignoring corrupt cache entry for {key}: {e}");
                Ok(None)
            }
        }
    }

    /// Stores a response, replacing any previous entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the upsert fails.
    pub fn put(&self, key: &str, endpoint: &str, response: &Value) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO api_response_cache (cache_key, endpoint, response_json)
             VALUES (?, ?, ?)
             ON CONFLICT (cache_key) DO UPDATE SET
                response_json = EXCLUDED.response_json,
                created_at = CURRENT_TIMESTAMP",
            duckdb::params![key, endpoint, response.to_string()],
        )?;
        Ok(())
    }

    /// Number of cached responses.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn len(&self) -> Result<u64, DbError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM api_response_cache", [], |row| row.get(0))?;
        u64::try_from(n).map_err(|e| DbError::Conversion {
            message: format!("negative cache size: {e}"),
        })
    }

    /// Whether the cache holds no responses.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn is_empty(&self) -> Result<bool, DbError> {
        Ok(self.len()? == 0)
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS api_response_cache (
            cache_key TEXT PRIMARY KEY,
            endpoint TEXT NOT NULL,
            response_json TEXT NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        );",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_independent_of_parameter_order() {
        let a = cache_key(
            "https://api.yelp.com/v3/businesses/search",
            &[("term", "Tacos"), ("location", "98101")],
        );
        let b = cache_key(
            "https://api.yelp.com/v3/businesses/search",
            &[("location", "98101"), ("term", "Tacos")],
        );
        assert_eq!(a, b);
        assert_eq!(
            a,
            "https://api.yelp.com/v3/businesses/search?location=98101&term=Tacos"
        );
    }

    #[test]
    fn key_without_parameters_is_endpoint() {
        assert_eq!(cache_key("https://x/y", &[]), "https://x/y");
    }

    #[test]
    fn miss_then_hit() {
        let cache = ResponseCache::open_in_memory().unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
        assert!(cache.is_empty().unwrap());

        let body = json!({"businesses": [{"id": "abc"}], "total": 1});
        cache.put("k", "https://x/search", &body).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(body));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = ResponseCache::open_in_memory().unwrap();
        cache.put("k", "e", &json!({"v": 1})).unwrap();
        cache.put("k", "e", &json!({"v": 2})).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(json!({"v": 2})));
        assert_eq!(cache.len().unwrap(), 1);
    }
}
