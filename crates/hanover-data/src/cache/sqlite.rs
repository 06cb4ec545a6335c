//! SQLite store for warehouse query results.

use crate::codec::FramePayload;
use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// Persistent cache of query results, keyed by the query's cache key.
///
/// The payload is the frame in the same column-oriented JSON form the
/// warehouse uses on the wire, so a cached result is indistinguishable from
/// a fresh one.
#[derive(Debug)]
pub struct QueryCache {
    conn: Connection,
}

impl QueryCache {
    /// Open (or create) a cache at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS query_results (
                cache_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Whether a result is present for the key.
    pub fn contains(&self, cache_key: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM query_results WHERE cache_key = ?1",
            params![cache_key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Fetch a cached result, or `None` if absent.
    pub fn get(&self, cache_key: &str) -> Result<Option<DataFrame>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM query_results WHERE cache_key = ?1",
                params![cache_key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(text) => {
                let decoded: FramePayload = serde_json::from_str(&text)?;
                Ok(Some(decoded.to_frame()?))
            }
            None => Ok(None),
        }
    }

    /// Store (or replace) a result under the key.
    pub fn put(&self, cache_key: &str, frame: &DataFrame) -> Result<()> {
        let payload = serde_json::to_string(&FramePayload::from_frame(frame)?)?;
        let cached_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO query_results (cache_key, payload, row_count, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![cache_key, payload, frame.height() as i64, cached_at],
        )?;
        Ok(())
    }

    /// When the result under the key was cached, if present.
    pub fn cached_at(&self, cache_key: &str) -> Result<Option<DateTime<Utc>>> {
        let stamp: Option<String> = self
            .conn
            .query_row(
                "SELECT cached_at FROM query_results WHERE cache_key = ?1",
                params![cache_key],
                |row| row.get(0),
            )
            .optional()?;

        stamp
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| DataError::Parse(format!("bad cache timestamp: {e}")))
            })
            .transpose()
    }

    /// Remove a single cached result.
    pub fn remove(&self, cache_key: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM query_results WHERE cache_key = ?1",
            params![cache_key],
        )?;
        Ok(())
    }

    /// Remove all cached results.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM query_results", [])?;
        Ok(())
    }

    /// Cache statistics.
    pub fn stats(&self) -> Result<CacheStats> {
        let entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM query_results", [], |row| row.get(0))?;
        let rows: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(row_count), 0) FROM query_results",
            [],
            |row| row.get(0),
        )?;
        Ok(CacheStats {
            entries: entries as usize,
            total_rows: rows as usize,
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached query results
    pub entries: usize,
    /// Total panel rows across all cached results
    pub total_rows: usize,
}
