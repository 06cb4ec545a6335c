//! Caching of warehouse query results.
//!
//! Two layers: a SQLite store that persists results across sessions, and a
//! small in-memory LRU memo that keeps recently decoded frames hot within a
//! session.

mod memo;
mod sqlite;

pub use memo::{DEFAULT_CAPACITY, ResultCache};
pub use sqlite::{CacheStats, QueryCache};
