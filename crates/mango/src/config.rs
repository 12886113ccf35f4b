use std::{env, time::Duration};

const DEFAULT_RATING_RANGES: [i64; 5] = [1, 2, 3, 4, 5];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    /// Note: Only used when the `memory` feature is enabled.
    #[allow(dead_code)]
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "mango.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
    /// Rating scale returned with every question (default: 1..=5)
    pub rating_ranges: Vec<i64>,
    /// Base URL of the reservation lookup service. Reservation criteria
    /// are rejected when unset.
    pub reservation_lookup_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "mango.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `RATING_RANGES` - Comma-separated rating scale (default: "1,2,3,4,5")
    /// - `RESERVATION_LOOKUP_URL` - Reservation lookup base URL (optional)
    pub fn from_env() -> Self {
        Self {
            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "mango.db".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            rating_ranges: env::var("RATING_RANGES")
                .map(|v| parse_rating_ranges(&v))
                .unwrap_or_else(|_| DEFAULT_RATING_RANGES.to_vec()),
            reservation_lookup_url: env::var("RESERVATION_LOOKUP_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Parses a comma-separated rating scale, skipping entries that are not
/// integers. Falls back to 1..=5 when nothing valid remains.
fn parse_rating_ranges(raw: &str) -> Vec<i64> {
    let ranges: Vec<i64> = raw
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    if ranges.is_empty() {
        DEFAULT_RATING_RANGES.to_vec()
    } else {
        ranges
    }
}
