/// Health indicators
///
/// Each indicator probes one dependency and reports `up` or `down` with a
/// free-form `details` object. [`HealthReport`] aggregates several results
/// into the `{status, info, error, details}` shape returned by the health
/// endpoints.
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::health::{DatabaseIndicator, HealthIndicator, HealthReport};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) {
/// let database = DatabaseIndicator::new(pool);
/// let report = HealthReport::from_results(vec![database.check().await]);
/// println!("healthy: {}", report.is_ok());
/// # }
/// ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use tracing::warn;

use crate::db::pool::{get_pool_stats, health_check};

/// Indicator keys used in reports and routes
pub const DATABASE_KEY: &str = "database";
pub const MEMORY_HEAP_KEY: &str = "memoryHeap";
pub const MEMORY_RSS_KEY: &str = "memoryRss";
pub const STORAGE_KEY: &str = "storage";
pub const OBJECT_STORAGE_KEY: &str = "objectStorage";

/// Error type for probes that cannot produce a reading
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Probe is not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("Probe failed: {0}")]
    Probe(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Result of one indicator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthIndicatorResult {
    pub key: String,
    pub status: HealthStatus,
    pub details: Value,
}

impl HealthIndicatorResult {
    pub fn up(key: &str, details: Value) -> Self {
        Self {
            key: key.to_string(),
            status: HealthStatus::Up,
            details,
        }
    }

    pub fn down(key: &str, details: Value) -> Self {
        Self {
            key: key.to_string(),
            status: HealthStatus::Down,
            details,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }

    fn from_threshold(key: &str, used: u64, threshold: u64) -> Self {
        let details = json!({ "used": used, "threshold": threshold });
        if used <= threshold {
            Self::up(key, details)
        } else {
            Self::down(key, details)
        }
    }
}

/// A probe for one dependency
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    fn key(&self) -> &'static str;

    /// Never fails; problems are reported as `down`
    async fn check(&self) -> HealthIndicatorResult;
}

/// Aggregated health check body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// `ok` when every indicator is up, `error` otherwise
    pub status: &'static str,

    /// Details of indicators that are up
    pub info: Map<String, Value>,

    /// Details of indicators that are down
    pub error: Map<String, Value>,

    /// Details of every indicator
    pub details: Map<String, Value>,
}

impl HealthReport {
    pub fn from_results(results: Vec<HealthIndicatorResult>) -> Self {
        let mut info = Map::new();
        let mut error = Map::new();
        let mut details = Map::new();

        for result in results {
            let entry = json!({ "status": result.status, "details": result.details });
            details.insert(result.key.clone(), entry.clone());

            if result.is_up() {
                info.insert(result.key, entry);
            } else {
                error.insert(result.key, entry);
            }
        }

        Self {
            status: if error.is_empty() { "ok" } else { "error" },
            info,
            error,
            details,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}

/// Runs the indicators one after another and aggregates them
pub async fn check_all(indicators: &[&dyn HealthIndicator]) -> HealthReport {
    let mut results = Vec::with_capacity(indicators.len());
    for indicator in indicators {
        results.push(indicator.check().await);
    }
    HealthReport::from_results(results)
}

/// `SELECT 1` on the pool
pub struct DatabaseIndicator {
    pool: PgPool,
}

impl DatabaseIndicator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthIndicator for DatabaseIndicator {
    fn key(&self) -> &'static str {
        DATABASE_KEY
    }

    async fn check(&self) -> HealthIndicatorResult {
        match health_check(&self.pool).await {
            Ok(()) => HealthIndicatorResult::up(
                DATABASE_KEY,
                json!({ "pool": get_pool_stats(&self.pool) }),
            ),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                HealthIndicatorResult::down(DATABASE_KEY, json!({ "message": e.to_string() }))
            }
        }
    }
}

/// Which process memory figure to compare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    /// Data segment size (`VmData`)
    Heap,

    /// Resident set size (`VmRSS`)
    Rss,
}

impl MemoryKind {
    fn status_field(&self) -> &'static str {
        match self {
            MemoryKind::Heap => "VmData",
            MemoryKind::Rss => "VmRSS",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            MemoryKind::Heap => MEMORY_HEAP_KEY,
            MemoryKind::Rss => MEMORY_RSS_KEY,
        }
    }
}

/// Process memory against a byte threshold, read from `/proc/self/status`
pub struct MemoryIndicator {
    kind: MemoryKind,
    threshold: u64,
}

impl MemoryIndicator {
    pub fn new(kind: MemoryKind, threshold: u64) -> Self {
        Self { kind, threshold }
    }

    fn read_usage(&self) -> Result<u64, HealthError> {
        let status = std::fs::read_to_string("/proc/self/status")
            .map_err(|_| HealthError::Unsupported("/proc/self/status"))?;

        parse_proc_status(&status, self.kind.status_field())
            .ok_or_else(|| HealthError::Probe(format!("{} missing", self.kind.status_field())))
    }
}

#[async_trait]
impl HealthIndicator for MemoryIndicator {
    fn key(&self) -> &'static str {
        self.kind.key()
    }

    async fn check(&self) -> HealthIndicatorResult {
        match self.read_usage() {
            Ok(used) => HealthIndicatorResult::from_threshold(self.key(), used, self.threshold),
            Err(e) => HealthIndicatorResult::down(self.key(), json!({ "message": e.to_string() })),
        }
    }
}

/// Reads a `Field:   1234 kB` line from `/proc/<pid>/status`, in bytes
pub fn parse_proc_status(status: &str, field: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != field {
            return None;
        }

        let mut parts = rest.split_whitespace();
        let value: u64 = parts.next()?.parse().ok()?;
        match parts.next() {
            Some(unit) if unit.eq_ignore_ascii_case("kb") => Some(value * 1024),
            Some(_) => None,
            None => Some(value),
        }
    })
}

/// Filesystem usage of a path against a used/size ratio
pub struct DiskIndicator {
    path: PathBuf,
    threshold_percent: f64,
}

impl DiskIndicator {
    pub fn new(path: impl Into<PathBuf>, threshold_percent: f64) -> Self {
        Self {
            path: path.into(),
            threshold_percent,
        }
    }
}

#[async_trait]
impl HealthIndicator for DiskIndicator {
    fn key(&self) -> &'static str {
        STORAGE_KEY
    }

    async fn check(&self) -> HealthIndicatorResult {
        let path = self.path.clone();
        let usage = tokio::task::spawn_blocking(move || disk_usage_blocking(&path))
            .await
            .map_err(|e| HealthError::Probe(e.to_string()))
            .and_then(|usage| usage);

        match usage {
            Ok((total, free)) => {
                let used_ratio = if total == 0 {
                    1.0
                } else {
                    (total - free.min(total)) as f64 / total as f64
                };
                let details = json!({
                    "path": self.path.display().to_string(),
                    "total": total,
                    "free": free,
                    "usedPercent": used_ratio,
                    "thresholdPercent": self.threshold_percent,
                });

                if used_ratio <= self.threshold_percent {
                    HealthIndicatorResult::up(STORAGE_KEY, details)
                } else {
                    HealthIndicatorResult::down(STORAGE_KEY, details)
                }
            }
            Err(e) => HealthIndicatorResult::down(STORAGE_KEY, json!({ "message": e.to_string() })),
        }
    }
}

fn disk_usage_blocking(path: &std::path::Path) -> Result<(u64, u64), HealthError> {
    use std::process::Command;

    let output = Command::new("df")
        .arg("-B1")
        .arg(path)
        .output()
        .map_err(|_| HealthError::Unsupported("df"))?;

    if !output.status.success() {
        return Err(HealthError::Probe(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    parse_df_output(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| HealthError::Probe("unexpected df output".to_string()))
}

/// `(total, available)` bytes from `df -B1` output
pub fn parse_df_output(stdout: &str) -> Option<(u64, u64)> {
    let line = stdout.lines().nth(1)?;
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() >= 4 {
        Some((parts[1].parse().ok()?, parts[3].parse().ok()?))
    } else {
        None
    }
}

/// HTTP `HEAD` against the object-storage bucket URL
pub struct ObjectStorageIndicator {
    client: reqwest::Client,
    url: Option<String>,
}

impl ObjectStorageIndicator {
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(client: reqwest::Client, url: Option<String>) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl HealthIndicator for ObjectStorageIndicator {
    fn key(&self) -> &'static str {
        OBJECT_STORAGE_KEY
    }

    async fn check(&self) -> HealthIndicatorResult {
        let Some(url) = self.url.as_deref() else {
            return HealthIndicatorResult::down(
                OBJECT_STORAGE_KEY,
                json!({ "message": "object storage is not configured" }),
            );
        };

        match self.client.head(url).timeout(Self::TIMEOUT).send().await {
            Ok(response) if !response.status().is_server_error() => HealthIndicatorResult::up(
                OBJECT_STORAGE_KEY,
                json!({ "statusCode": response.status().as_u16() }),
            ),
            Ok(response) => HealthIndicatorResult::down(
                OBJECT_STORAGE_KEY,
                json!({ "statusCode": response.status().as_u16() }),
            ),
            Err(e) => {
                warn!(error = %e, "Object storage health check failed");
                HealthIndicatorResult::down(OBJECT_STORAGE_KEY, json!({ "message": e.to_string() }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_aggregation() {
        let report = HealthReport::from_results(vec![
            HealthIndicatorResult::up("database", json!({})),
            HealthIndicatorResult::down("storage", json!({ "free": 0 })),
        ]);

        assert_eq!(report.status, "error");
        assert!(!report.is_ok());
        assert!(report.info.contains_key("database"));
        assert!(report.error.contains_key("storage"));
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.error["storage"]["status"], "down");
    }

    #[test]
    fn test_report_all_up() {
        let report = HealthReport::from_results(vec![HealthIndicatorResult::up(
            "memoryRss",
            json!({}),
        )]);

        assert_eq!(report.status, "ok");
        assert!(report.error.is_empty());
    }

    #[test]
    fn test_threshold() {
        assert!(HealthIndicatorResult::from_threshold("memoryHeap", 10, 10).is_up());
        assert!(!HealthIndicatorResult::from_threshold("memoryHeap", 11, 10).is_up());
    }

    #[test]
    fn test_parse_proc_status() {
        let status = "Name:\ttenantry\nVmData:\t  20480 kB\nVmRSS:\t   1024 kB\n";

        assert_eq!(parse_proc_status(status, "VmData"), Some(20480 * 1024));
        assert_eq!(parse_proc_status(status, "VmRSS"), Some(1024 * 1024));
        assert_eq!(parse_proc_status(status, "VmSwap"), None);
    }

    #[test]
    fn test_parse_df_output() {
        let stdout = "Filesystem     1B-blocks      Used Available Use% Mounted on\n\
                      /dev/sda1    1000000000 250000000 750000000  25% /\n";

        assert_eq!(parse_df_output(stdout), Some((1_000_000_000, 750_000_000)));
        assert_eq!(parse_df_output("Filesystem\n"), None);
    }

    #[tokio::test]
    async fn test_unconfigured_object_storage_is_down() {
        let indicator = ObjectStorageIndicator::new(reqwest::Client::new(), None);
        let result = indicator.check().await;

        assert_eq!(result.key, OBJECT_STORAGE_KEY);
        assert_eq!(result.status, HealthStatus::Down);
    }
}
