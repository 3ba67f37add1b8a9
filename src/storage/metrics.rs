//! Shared metrics recording for storage backends.

use crate::Result;
use std::time::Instant;

/// Records operation metrics for storage operations.
///
/// This function records two metrics for each operation:
/// 1. `storage_operations_total` - Counter for operation count by status
/// 2. `storage_operation_duration_ms` - Histogram for operation latency
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Runs a storage operation and records its outcome.
pub fn timed<T>(
    backend: &'static str,
    operation: &'static str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let start = Instant::now();
    let result = f();
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(backend, operation, start, status);
    result
}

/// Counts a snapshot that could not be written.
pub fn record_durability_warning(backend: &'static str, operation: &'static str) {
    metrics::counter!(
        "storage_durability_warnings_total",
        "backend" => backend,
        "operation" => operation
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_timed_passes_result_through() {
        let ok = timed("memory", "count_users", || Ok(3));
        assert_eq!(ok.unwrap(), 3);

        let err: Result<()> = timed("memory", "delete_user", || {
            Err(Error::NotFound {
                entity: "user",
                id: "x".to_string(),
            })
        });
        assert!(matches!(err, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_record_without_recorder() {
        // No recorder installed in unit tests; recording must be a no-op.
        record_operation_metrics("sqlite", "leaderboard", Instant::now(), "success");
        record_durability_warning("file", "create_user");
    }
}
