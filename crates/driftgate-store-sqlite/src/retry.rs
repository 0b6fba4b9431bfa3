// crates/driftgate-store-sqlite/src/retry.rs
// ============================================================================
// Module: Bounded Write Retry
// Description: Small retry helper for `SQLITE_BUSY`/`SQLITE_LOCKED` errors.
// Purpose: Implement the "retried on lock contention with bounded backoff
//          (default 3x250ms)" requirement for `replace_metrics` and other
//          mutating registry calls.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/registry.py`'s `_execute_with_retry`.

use std::thread;
use std::time::Duration;

use rusqlite::Error as SqliteError;
use rusqlite::ErrorCode;

use crate::error::StoreError;

/// Number of attempts made before giving up, per spec ("default 3x250ms").
pub const MAX_ATTEMPTS: u32 = 3;
/// Backoff between attempts.
pub const BACKOFF: Duration = Duration::from_millis(250);

fn is_lock_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        SqliteError::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Runs `op`, retrying up to [`MAX_ATTEMPTS`] times with a fixed [`BACKOFF`]
/// when it fails with `SQLITE_BUSY` or `SQLITE_LOCKED`.
///
/// # Errors
/// Returns [`StoreError::Busy`] if every attempt is exhausted on lock
/// contention, or the underlying [`StoreError`] for any other failure.
pub fn with_retry<T>(mut op: impl FnMut() -> Result<T, rusqlite::Error>) -> Result<T, StoreError> {
    let mut last_was_contention = false;
    for attempt in 0..MAX_ATTEMPTS {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if is_lock_contention(&err) => {
                last_was_contention = true;
                if attempt + 1 < MAX_ATTEMPTS {
                    thread::sleep(BACKOFF);
                }
            }
            Err(err) => return Err(StoreError::Sqlite(err)),
        }
    }
    if last_was_contention {
        Err(StoreError::Busy)
    } else {
        unreachable!("loop always returns or sets last_was_contention")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_immediately_when_op_succeeds() {
        let mut calls = 0;
        let result: Result<i32, StoreError> = with_retry(|| {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result.expect("ok"), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn gives_up_after_max_attempts_on_contention() {
        let mut calls = 0;
        let result: Result<i32, StoreError> = with_retry(|| {
            calls += 1;
            Err(SqliteError::SqliteFailure(
                rusqlite::ffi::Error::new(5),
                Some("database is locked".to_string()),
            ))
        });
        assert!(matches!(result, Err(StoreError::Busy)));
        assert_eq!(calls, MAX_ATTEMPTS);
    }
}
