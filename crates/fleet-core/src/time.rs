//! Wall-clock timestamps.
//!
//! Protocol messages carry Unix milliseconds so records from different
//! processes can be ordered.  Deadlines inside an actor use `Instant`
//! instead; nothing here is used for timeout arithmetic.

/// Milliseconds since the Unix epoch.
pub type UnixMillis = i64;

/// Current wall-clock time.
#[inline]
pub fn now_millis() -> UnixMillis {
    chrono::Utc::now().timestamp_millis()
}

/// Seconds from `earlier` to `later`, negative if the clocks disagree.
#[inline]
pub fn secs_between(earlier: UnixMillis, later: UnixMillis) -> f64 {
    (later - earlier) as f64 / 1_000.0
}
