use chrono::Utc;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A timestamp no earlier than the clock and strictly after `previous`.
pub fn after(previous: Option<i64>) -> i64 {
    let now = now_millis();
    match previous {
        Some(prev) if prev >= now => prev + 1,
        _ => now,
    }
}
