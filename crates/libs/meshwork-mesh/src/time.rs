use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock stamp for originator `sent_time` fields. Timers and expiry use
/// monotonic `Instant`s instead.
pub fn now_epoch_millis() -> i64 {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    i64::try_from(millis).unwrap_or(i64::MAX)
}
