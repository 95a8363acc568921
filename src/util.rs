use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST_TIMESTAMP_ID: AtomicU64 = AtomicU64::new(0);

#[inline]
pub(crate) fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Random (version 4) UUID from the process-wide fast RNG.
#[inline]
pub(crate) fn random_uuid() -> uuid::Uuid {
    let hi = u128::from(fastrand::u64(..));
    let lo = u128::from(fastrand::u64(..));
    uuid::Builder::from_random_bytes(((hi << 64) | lo).to_le_bytes()).into_uuid()
}

/// Millisecond timestamp id, bumped past the previous one so ids minted in
/// the same millisecond stay unique within the process.
pub(crate) fn next_timestamp_id() -> u64 {
    next_timestamp_id_from(&LAST_TIMESTAMP_ID, unix_now_millis())
}

fn next_timestamp_id_from(last: &AtomicU64, now: u64) -> u64 {
    let mut current = last.load(Ordering::Relaxed);
    loop {
        let next = now.max(current + 1);
        match last.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => current = observed,
        }
    }
}
