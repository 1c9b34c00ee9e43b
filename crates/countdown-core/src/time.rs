//! Conversion between an `(hours, minutes, seconds)` triple and a total
//! millisecond count.
//!
//! Decomposition reports minutes and seconds as the remainder within their
//! unit (0-59), not as cumulative totals. Composition does not normalize
//! out-of-range inputs such as `minutes = 90`.

pub const MS_PER_SECOND: u64 = 1_000;
pub const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// `((hours * 60 + minutes) * 60 + seconds) * 1000`, computed in `u64`.
pub fn to_milliseconds(hours: u32, minutes: u32, seconds: u32) -> u64 {
    ((u64::from(hours) * 60 + u64::from(minutes)) * 60 + u64::from(seconds)) * MS_PER_SECOND
}

/// Whole hours in `ms`. Saturates at `u32::MAX`.
pub fn milliseconds_to_hours(ms: u64) -> u32 {
    u32::try_from(ms / MS_PER_HOUR).unwrap_or(u32::MAX)
}

/// Minutes within the current hour.
pub fn milliseconds_to_minutes(ms: u64) -> u32 {
    ((ms / MS_PER_MINUTE) % 60) as u32
}

/// Seconds within the current minute.
pub fn milliseconds_to_seconds(ms: u64) -> u32 {
    ((ms / MS_PER_SECOND) % 60) as u32
}
