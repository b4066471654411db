use crate::model::Ms;

/// 1970-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
/// 2200-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;

/// Ten years. Longer blocks are almost certainly input mistakes.
pub const MAX_SPAN_DURATION_MS: Ms = 10 * 366 * 86_400_000;

pub const MAX_LISTINGS: usize = 1_000_000;
pub const MAX_INTERVALS_PER_LISTING: usize = 10_000;

/// Upper bound on cells produced by a single calendar query.
pub const MAX_CALENDAR_CELLS: usize = 1_000;
