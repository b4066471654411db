//! UTC day and month boundaries over [`Ms`] instants.
//!
//! Instants chrono cannot represent are returned unchanged; callers validate
//! bounds (see `limits`) before normalizing.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::model::{Granularity, Ms, Span};

pub const DAY_MS: Ms = 86_400_000;

fn first_of_month(year: i32, month: u32) -> Option<Ms> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
}

/// Midnight UTC of the given date.
pub fn ms_from_ymd(year: i32, month: u32, day: u32) -> Option<Ms> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

pub fn now_ms() -> Ms {
    Utc::now().timestamp_millis()
}

/// Saturates at `Ms::MIN` for the partial day at the bottom of the range.
pub fn day_floor(t: Ms) -> Ms {
    t.saturating_sub(t.rem_euclid(DAY_MS))
}

/// Last millisecond of the day containing `t`, saturating at `Ms::MAX`.
pub fn day_last_instant(t: Ms) -> Ms {
    day_floor(t).saturating_add(DAY_MS - 1)
}

/// First instant of the month containing `t`.
pub fn month_floor(t: Ms) -> Ms {
    DateTime::<Utc>::from_timestamp_millis(t)
        .and_then(|dt| first_of_month(dt.year(), dt.month()))
        .unwrap_or(t)
}

/// Last millisecond of the month containing `t`.
pub fn month_last_instant(t: Ms) -> Ms {
    DateTime::<Utc>::from_timestamp_millis(t)
        .and_then(|dt| {
            let (year, month) = if dt.month() == 12 {
                (dt.year() + 1, 1)
            } else {
                (dt.year(), dt.month() + 1)
            };
            first_of_month(year, month)
        })
        .map(|next| next - 1)
        .unwrap_or(t)
}

/// Widen a span to the boundaries of its granularity. Day spans are left as-is.
pub fn normalize(span: Span, granularity: Granularity) -> Span {
    match granularity {
        Granularity::Day => span,
        Granularity::Month => Span::new(month_floor(span.start), month_last_instant(span.end)),
    }
}

/// Cell boundaries (days or months) covering `range`, in order. Stops at
/// the last cell that fits in `Ms`, or before any month chrono cannot
/// represent.
pub fn cells(range: Span, granularity: Granularity) -> Vec<Span> {
    let mut out = Vec::new();
    let mut cursor = match granularity {
        Granularity::Day => day_floor(range.start),
        Granularity::Month => month_floor(range.start),
    };
    while cursor <= range.end {
        let last = match granularity {
            Granularity::Day => day_last_instant(cursor),
            Granularity::Month => month_last_instant(cursor),
        };
        let representable = match granularity {
            Granularity::Day => true,
            Granularity::Month => DateTime::<Utc>::from_timestamp_millis(cursor).is_some(),
        };
        if !representable || last < cursor {
            break;
        }
        out.push(Span::new(cursor, last));
        cursor = match last.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }
    out
}

/// Number of cells `cells` would produce, without allocating.
pub fn cell_count(range: Span, granularity: Granularity) -> usize {
    match granularity {
        Granularity::Day => {
            (day_floor(range.end).saturating_sub(day_floor(range.start)) / DAY_MS + 1) as usize
        }
        Granularity::Month => {
            let (Some(a), Some(b)) = (
                DateTime::<Utc>::from_timestamp_millis(range.start),
                DateTime::<Utc>::from_timestamp_millis(range.end),
            ) else {
                return 0;
            };
            let months = (b.year() - a.year()) as i64 * 12 + b.month() as i64 - a.month() as i64;
            (months + 1) as usize
        }
    }
}
