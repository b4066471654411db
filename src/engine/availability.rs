use crate::calendar;
use crate::model::*;

use super::EngineError;

// ── Availability Algorithm ────────────────────────────────────────

/// Overlap at the given inclusivity. Bookings always use `inclusive = true`:
/// a stay ending on the day another begins is a conflict.
pub fn overlaps(a: &Span, b: &Span, inclusive: bool) -> bool {
    a.overlaps(b, inclusive)
}

/// Reject reversed and zero-length candidates.
pub fn validate_candidate(candidate: &CandidateRange) -> Result<Span, EngineError> {
    if candidate.start >= candidate.end {
        return Err(EngineError::InvalidRange {
            start: candidate.start,
            end: candidate.end,
        });
    }
    Ok(Span::new(candidate.start, candidate.end))
}

/// First blocked interval (by input order) that conflicts with the candidate.
///
/// At `Granularity::Month` the candidate and every interval are widened to
/// whole months first, so two stays touching the same month conflict.
pub fn first_conflict<'a>(
    candidate: &CandidateRange,
    blocked: &'a [BlockedInterval],
) -> Result<Option<&'a BlockedInterval>, EngineError> {
    let span = validate_candidate(candidate)?;
    let query = calendar::normalize(span, candidate.granularity);
    Ok(blocked.iter().find(|interval| {
        let normalized = calendar::normalize(interval.span, candidate.granularity);
        overlaps(&query, &normalized, true)
    }))
}

/// A candidate is bookable iff no blocked interval inclusively overlaps it
/// after normalization. Pure; O(n) in the number of intervals.
pub fn is_range_bookable(
    candidate: &CandidateRange,
    blocked: &[BlockedInterval],
) -> Result<bool, EngineError> {
    Ok(first_conflict(candidate, blocked)?.is_none())
}

/// What a calendar cell (one day or one month) should render as.
///
/// A LOCK anywhere in the cell wins; otherwise the first RESERVATION touching
/// the cell; otherwise `None`.
pub fn classify(cell: &Span, intervals: &[BlockedInterval]) -> CellState {
    let mut state = CellState::None;
    for interval in intervals {
        if !overlaps(cell, &interval.span, true) {
            continue;
        }
        match interval.kind {
            BlockKind::Lock => return CellState::Lock,
            BlockKind::Reservation => state = CellState::Reservation,
        }
    }
    state
}

/// Classify every day or month cell of `range`.
pub fn classify_cells(
    range: Span,
    granularity: Granularity,
    intervals: &[BlockedInterval],
) -> Vec<CalendarCell> {
    calendar::cells(range, granularity)
        .into_iter()
        .map(|cell| CalendarCell {
            start: cell.start,
            end: cell.end,
            state: classify(&cell, intervals),
        })
        .collect()
}
