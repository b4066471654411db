use ulid::Ulid;

use crate::calendar;
use crate::model::*;

use super::availability::validate_candidate;
use super::EngineError;

/// Bounds check for spans about to be stored. Single-instant spans are allowed.
pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.start > span.end {
        return Err(EngineError::InvalidRange {
            start: span.start,
            end: span.end,
        });
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(())
}

/// Pruned equivalent of `availability::first_conflict` over a listing's sorted
/// intervals. Widening an interval to whole months can only reach months the
/// already-widened query covers if the raw interval touches them, so the raw
/// spans are tested against the normalized query.
pub(crate) fn find_conflict(
    ls: &ListingState,
    candidate: &CandidateRange,
) -> Result<Option<Ulid>, EngineError> {
    let span = validate_candidate(candidate)?;
    validate_span(&span)?;
    let query = calendar::normalize(span, candidate.granularity);
    Ok(ls.overlapping(&query).next().map(|i| i.id))
}

pub(crate) fn check_no_conflict(ls: &ListingState, span: &Span) -> Result<(), EngineError> {
    let candidate = CandidateRange::new(span.start, span.end, ls.granularity());
    match find_conflict(ls, &candidate)? {
        Some(id) => Err(EngineError::Conflict(id)),
        None => Ok(()),
    }
}
