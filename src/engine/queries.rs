use ulid::Ulid;

use crate::calendar;
use crate::limits::*;
use crate::model::*;
use crate::observability::AVAILABILITY_CHECKS_TOTAL;

use super::availability::classify_cells;
use super::conflict::{find_conflict, validate_span};
use super::{Engine, EngineError};

impl Engine {
    /// Is `[start, end]` bookable on this listing right now? Reads live
    /// interval data under the listing's read lock; never the cache.
    pub async fn check_availability(
        &self,
        listing_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<bool, EngineError> {
        let result: Result<bool, EngineError> = async {
            let ls = self.require_listing(&listing_id)?;
            let guard = ls.read().await;
            let candidate = CandidateRange::new(start, end, guard.granularity());
            Ok(find_conflict(&guard, &candidate)?.is_none())
        }
        .await;
        let label = match &result {
            Ok(true) => "bookable",
            Ok(false) => "unavailable",
            Err(_) => "invalid",
        };
        metrics::counter!(AVAILABILITY_CHECKS_TOTAL, "result" => label).increment(1);
        result
    }

    /// One cell per day (or month, for long-term listings) between `from` and
    /// `to`, each tagged with what blocks it.
    pub async fn calendar(
        &self,
        listing_id: Ulid,
        from: Ms,
        to: Ms,
    ) -> Result<Vec<CalendarCell>, EngineError> {
        if from > to {
            return Err(EngineError::InvalidRange { start: from, end: to });
        }
        let range = Span::new(from, to);
        validate_span(&range)?;

        let ls = self.require_listing(&listing_id)?;
        let guard = ls.read().await;
        let granularity = guard.granularity();
        if calendar::cell_count(range, granularity) > MAX_CALENDAR_CELLS {
            return Err(EngineError::LimitExceeded("calendar window too wide"));
        }
        let window = calendar::normalize(range, granularity);
        let window = Span::new(calendar::day_floor(window.start), calendar::day_last_instant(window.end));
        let relevant: Vec<BlockedInterval> = guard.overlapping(&window).cloned().collect();
        Ok(classify_cells(range, granularity, &relevant))
    }

    pub async fn get_listing_info(&self, id: Ulid) -> Option<ListingInfo> {
        let ls = self.get_listing(&id)?;
        let guard = ls.read().await;
        Some(ListingInfo {
            id: guard.id,
            category: guard.category,
            long_term: guard.long_term,
        })
    }

    /// All listings, optionally restricted to one category, ordered by id.
    pub async fn list_listings(&self, category: Option<Category>) -> Vec<ListingInfo> {
        let snapshot: Vec<_> = self.listings.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(snapshot.len());
        for ls in snapshot {
            let guard = ls.read().await;
            if category.is_none_or(|c| c == guard.category) {
                out.push(ListingInfo {
                    id: guard.id,
                    category: guard.category,
                    long_term: guard.long_term,
                });
            }
        }
        out.sort_by_key(|l| l.id);
        out
    }

    pub async fn get_reservations(&self, listing_id: Ulid) -> Result<Vec<ReservationInfo>, EngineError> {
        let ls = self.require_listing(&listing_id)?;
        let guard = ls.read().await;
        Ok(guard
            .intervals
            .iter()
            .filter(|i| i.kind == BlockKind::Reservation)
            .map(|i| ReservationInfo {
                id: i.id,
                listing_id,
                start: i.span.start,
                end: i.span.end,
            })
            .collect())
    }

    pub async fn get_locks(&self, listing_id: Ulid) -> Result<Vec<LockInfo>, EngineError> {
        let ls = self.require_listing(&listing_id)?;
        let guard = ls.read().await;
        Ok(guard
            .intervals
            .iter()
            .filter(|i| i.kind == BlockKind::Lock)
            .map(|i| LockInfo {
                id: i.id,
                listing_id,
                start: i.span.start,
                end: i.span.end,
            })
            .collect())
    }

    /// Reservations that ended before `cutoff`, as `(reservation_id, listing_id)`.
    pub async fn collect_expired_reservations(&self, cutoff: Ms) -> Vec<(Ulid, Ulid)> {
        let snapshot: Vec<_> = self
            .listings
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        let mut expired = Vec::new();
        for (listing_id, ls) in snapshot {
            let guard = ls.read().await;
            expired.extend(
                guard
                    .intervals
                    .iter()
                    .filter(|i| i.kind == BlockKind::Reservation && i.span.end < cutoff)
                    .map(|i| (i.id, listing_id)),
            );
        }
        expired
    }
}
