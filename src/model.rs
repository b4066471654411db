use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, UTC.
pub type Ms = i64;

/// Closed interval `[start, end]`. Both bounds are part of the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start <= end, "Span start must not be after end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// True if the spans share at least one instant. With `inclusive`, spans
    /// that only touch at an endpoint also count.
    pub fn overlaps(&self, other: &Span, inclusive: bool) -> bool {
        if inclusive {
            self.start <= other.end && other.start <= self.end
        } else {
            self.start < other.end && other.start < self.end
        }
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t <= self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Why a span is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
    /// Confirmed booking.
    Reservation,
    /// Administrative hold placed by the host.
    Lock,
}

/// A span during which a listing cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedInterval {
    pub id: Ulid,
    pub kind: BlockKind,
    pub span: Span,
}

impl BlockedInterval {
    pub fn reservation(id: Ulid, span: Span) -> Self {
        Self { id, kind: BlockKind::Reservation, span }
    }

    pub fn lock(id: Ulid, span: Span) -> Self {
        Self { id, kind: BlockKind::Lock, span }
    }
}

/// Availability is tracked per night for short stays and per month for long-term listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Day,
    Month,
}

impl Granularity {
    pub fn for_listing(long_term: bool) -> Self {
        if long_term { Granularity::Month } else { Granularity::Day }
    }
}

/// A requested stay, built per query and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRange {
    pub start: Ms,
    pub end: Ms,
    pub granularity: Granularity,
}

impl CandidateRange {
    pub fn new(start: Ms, end: Ms, granularity: Granularity) -> Self {
        Self { start, end, granularity }
    }
}

/// Render state of one calendar cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellState {
    None,
    Lock,
    Reservation,
}

/// One day or month of a calendar, `[start, end]` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCell {
    pub start: Ms,
    pub end: Ms,
    pub state: CellState,
}

// ── Cache invalidation ───────────────────────────────────────────

/// The kind of entity whose mutation stales cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Estate,
    Reservation,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::Estate, EntityType::Reservation];
}

/// Listing family. Selects which cache partition a change touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Residential,
    Business,
}

impl Category {
    /// Wire discriminator. Anything other than `"business"` (including nothing) is residential.
    pub fn from_discriminator(value: Option<&str>) -> Self {
        match value {
            Some("business") => Category::Business,
            _ => Category::Residential,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Residential => "residential",
            Category::Business => "business",
        }
    }
}

/// Emitted once per committed mutation of listing or reservation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvalidationEvent {
    pub entity_type: EntityType,
    pub category: Category,
}

impl InvalidationEvent {
    pub fn new(entity_type: EntityType, category: Category) -> Self {
        Self { entity_type, category }
    }
}

// ── Listing state ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ListingState {
    pub id: Ulid,
    pub category: Category,
    /// Long-term listings are booked by the month.
    pub long_term: bool,
    /// Locks and reservations, sorted by `span.start`.
    pub intervals: Vec<BlockedInterval>,
    /// Set once the listing is removed from the engine. Holders of a stale
    /// handle must not mutate it.
    pub deleted: bool,
}

impl ListingState {
    pub fn new(id: Ulid, category: Category, long_term: bool) -> Self {
        Self {
            id,
            category,
            long_term,
            intervals: Vec::new(),
            deleted: false,
        }
    }

    pub fn granularity(&self) -> Granularity {
        Granularity::for_listing(self.long_term)
    }

    /// Insert interval maintaining sort order by span.start.
    pub fn insert_interval(&mut self, interval: BlockedInterval) {
        let pos = self
            .intervals
            .binary_search_by_key(&interval.span.start, |i| i.span.start)
            .unwrap_or_else(|e| e);
        self.intervals.insert(pos, interval);
    }

    /// Remove interval by id.
    pub fn remove_interval(&mut self, id: Ulid) -> Option<BlockedInterval> {
        let pos = self.intervals.iter().position(|i| i.id == id)?;
        Some(self.intervals.remove(pos))
    }

    /// Intervals that inclusively overlap the query window.
    /// Binary search skips everything starting after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &BlockedInterval> {
        let right_bound = self
            .intervals
            .partition_point(|i| i.span.start <= query.end);
        self.intervals[..right_bound]
            .iter()
            .filter(move |i| i.span.end >= query.start)
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingInfo {
    pub id: Ulid,
    pub category: Category,
    pub long_term: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationInfo {
    pub id: Ulid,
    pub listing_id: Ulid,
    pub start: Ms,
    pub end: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: Ulid,
    pub listing_id: Ulid,
    pub start: Ms,
    pub end: Ms,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(200)); // closed
        assert!(!s.contains_instant(201));
    }

    #[test]
    fn span_overlap_touching_endpoints() {
        let a = Span::new(100, 200);
        let b = Span::new(200, 300);
        assert!(a.overlaps(&b, true));
        assert!(!a.overlaps(&b, false));
        assert!(b.overlaps(&a, true));
    }

    #[test]
    fn span_overlap_disjoint() {
        let a = Span::new(100, 199);
        let b = Span::new(200, 300);
        assert!(!a.overlaps(&b, true));
        assert!(!a.overlaps(&b, false));
    }

    #[test]
    fn span_overlap_nested() {
        let outer = Span::new(0, 1000);
        let inner = Span::new(400, 500);
        assert!(outer.overlaps(&inner, false));
        assert!(inner.overlaps(&outer, true));
        assert!(outer.contains_span(&inner));
        assert!(!inner.contains_span(&outer));
    }

    #[test]
    fn single_instant_span_overlaps_only_inclusively_at_edges() {
        let point = Span::new(100, 100);
        let range = Span::new(100, 200);
        assert!(point.overlaps(&range, true));
        assert!(!point.overlaps(&range, false));
    }

    #[test]
    fn category_discriminator() {
        assert_eq!(Category::from_discriminator(Some("business")), Category::Business);
        assert_eq!(Category::from_discriminator(Some("residential")), Category::Residential);
        assert_eq!(Category::from_discriminator(Some("Business")), Category::Residential);
        assert_eq!(Category::from_discriminator(Some("hotel")), Category::Residential);
        assert_eq!(Category::from_discriminator(None), Category::Residential);
    }

    #[test]
    fn granularity_follows_long_term_flag() {
        assert_eq!(Granularity::for_listing(true), Granularity::Month);
        assert_eq!(Granularity::for_listing(false), Granularity::Day);
        let ls = ListingState::new(Ulid::new(), Category::Business, true);
        assert_eq!(ls.granularity(), Granularity::Month);
    }

    #[test]
    fn interval_ordering() {
        let mut ls = ListingState::new(Ulid::new(), Category::Residential, false);
        ls.insert_interval(BlockedInterval::reservation(Ulid::new(), Span::new(300, 400)));
        ls.insert_interval(BlockedInterval::lock(Ulid::new(), Span::new(100, 200)));
        ls.insert_interval(BlockedInterval::reservation(Ulid::new(), Span::new(200, 300)));
        assert_eq!(ls.intervals[0].span.start, 100);
        assert_eq!(ls.intervals[1].span.start, 200);
        assert_eq!(ls.intervals[2].span.start, 300);
    }

    #[test]
    fn remove_middle_preserves_order() {
        let mut ls = ListingState::new(Ulid::new(), Category::Residential, false);
        let ids: Vec<Ulid> = (0..3).map(|_| Ulid::new()).collect();
        for (i, &id) in ids.iter().enumerate() {
            let start = (i as Ms) * 100;
            ls.insert_interval(BlockedInterval::reservation(id, Span::new(start, start + 50)));
        }
        assert!(ls.remove_interval(ids[1]).is_some());
        assert_eq!(ls.intervals.len(), 2);
        assert_eq!(ls.intervals[0].id, ids[0]);
        assert_eq!(ls.intervals[1].id, ids[2]);
        assert!(ls.remove_interval(Ulid::new()).is_none());
    }

    #[test]
    fn overlapping_includes_touching_intervals() {
        let mut ls = ListingState::new(Ulid::new(), Category::Residential, false);
        ls.insert_interval(BlockedInterval::reservation(Ulid::new(), Span::new(100, 200)));
        ls.insert_interval(BlockedInterval::lock(Ulid::new(), Span::new(300, 400)));
        ls.insert_interval(BlockedInterval::reservation(Ulid::new(), Span::new(500, 600)));

        let hits: Vec<_> = ls.overlapping(&Span::new(200, 300)).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].span, Span::new(100, 200));
        assert_eq!(hits[1].span, Span::new(300, 400));
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut ls = ListingState::new(Ulid::new(), Category::Residential, false);
        ls.insert_interval(BlockedInterval::reservation(Ulid::new(), Span::new(0, 99)));
        ls.insert_interval(BlockedInterval::reservation(Ulid::new(), Span::new(450, 600)));
        ls.insert_interval(BlockedInterval::reservation(Ulid::new(), Span::new(1000, 1100)));

        let hits: Vec<_> = ls.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span, Span::new(450, 600));
    }

    #[test]
    fn overlapping_large_interval_spanning_query() {
        let mut ls = ListingState::new(Ulid::new(), Category::Residential, false);
        ls.insert_interval(BlockedInterval::lock(Ulid::new(), Span::new(0, 10_000)));
        assert_eq!(ls.overlapping(&Span::new(500, 600)).count(), 1);
    }

    #[test]
    fn overlapping_empty_listing() {
        let ls = ListingState::new(Ulid::new(), Category::Residential, false);
        assert_eq!(ls.overlapping(&Span::new(0, 1000)).count(), 0);
    }

    #[test]
    fn block_kind_serializes_upper_case() {
        let json = serde_json::to_string(&BlockKind::Reservation).unwrap();
        assert_eq!(json, "\"RESERVATION\"");
        let json = serde_json::to_string(&Category::Business).unwrap();
        assert_eq!(json, "\"business\"");
    }
}
