use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, validate_span};
use super::{record_mutation, Engine, EngineError, SharedListingState};

/// Checked construction of a stored span from raw bounds.
fn stored_span(start: Ms, end: Ms) -> Result<Span, EngineError> {
    if start > end {
        return Err(EngineError::InvalidRange { start, end });
    }
    let span = Span::new(start, end);
    validate_span(&span)?;
    Ok(span)
}

impl Engine {
    pub async fn create_listing(
        &self,
        id: Ulid,
        category: Category,
        long_term: bool,
    ) -> Result<(), EngineError> {
        let result = self.insert_listing(id, category, long_term);
        record_mutation("create_listing", &result);
        result?;
        self.invalidate(EntityType::Estate, category).await;
        Ok(())
    }

    fn insert_listing(&self, id: Ulid, category: Category, long_term: bool) -> Result<(), EngineError> {
        if self.listings.len() >= MAX_LISTINGS {
            return Err(EngineError::LimitExceeded("too many listings"));
        }
        match self.listings.entry(id) {
            Entry::Occupied(_) => Err(EngineError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(RwLock::new(ListingState::new(id, category, long_term))));
                Ok(())
            }
        }
    }

    /// Switch a listing between nightly and monthly booking. Category is fixed
    /// for the life of a listing; moving categories is delete + create.
    pub async fn update_listing(&self, id: Ulid, long_term: bool) -> Result<(), EngineError> {
        let result = match self.require_listing(&id) {
            Ok(ls) => {
                let mut guard = ls.write().await;
                if guard.deleted {
                    Err(EngineError::NotFound(id))
                } else {
                    guard.long_term = long_term;
                    Ok(guard.category)
                }
            }
            Err(e) => Err(e),
        };
        record_mutation("update_listing", &result);
        self.invalidate(EntityType::Estate, result?).await;
        Ok(())
    }

    pub async fn delete_listing(&self, id: Ulid) -> Result<(), EngineError> {
        let result = match self.listings.remove(&id) {
            Some((_, ls)) => {
                // Writers that resolved the listing before removal queue on
                // this lock and see the tombstone once it is released.
                let mut guard = ls.write().await;
                guard.deleted = true;
                for interval in &guard.intervals {
                    self.interval_to_listing.remove(&interval.id);
                }
                Ok(guard.category)
            }
            None => Err(EngineError::NotFound(id)),
        };
        record_mutation("delete_listing", &result);
        self.invalidate(EntityType::Estate, result?).await;
        Ok(())
    }

    /// Administrative hold. Locks may overlap anything, including reservations.
    pub async fn place_lock(
        &self,
        id: Ulid,
        listing_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<(), EngineError> {
        let result: Result<Category, EngineError> = async {
            let span = stored_span(start, end)?;
            self.insert_interval(BlockedInterval::lock(id, span), listing_id, false)
                .await
        }
        .await;
        record_mutation("place_lock", &result);
        self.invalidate(EntityType::Estate, result?).await;
        Ok(())
    }

    pub async fn lift_lock(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let result = self.remove_interval(id, BlockKind::Lock).await;
        record_mutation("lift_lock", &result);
        let (listing_id, category) = result?;
        self.invalidate(EntityType::Estate, category).await;
        Ok(listing_id)
    }

    /// Confirm a booking. Rejected with `InvalidRange` for reversed or
    /// zero-length stays and with `Conflict` when the stay is not bookable
    /// at the listing's granularity.
    pub async fn confirm_reservation(
        &self,
        id: Ulid,
        listing_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<(), EngineError> {
        let result: Result<Category, EngineError> = async {
            if start >= end {
                return Err(EngineError::InvalidRange { start, end });
            }
            let span = stored_span(start, end)?;
            self.insert_interval(BlockedInterval::reservation(id, span), listing_id, true)
                .await
        }
        .await;
        record_mutation("confirm_reservation", &result);
        self.invalidate(EntityType::Reservation, result?).await;
        Ok(())
    }

    pub async fn cancel_reservation(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let result = self.remove_interval(id, BlockKind::Reservation).await;
        record_mutation("cancel_reservation", &result);
        let (listing_id, category) = result?;
        self.invalidate(EntityType::Reservation, category).await;
        Ok(listing_id)
    }

    async fn insert_interval(
        &self,
        interval: BlockedInterval,
        listing_id: Ulid,
        check_conflicts: bool,
    ) -> Result<Category, EngineError> {
        let ls = self.require_listing(&listing_id)?;
        self.insert_into(&ls, interval, listing_id, check_conflicts).await
    }

    /// Insert under the listing's write lock; returns the listing category.
    /// `ls` may have been resolved before a concurrent delete.
    pub(super) async fn insert_into(
        &self,
        ls: &SharedListingState,
        interval: BlockedInterval,
        listing_id: Ulid,
        check_conflicts: bool,
    ) -> Result<Category, EngineError> {
        let mut guard = ls.write().await;
        if guard.deleted {
            return Err(EngineError::NotFound(listing_id));
        }
        if guard.intervals.len() >= MAX_INTERVALS_PER_LISTING {
            return Err(EngineError::LimitExceeded("too many intervals on listing"));
        }
        match self.interval_to_listing.entry(interval.id) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyExists(interval.id)),
            Entry::Vacant(slot) => {
                if check_conflicts {
                    check_no_conflict(&guard, &interval.span)?;
                }
                slot.insert(listing_id);
            }
        }
        guard.insert_interval(interval);
        Ok(guard.category)
    }

    /// Remove an interval of the given kind; returns its listing and category.
    async fn remove_interval(&self, id: Ulid, kind: BlockKind) -> Result<(Ulid, Category), EngineError> {
        let (listing_id, mut guard) = self.resolve_interval_write(&id).await?;
        if guard.deleted {
            return Err(EngineError::NotFound(id));
        }
        if !guard.intervals.iter().any(|i| i.id == id && i.kind == kind) {
            return Err(EngineError::NotFound(id));
        }
        guard.remove_interval(id);
        self.interval_to_listing.remove(&id);
        Ok((listing_id, guard.category))
    }
}
