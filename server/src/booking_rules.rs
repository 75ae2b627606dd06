//! The booking rules: no venue is booked twice on the same day, and venues or events with bookings
//! are never deleted.
//!
//! All operations work on an [EventEaseStoreFacade] and report their result as a [RuleOutcome].
//! Violations of the rules are no errors in this sense, but [RuleOutcome::Rejected] outcomes,
//! which can be presented to the user. Only faults of the data store (e.g. an unavailable
//! database) are returned as `Err(StoreError)`.
//!
//! The checks in this module run before the actual store operation. The database constraints
//! (unique venue and date of bookings, restricted foreign keys of bookings) backstop them against
//! concurrent requests. Their violations are mapped to the same rejections.

use crate::data_store::models::{FullBooking, NewBooking};
use crate::data_store::{
    BookingFilter, BookingId, EventEaseStoreFacade, EventId, StoreError, VenueId,
};
use chrono::NaiveDate;
use log::{debug, info};
use std::fmt::{Display, Formatter};

/// Result of a booking rules operation, which did not fail due to a data store fault
#[derive(Debug, PartialEq)]
pub enum RuleOutcome<T> {
    /// The operation has been executed (or the check has been done)
    Accepted(T),
    /// The operation has been refused, because it would violate a booking rule. Nothing has been
    /// changed.
    Rejected(Rejection),
    /// The entity in question or one of the referenced entities does not exist
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The venue is already booked on this date
    DoubleBooked {
        venue_id: VenueId,
        date: NaiveDate,
        /// The existing booking of the venue on that date, if it could still be identified
        conflicting_booking: Option<BookingId>,
    },
    /// The venue or event cannot be deleted, since there are bookings for it
    DeleteBlocked {
        entity: EntityRef,
        blocking_bookings: Vec<BookingId>,
    },
    /// The booking has been changed by someone else since the client has loaded it
    StaleWrite { booking_id: BookingId },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DoubleBooked { .. } => f.write_str("Venue already booked on this date"),
            Self::DeleteBlocked { entity, .. } => write!(
                f,
                "Cannot delete {}, it has associated bookings",
                entity.kind()
            ),
            Self::StaleWrite { .. } => f.write_str(
                "The booking has been changed in the meantime. Please reload and try again.",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef {
    Venue(VenueId),
    Event(EventId),
}

impl EntityRef {
    fn kind(&self) -> &'static str {
        match self {
            Self::Venue(_) => "venue",
            Self::Event(_) => "event",
        }
    }
}

/// Result of checking whether a venue or an event may be deleted
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionCheck {
    /// Ids of the bookings which prevent the deletion, in chronological order
    pub blocking_bookings: Vec<BookingId>,
}

impl DeletionCheck {
    pub fn is_deletable(&self) -> bool {
        self.blocking_bookings.is_empty()
    }
}

impl From<DeletionCheck> for eventease_api_types::DeletionCheck {
    fn from(value: DeletionCheck) -> Self {
        Self {
            deletable: value.is_deletable(),
            blocking_bookings: value.blocking_bookings,
        }
    }
}

/// Create a new booking, unless the venue is already booked on the booking's date.
///
/// Returns [RuleOutcome::NotFound] if the referenced venue or event does not exist.
pub fn create_booking(
    store: &mut dyn EventEaseStoreFacade,
    candidate: NewBooking,
) -> Result<RuleOutcome<FullBooking>, StoreError> {
    if !store.venue_exists(candidate.venue_id)? || !store.event_exists(candidate.event_id)? {
        return Ok(RuleOutcome::NotFound);
    }
    if let Some(rejection) = check_double_booking(store, &candidate, None)? {
        return Ok(RuleOutcome::Rejected(rejection));
    }

    let venue_id = candidate.venue_id;
    let date = candidate.booking_date;
    match store.create_booking(candidate) {
        Ok(booking) => {
            info!(
                "Created booking {} of venue {} for event {} on {}",
                booking.booking.id, venue_id, booking.booking.event_id, date
            );
            Ok(RuleOutcome::Accepted(booking))
        }
        Err(StoreError::ConflictEntityExists) => {
            debug!(
                "Concurrent booking of venue {} on {} detected by the database",
                venue_id, date
            );
            Ok(RuleOutcome::Rejected(Rejection::DoubleBooked {
                venue_id,
                date,
                conflicting_booking: find_booking_at(store, venue_id, date, None)?,
            }))
        }
        Err(e) => Err(e),
    }
}

/// Change an existing booking, unless the venue is booked by another booking on the new date.
///
/// If `expected_last_update` is given and the booking has been changed since then, the update is
/// rejected with [Rejection::StaleWrite].
pub fn update_booking(
    store: &mut dyn EventEaseStoreFacade,
    booking_id: BookingId,
    candidate: NewBooking,
    expected_last_update: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<RuleOutcome<FullBooking>, StoreError> {
    match store.get_booking(booking_id) {
        Ok(_) => {}
        Err(StoreError::NotExisting) => return Ok(RuleOutcome::NotFound),
        Err(e) => return Err(e),
    }
    if !store.venue_exists(candidate.venue_id)? || !store.event_exists(candidate.event_id)? {
        return Ok(RuleOutcome::NotFound);
    }
    if let Some(rejection) = check_double_booking(store, &candidate, Some(booking_id))? {
        return Ok(RuleOutcome::Rejected(rejection));
    }

    let venue_id = candidate.venue_id;
    let date = candidate.booking_date;
    match store.update_booking(booking_id, candidate, expected_last_update) {
        Ok(booking) => {
            info!("Updated booking {}: venue {} on {}", booking_id, venue_id, date);
            Ok(RuleOutcome::Accepted(booking))
        }
        Err(StoreError::NotExisting) => Ok(RuleOutcome::NotFound),
        Err(StoreError::ConcurrentEditConflict) => {
            Ok(RuleOutcome::Rejected(Rejection::StaleWrite { booking_id }))
        }
        Err(StoreError::ConflictEntityExists) => {
            Ok(RuleOutcome::Rejected(Rejection::DoubleBooked {
                venue_id,
                date,
                conflicting_booking: find_booking_at(store, venue_id, date, Some(booking_id))?,
            }))
        }
        Err(e) => Err(e),
    }
}

/// Check whether the venue may be deleted.
///
/// Blocking bookings are the bookings of the venue itself and the bookings of events hosted at
/// the venue, since these events are removed together with the venue.
pub fn check_venue_deletion(
    store: &mut dyn EventEaseStoreFacade,
    venue_id: VenueId,
) -> Result<RuleOutcome<DeletionCheck>, StoreError> {
    if !store.venue_exists(venue_id)? {
        return Ok(RuleOutcome::NotFound);
    }
    Ok(RuleOutcome::Accepted(blocking_bookings(
        store,
        EntityRef::Venue(venue_id),
    )?))
}

/// Check whether the event may be deleted, i.e. it has no bookings.
pub fn check_event_deletion(
    store: &mut dyn EventEaseStoreFacade,
    event_id: EventId,
) -> Result<RuleOutcome<DeletionCheck>, StoreError> {
    if !store.event_exists(event_id)? {
        return Ok(RuleOutcome::NotFound);
    }
    Ok(RuleOutcome::Accepted(blocking_bookings(
        store,
        EntityRef::Event(event_id),
    )?))
}

/// Delete the venue (together with its events) if [check_venue_deletion] allows it.
pub fn delete_venue(
    store: &mut dyn EventEaseStoreFacade,
    venue_id: VenueId,
) -> Result<RuleOutcome<()>, StoreError> {
    delete_entity(store, EntityRef::Venue(venue_id))
}

/// Delete the event if [check_event_deletion] allows it.
pub fn delete_event(
    store: &mut dyn EventEaseStoreFacade,
    event_id: EventId,
) -> Result<RuleOutcome<()>, StoreError> {
    delete_entity(store, EntityRef::Event(event_id))
}

fn delete_entity(
    store: &mut dyn EventEaseStoreFacade,
    entity: EntityRef,
) -> Result<RuleOutcome<()>, StoreError> {
    let check = match entity {
        EntityRef::Venue(venue_id) => check_venue_deletion(store, venue_id)?,
        EntityRef::Event(event_id) => check_event_deletion(store, event_id)?,
    };
    let check = match check {
        RuleOutcome::Accepted(check) => check,
        RuleOutcome::Rejected(rejection) => return Ok(RuleOutcome::Rejected(rejection)),
        RuleOutcome::NotFound => return Ok(RuleOutcome::NotFound),
    };
    if !check.is_deletable() {
        debug!(
            "Refusing to delete {:?}, blocked by bookings {:?}",
            entity, check.blocking_bookings
        );
        return Ok(RuleOutcome::Rejected(Rejection::DeleteBlocked {
            entity,
            blocking_bookings: check.blocking_bookings,
        }));
    }

    let result = match entity {
        EntityRef::Venue(venue_id) => store.delete_venue(venue_id),
        EntityRef::Event(event_id) => store.delete_event(event_id),
    };
    match result {
        Ok(()) => {
            info!("Deleted {:?}", entity);
            Ok(RuleOutcome::Accepted(()))
        }
        Err(StoreError::NotExisting) => Ok(RuleOutcome::NotFound),
        Err(StoreError::StillReferenced) => {
            // A booking has been created in the meantime
            Ok(RuleOutcome::Rejected(Rejection::DeleteBlocked {
                entity,
                blocking_bookings: blocking_bookings(store, entity)?.blocking_bookings,
            }))
        }
        Err(e) => Err(e),
    }
}

fn blocking_bookings(
    store: &mut dyn EventEaseStoreFacade,
    entity: EntityRef,
) -> Result<DeletionCheck, StoreError> {
    let filter = match entity {
        EntityRef::Venue(venue_id) => BookingFilter::builder().involving_venue(venue_id),
        EntityRef::Event(event_id) => BookingFilter::builder().for_event(event_id),
    };
    let bookings = store.get_bookings(filter.build())?;
    Ok(DeletionCheck {
        blocking_bookings: bookings.into_iter().map(|b| b.booking.id).collect(),
    })
}

fn check_double_booking(
    store: &mut dyn EventEaseStoreFacade,
    candidate: &NewBooking,
    own_id: Option<BookingId>,
) -> Result<Option<Rejection>, StoreError> {
    let conflicting_booking = find_booking_at(
        store,
        candidate.venue_id,
        candidate.booking_date,
        own_id,
    )?;
    Ok(conflicting_booking.map(|conflicting_booking| {
        debug!(
            "Venue {} is already booked on {} by booking {}",
            candidate.venue_id, candidate.booking_date, conflicting_booking
        );
        Rejection::DoubleBooked {
            venue_id: candidate.venue_id,
            date: candidate.booking_date,
            conflicting_booking: Some(conflicting_booking),
        }
    }))
}

/// Find the booking of the venue on the given date, leaving out the booking `own_id`
fn find_booking_at(
    store: &mut dyn EventEaseStoreFacade,
    venue_id: VenueId,
    date: NaiveDate,
    own_id: Option<BookingId>,
) -> Result<Option<BookingId>, StoreError> {
    let mut filter = BookingFilter::builder().at_venue(venue_id).on_date(date);
    if let Some(own_id) = own_id {
        filter = filter.excluding(own_id);
    }
    Ok(store
        .get_bookings(filter.build())?
        .first()
        .map(|b| b.booking.id))
}
