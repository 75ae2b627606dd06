//! The storage layer: the database interface
//!
//! The primary entry point to this module is the function [get_store_from_env], which returns an
//! object implementing the [EventEaseStore] trait. This object can be shared between threads in a
//! global application state and be used to create [EventEaseStoreFacade] instances for
//! interaction with the database. These provide a CRUD-like interface, using the data models from
//! the [models] module.
//!
//! The primary implementation of [EventEaseStore] ([postgres::PgDataStore]) wraps a PostgreSQL
//! connection pool and its corresponding [EventEaseStoreFacade] objects
//! ([postgres::PgDataStoreFacade]) hold a reference to one pooled connection each, using the
//! Diesel query DSL for implementing the database interaction.
//!
//! The facade does not enforce the booking rules (no double bookings, no deletion of venues or
//! events with bookings) by itself, apart from the database constraints backing them. Callers are
//! expected to go through [crate::booking_rules] for these operations.
//!
//! There is also a mock implementation for unittests.

use crate::cli_error::CliError;
use crate::setup;
use chrono::{DateTime, NaiveDate, Utc};

pub mod models;
mod postgres;
mod schema;
mod util;

/// Get a [EventEaseStore] instance, according to the "DATABASE_URL" environment variable.
///
/// The DATABASE_URL must be a PosgreSQL connection url, following the schema
/// "postgres://{user}:{password}@{host}/{database}".
pub fn get_store_from_env() -> Result<impl EventEaseStore, CliError> {
    postgres::PgDataStore::new(&setup::get_database_url_from_env()?)
        .map_err(|err| CliError::DatabaseUnavailable(err.to_string()))
}

pub type VenueId = i32;
pub type EventId = i32;
pub type BookingId = i32;

pub trait EventEaseStoreFacade {
    /// Get a filtered list of venues, sorted by name
    fn get_venues(&mut self, filter: VenueFilter) -> Result<Vec<models::Venue>, StoreError>;
    fn get_venue(&mut self, venue_id: VenueId) -> Result<models::Venue, StoreError>;
    fn venue_exists(&mut self, venue_id: VenueId) -> Result<bool, StoreError>;
    fn create_venue(&mut self, venue: models::NewVenue) -> Result<models::Venue, StoreError>;
    /// Update the data of an existing venue.
    ///
    /// # return value
    /// - `Ok(venue)` with the updated venue
    /// - `Err(StoreError::NotExisting)` if the venue does not exist (anymore)
    /// - `Err(StoreError::ConcurrentEditConflict)` if `expected_last_update` is given and the
    ///   venue has been changed since then
    fn update_venue(
        &mut self,
        venue_id: VenueId,
        venue: models::NewVenue,
        expected_last_update: Option<DateTime<Utc>>,
    ) -> Result<models::Venue, StoreError>;
    fn set_venue_image(
        &mut self,
        venue_id: VenueId,
        image_url: &str,
    ) -> Result<models::Venue, StoreError>;
    /// Delete a venue together with the events hosted there.
    ///
    /// Fails with `StoreError::StillReferenced` if any booking refers to the venue or to one of
    /// its events.
    fn delete_venue(&mut self, venue_id: VenueId) -> Result<(), StoreError>;

    /// Get a filtered list of events with their venues, sorted by date
    fn get_events(&mut self, filter: EventFilter) -> Result<Vec<models::FullEvent>, StoreError>;
    fn get_event(&mut self, event_id: EventId) -> Result<models::FullEvent, StoreError>;
    fn event_exists(&mut self, event_id: EventId) -> Result<bool, StoreError>;
    fn create_event(&mut self, event: models::NewEvent) -> Result<models::FullEvent, StoreError>;
    /// Update the data of an existing event. See [Self::update_venue] for the possible errors.
    fn update_event(
        &mut self,
        event_id: EventId,
        event: models::NewEvent,
        expected_last_update: Option<DateTime<Utc>>,
    ) -> Result<models::FullEvent, StoreError>;
    /// Delete an event. Fails with `StoreError::StillReferenced` if any booking refers to it.
    fn delete_event(&mut self, event_id: EventId) -> Result<(), StoreError>;

    /// Get a filtered list of bookings with their events and venues
    ///
    /// Bookings are returned in chronological order, i.e. sorted by (booking_date, id)
    fn get_bookings(
        &mut self,
        filter: BookingFilter,
    ) -> Result<Vec<models::FullBooking>, StoreError>;
    fn get_booking(&mut self, booking_id: BookingId) -> Result<models::FullBooking, StoreError>;
    /// Insert a new booking.
    ///
    /// Fails with `StoreError::ConflictEntityExists` if the venue is already booked on that date.
    fn create_booking(
        &mut self,
        booking: models::NewBooking,
    ) -> Result<models::FullBooking, StoreError>;
    /// Update an existing booking. See [Self::update_venue] for the possible errors.
    ///
    /// Additionally fails with `StoreError::ConflictEntityExists` if the venue is already booked
    /// on that date by another booking.
    fn update_booking(
        &mut self,
        booking_id: BookingId,
        booking: models::NewBooking,
        expected_last_update: Option<DateTime<Utc>>,
    ) -> Result<models::FullBooking, StoreError>;
}

/// Filter options for retrieving venues via EventEaseStoreFacade::get_venues()
#[derive(Default, Clone, Debug)]
pub struct VenueFilter {
    /// Only include venues whose name or location contains this text (case-insensitive)
    pub search: Option<String>,
}

impl VenueFilter {
    pub fn search(search: &str) -> Self {
        Self {
            search: util::normalize_search_term(search),
        }
    }

    /// Checks if a given venue matches the filter
    ///
    /// Usually, filtering should be done by the database. This function can be used for separate
    /// checks of individual venues in software.
    pub fn matches(&self, venue: &models::Venue) -> bool {
        if let Some(search) = &self.search {
            if !util::contains_ignore_case(&venue.name, search)
                && !venue
                    .location
                    .as_deref()
                    .is_some_and(|l| util::contains_ignore_case(l, search))
            {
                return false;
            }
        }
        true
    }
}

/// Filter options for retrieving events via EventEaseStoreFacade::get_events()
#[derive(Default, Clone, Debug)]
pub struct EventFilter {
    /// Only include events whose name, description or venue name contains this text
    /// (case-insensitive)
    pub search: Option<String>,
    /// Only include events hosted at the given venue
    pub venue: Option<VenueId>,
}

impl EventFilter {
    pub fn search(search: &str) -> Self {
        Self {
            search: util::normalize_search_term(search),
            venue: None,
        }
    }

    /// Checks if a given event matches the filter
    pub fn matches(&self, event: &models::FullEvent) -> bool {
        if let Some(venue) = self.venue {
            if event.event.venue_id != venue {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !util::contains_ignore_case(&event.event.name, search)
                && !event
                    .event
                    .description
                    .as_deref()
                    .is_some_and(|d| util::contains_ignore_case(d, search))
                && !util::contains_ignore_case(&event.venue.name, search)
            {
                return false;
            }
        }
        true
    }
}

/// Filter options for retrieving bookings via EventEaseStoreFacade::get_bookings()
///
/// Can be constructed through the BookingFilterBuilder
#[derive(Default, Clone, Debug)]
pub struct BookingFilter {
    /// Filter for bookings of the given venue
    pub venue: Option<VenueId>,
    /// Filter for bookings of the given event
    pub event: Option<EventId>,
    /// Filter for bookings which either book the given venue or belong to an event hosted at the
    /// given venue
    pub involving_venue: Option<VenueId>,
    /// Filter for bookings on the given date
    pub date: Option<NaiveDate>,
    /// Exclude the booking with the given id
    pub exclude: Option<BookingId>,
    /// Filter for bookings whose event name, venue name or ISO date (YYYY-MM-DD) contains this
    /// text (case-insensitive)
    pub search: Option<String>,
}

impl BookingFilter {
    pub fn builder() -> BookingFilterBuilder {
        BookingFilterBuilder::new()
    }

    /// Checks if a given booking matches the filter
    ///
    /// Usually, filtering should be done by the database. This function can be used for separate
    /// checks of individual bookings in software.
    pub fn matches(&self, booking: &models::FullBooking) -> bool {
        if let Some(venue) = self.venue {
            if booking.booking.venue_id != venue {
                return false;
            }
        }
        if let Some(event) = self.event {
            if booking.booking.event_id != event {
                return false;
            }
        }
        if let Some(venue) = self.involving_venue {
            if booking.booking.venue_id != venue && booking.event.venue_id != venue {
                return false;
            }
        }
        if let Some(date) = self.date {
            if booking.booking.booking_date != date {
                return false;
            }
        }
        if let Some(exclude) = self.exclude {
            if booking.booking.id == exclude {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !util::contains_ignore_case(&booking.event.name, search)
                && !util::contains_ignore_case(&booking.venue.name, search)
                && !util::contains_ignore_case(
                    &booking.booking.booking_date.format("%Y-%m-%d").to_string(),
                    search,
                )
            {
                return false;
            }
        }
        true
    }
}

/// Builder for constructing BookingFilter objects
pub struct BookingFilterBuilder {
    result: BookingFilter,
}

impl BookingFilterBuilder {
    pub fn new() -> Self {
        Self {
            result: BookingFilter::default(),
        }
    }

    /// Add filter to only include bookings of the given venue
    pub fn at_venue(mut self, venue_id: VenueId) -> Self {
        self.result.venue = Some(venue_id);
        self
    }

    /// Add filter to only include bookings of the given event
    pub fn for_event(mut self, event_id: EventId) -> Self {
        self.result.event = Some(event_id);
        self
    }

    /// Add filter to only include bookings that book the given venue or belong to an event hosted
    /// at the given venue
    pub fn involving_venue(mut self, venue_id: VenueId) -> Self {
        self.result.involving_venue = Some(venue_id);
        self
    }

    /// Add filter to only include bookings on the given date
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.result.date = Some(date);
        self
    }

    /// Add filter to leave out the given booking
    pub fn excluding(mut self, booking_id: BookingId) -> Self {
        self.result.exclude = Some(booking_id);
        self
    }

    /// Add a case-insensitive text search. An empty search text does not filter anything.
    pub fn search(mut self, search: &str) -> Self {
        self.result.search = util::normalize_search_term(search);
        self
    }

    /// Create the BookingFilter object
    pub fn build(self) -> BookingFilter {
        self.result
    }
}

pub trait EventEaseStore: Send + Sync {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn EventEaseStoreFacade + 'a>, StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    /// Connection the database failed. See string description for details.
    ConnectionError(String),
    /// The query could not be executed because of some error not covered by the other members (see
    /// string description)
    QueryError(diesel::result::Error),
    /// Database transaction could not be commited due to a conflicting concurrent transaction
    TransactionConflict,
    /// The requested entity does not exist
    NotExisting,
    /// The entity could not be stored because it conflicts with an existing one (i.e. the venue
    /// is already booked on the booking's date)
    ConflictEntityExists,
    /// The entity has not been updated because it has been changed since the provided "last
    /// modification date".
    ConcurrentEditConflict,
    /// The entity cannot be deleted, because other entities (bookings) still refer to it
    StillReferenced,
    /// The provided data is invalid, i.e. it does not match the expected ranges or violates a
    /// SQL constraint. See string description for details.
    InvalidInputData(String),
    /// Some data queried from the database could not be deserialized. See string description for
    /// details.
    InvalidDataInDatabase(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotExisting,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => Self::ConflictEntityExists,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::SerializationFailure,
                _,
            ) => Self::TransactionConflict,
            diesel::result::Error::DatabaseError(
                e @ diesel::result::DatabaseErrorKind::ForeignKeyViolation
                | e @ diesel::result::DatabaseErrorKind::CheckViolation
                | e @ diesel::result::DatabaseErrorKind::NotNullViolation,
                _,
            ) => Self::InvalidInputData(format!("{:?}", e)),
            diesel::result::Error::SerializationError(e) => Self::InvalidInputData(e.to_string()),
            diesel::result::Error::DeserializationError(e) => {
                Self::InvalidDataInDatabase(e.to_string())
            }
            _ => Self::QueryError(error),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        Self::ConnectionError(error.to_string())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Error connecting to database: {}", e),
            Self::QueryError(e) => write!(f, "Error while executing database query: {}", e),
            Self::TransactionConflict => f.write_str("Database transaction could not be commited due to a conflicting concurrent transaction"),
            Self::NotExisting => f.write_str("Database record does not exist."),
            Self::ConflictEntityExists => f.write_str("Conflicting database record exists already."),
            Self::ConcurrentEditConflict => f.write_str("Updating the entity has been rejected, because the change is not based on the latest version."),
            Self::StillReferenced => f.write_str("Database record is still referenced by other records."),
            Self::InvalidInputData(e) => {
                write!(f, "Data to be stored in database is not valid: {}", e)
            }
            Self::InvalidDataInDatabase(e) => {
                write!(f, "Data queried from database could not be deserialized: {}", e)
            }
        }
    }
}

impl std::error::Error for StoreError {}
