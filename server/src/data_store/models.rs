use crate::data_store::{BookingId, EventId, VenueId};
use chrono::{naive::NaiveDate, DateTime, Utc};
use diesel::prelude::*;

#[derive(Clone, Debug, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::venues)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl From<Venue> for eventease_api_types::Venue {
    fn from(value: Venue) -> Self {
        Self {
            id: value.id,
            name: value.name,
            location: value.location,
            // Negative values are excluded by a CHECK constraint in the database
            capacity: value.capacity.and_then(|c| u32::try_from(c).ok()),
            image_url: value.image_url,
            last_updated: value.last_updated,
        }
    }
}

#[derive(Clone, Debug, Insertable, AsChangeset)]
#[diesel(table_name=super::schema::venues)]
#[diesel(treat_none_as_null = true)]
pub struct NewVenue {
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
}

impl NewVenue {
    /// Convert and validate venue data from the API. The error describes the invalid field.
    pub fn from_api(value: eventease_api_types::VenueData) -> Result<Self, String> {
        let name = value.name.trim();
        if name.is_empty() {
            return Err("Venue name must not be empty".to_owned());
        }
        let capacity = value
            .capacity
            .map(i32::try_from)
            .transpose()
            .map_err(|_| "Venue capacity is too large".to_owned())?;
        Ok(Self {
            name: name.to_owned(),
            location: non_empty(value.location),
            capacity,
            image_url: non_empty(value.image_url),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::events)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub description: Option<String>,
    pub venue_id: VenueId,
    pub last_updated: DateTime<Utc>,
}

/// An event together with the venue hosting it
#[derive(Clone, Debug)]
pub struct FullEvent {
    pub event: Event,
    pub venue: Venue,
}

impl From<FullEvent> for eventease_api_types::Event {
    fn from(value: FullEvent) -> Self {
        Self {
            id: value.event.id,
            name: value.event.name,
            date: value.event.event_date,
            description: value.event.description,
            venue_id: value.event.venue_id,
            venue_name: value.venue.name,
            last_updated: value.event.last_updated,
        }
    }
}

#[derive(Clone, Debug, Insertable, AsChangeset)]
#[diesel(table_name=super::schema::events)]
#[diesel(treat_none_as_null = true)]
pub struct NewEvent {
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub description: Option<String>,
    pub venue_id: VenueId,
}

impl NewEvent {
    /// Convert and validate event data from the API. The error describes the invalid field.
    pub fn from_api(value: eventease_api_types::EventData) -> Result<Self, String> {
        let name = value.name.trim();
        if name.is_empty() {
            return Err("Event name must not be empty".to_owned());
        }
        Ok(Self {
            name: name.to_owned(),
            event_date: value.date,
            description: non_empty(value.description),
            venue_id: value.venue_id,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::bookings)]
pub struct Booking {
    pub id: BookingId,
    pub booking_date: NaiveDate,
    pub event_id: EventId,
    pub venue_id: VenueId,
    pub last_updated: DateTime<Utc>,
}

/// A booking together with its event and the booked venue
///
/// Note that the event may be hosted at a different venue than the booked one.
#[derive(Clone, Debug)]
pub struct FullBooking {
    pub booking: Booking,
    pub event: Event,
    pub venue: Venue,
}

impl From<FullBooking> for eventease_api_types::Booking {
    fn from(value: FullBooking) -> Self {
        Self {
            id: value.booking.id,
            booking_date: value.booking.booking_date,
            event_id: value.booking.event_id,
            event_name: value.event.name,
            venue_id: value.booking.venue_id,
            venue_name: value.venue.name,
            last_updated: value.booking.last_updated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name=super::schema::bookings)]
pub struct NewBooking {
    pub booking_date: NaiveDate,
    pub event_id: EventId,
    pub venue_id: VenueId,
}

impl From<eventease_api_types::BookingData> for NewBooking {
    fn from(value: eventease_api_types::BookingData) -> Self {
        Self {
            booking_date: value.booking_date,
            event_id: value.event_id,
            venue_id: value.venue_id,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
