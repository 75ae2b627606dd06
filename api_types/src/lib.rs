use chrono::{naive::NaiveDate, DateTime, NaiveDateTime, Utc};
use serde::de::{Error, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Venue {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// Request data for creating or editing a venue
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VenueData {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    /// If not given on update, the current image of the venue is kept.
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: i32,
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "venueId")]
    pub venue_id: i32,
    #[serde(rename = "venueName")]
    pub venue_name: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// Request data for creating or editing an event
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventData {
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "venueId")]
    pub venue_id: i32,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Booking {
    pub id: i32,
    #[serde(rename = "bookingDate")]
    pub booking_date: NaiveDate,
    #[serde(rename = "eventId")]
    pub event_id: i32,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "venueId")]
    pub venue_id: i32,
    #[serde(rename = "venueName")]
    pub venue_name: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// Request data for creating or editing a booking
///
/// The booking date may be given with a time of day (e.g. from a datetime input field). Only the
/// calendar date is kept.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BookingData {
    #[serde(rename = "bookingDate", deserialize_with = "deserialize_booking_day")]
    pub booking_date: NaiveDate,
    #[serde(rename = "eventId")]
    pub event_id: i32,
    #[serde(rename = "venueId")]
    pub venue_id: i32,
    /// The `lastUpdated` value of the booking, as seen by the client before editing. If given, the
    /// update is refused when the booking has been changed in the meantime.
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Result of checking whether a venue or event may be deleted
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeletionCheck {
    pub deletable: bool,
    #[serde(rename = "blockingBookings")]
    pub blocking_bookings: Vec<i32>,
}

/// Parse a booking date from a date (`2025-06-01`) or a timestamp (`2025-06-01T18:30`,
/// `2025-06-01T18:30:00`, `2025-06-01T18:30:00+02:00`), dropping the time of day.
pub fn parse_booking_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = value.parse::<NaiveDate>() {
        return Some(date);
    }
    if let Ok(timestamp) = value.parse::<NaiveDateTime>() {
        return Some(timestamp.date());
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .ok()
        .map(|timestamp| timestamp.date())
}

fn deserialize_booking_day<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_booking_day(&value).ok_or_else(|| {
        D::Error::invalid_value(Unexpected::Str(&value), &"a date or a date with time of day")
    })
}
