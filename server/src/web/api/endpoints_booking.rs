use crate::booking_rules;
use crate::data_store::models::NewBooking;
use crate::data_store::{BookingFilter, EventId, VenueId};
use crate::web::api::{accepted, APIError};
use crate::web::AppState;
use actix_web::{get, post, put, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

#[get("/bookings")]
async fn list_bookings(
    query: web::Query<BookingFilterAsQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let bookings: Vec<eventease_api_types::Booking> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            Ok(store.get_bookings(query.into_inner().into())?)
        })
        .await??
        .into_iter()
        .map(|b| b.into())
        .collect();
    Ok(web::Json(bookings))
}

#[derive(Deserialize, Serialize, Default)]
struct BookingFilterAsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    venue: Option<VenueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<chrono::NaiveDate>,
}

impl From<BookingFilterAsQuery> for BookingFilter {
    fn from(value: BookingFilterAsQuery) -> Self {
        let mut builder = BookingFilter::builder();
        if let Some(search) = value.search {
            builder = builder.search(&search);
        }
        if let Some(venue) = value.venue {
            builder = builder.at_venue(venue);
        }
        if let Some(event) = value.event {
            builder = builder.for_event(event);
        }
        if let Some(date) = value.date {
            builder = builder.on_date(date);
        }
        builder.build()
    }
}

#[get("/bookings/{booking_id}")]
async fn get_booking(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let booking_id = path.into_inner();
    let booking: eventease_api_types::Booking = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        Ok(store.get_booking(booking_id)?)
    })
    .await??
    .into();
    Ok(web::Json(booking))
}

#[post("/bookings")]
async fn create_booking(
    data: web::Json<eventease_api_types::BookingData>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let booking = NewBooking::from(data.into_inner());
    let created: eventease_api_types::Booking = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        accepted(booking_rules::create_booking(&mut *store, booking)?)
    })
    .await??
    .into();
    Ok(HttpResponse::Created().json(created))
}

#[put("/bookings/{booking_id}")]
async fn update_booking(
    path: web::Path<i32>,
    data: web::Json<eventease_api_types::BookingData>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let booking_id = path.into_inner();
    let data = data.into_inner();
    let expected_last_update = data.last_updated;
    let booking = NewBooking::from(data);
    let updated: eventease_api_types::Booking = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        accepted(booking_rules::update_booking(
            &mut *store,
            booking_id,
            booking,
            expected_last_update,
        )?)
    })
    .await??
    .into();
    Ok(web::Json(updated))
}
