use crate::booking_rules;
use crate::data_store::models::NewEvent;
use crate::data_store::{EventFilter, VenueId};
use crate::web::api::{accepted, APIError};
use crate::web::AppState;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

#[get("/events")]
async fn list_events(
    query: web::Query<EventFilterAsQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let events: Vec<eventease_api_types::Event> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        Ok(store.get_events(query.into_inner().into())?)
    })
    .await??
    .into_iter()
    .map(|e| e.into())
    .collect();
    Ok(web::Json(events))
}

#[derive(Deserialize, Serialize, Default)]
struct EventFilterAsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    venue: Option<VenueId>,
}

impl From<EventFilterAsQuery> for EventFilter {
    fn from(value: EventFilterAsQuery) -> Self {
        let mut filter = value
            .search
            .map(|search| EventFilter::search(&search))
            .unwrap_or_default();
        filter.venue = value.venue;
        filter
    }
}

#[get("/events/{event_id}")]
async fn get_event(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let event_id = path.into_inner();
    let event: eventease_api_types::Event = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        Ok(store.get_event(event_id)?)
    })
    .await??
    .into();
    Ok(web::Json(event))
}

#[post("/events")]
async fn create_event(
    data: web::Json<eventease_api_types::EventData>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let event = NewEvent::from_api(data.into_inner()).map_err(APIError::InvalidData)?;
    let created: eventease_api_types::Event = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        if !store.venue_exists(event.venue_id)? {
            return Err(APIError::NotExisting);
        }
        Ok(store.create_event(event)?)
    })
    .await??
    .into();
    Ok(HttpResponse::Created().json(created))
}

#[put("/events/{event_id}")]
async fn update_event(
    path: web::Path<i32>,
    data: web::Json<eventease_api_types::EventData>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let event_id = path.into_inner();
    let data = data.into_inner();
    let expected_last_update = data.last_updated;
    let event = NewEvent::from_api(data).map_err(APIError::InvalidData)?;
    let updated: eventease_api_types::Event = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        if !store.venue_exists(event.venue_id)? {
            return Err(APIError::NotExisting);
        }
        Ok(store.update_event(event_id, event, expected_last_update)?)
    })
    .await??
    .into();
    Ok(web::Json(updated))
}

#[delete("/events/{event_id}")]
async fn delete_event(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let event_id = path.into_inner();
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        accepted(booking_rules::delete_event(&mut *store, event_id)?)
    })
    .await??;

    Ok(HttpResponse::NoContent())
}

#[get("/events/{event_id}/deletion")]
async fn check_event_deletion(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let event_id = path.into_inner();
    let check: eventease_api_types::DeletionCheck = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        accepted(booking_rules::check_event_deletion(&mut *store, event_id)?)
    })
    .await??
    .into();
    Ok(web::Json(check))
}
