use crate::booking_rules;
use crate::data_store::models::NewVenue;
use crate::data_store::VenueFilter;
use crate::image_store::ImageStore;
use crate::web::api::{accepted, APIError};
use crate::web::AppState;
use actix_web::http::header;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::warn;
use serde::Deserialize;

#[get("/venues")]
async fn list_venues(
    query: web::Query<SearchQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let venues: Vec<eventease_api_types::Venue> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let filter = match &query.search {
            Some(search) => VenueFilter::search(search),
            None => VenueFilter::default(),
        };
        Ok(store.get_venues(filter)?)
    })
    .await??
    .into_iter()
    .map(|v| v.into())
    .collect();
    Ok(web::Json(venues))
}

#[derive(Deserialize, Default)]
struct SearchQuery {
    #[serde(default)]
    search: Option<String>,
}

#[get("/venues/{venue_id}")]
async fn get_venue(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let venue_id = path.into_inner();
    let venue: eventease_api_types::Venue = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        Ok(store.get_venue(venue_id)?)
    })
    .await??
    .into();
    Ok(web::Json(venue))
}

#[post("/venues")]
async fn create_venue(
    data: web::Json<eventease_api_types::VenueData>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let venue = NewVenue::from_api(data.into_inner()).map_err(APIError::InvalidData)?;
    let created: eventease_api_types::Venue = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        Ok(store.create_venue(venue)?)
    })
    .await??
    .into();
    Ok(HttpResponse::Created().json(created))
}

#[put("/venues/{venue_id}")]
async fn update_venue(
    path: web::Path<i32>,
    data: web::Json<eventease_api_types::VenueData>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let venue_id = path.into_inner();
    let data = data.into_inner();
    let expected_last_update = data.last_updated;
    let mut venue = NewVenue::from_api(data).map_err(APIError::InvalidData)?;
    let updated: eventease_api_types::Venue = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let previous_image = store.get_venue(venue_id)?.image_url;
        if venue.image_url.is_none() {
            venue.image_url = previous_image.clone();
        }
        let updated = store.update_venue(venue_id, venue, expected_last_update)?;
        if let Some(previous_image) = previous_image {
            if updated.image_url.as_ref() != Some(&previous_image) {
                discard_image(&*state.images, &previous_image);
            }
        }
        Ok(updated)
    })
    .await??
    .into();
    Ok(web::Json(updated))
}

#[delete("/venues/{venue_id}")]
async fn delete_venue(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let venue_id = path.into_inner();
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let image = store.get_venue(venue_id)?.image_url;
        accepted(booking_rules::delete_venue(&mut *store, venue_id)?)?;
        if let Some(image) = image {
            discard_image(&*state.images, &image);
        }
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent())
}

#[get("/venues/{venue_id}/deletion")]
async fn check_venue_deletion(
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let venue_id = path.into_inner();
    let check: eventease_api_types::DeletionCheck = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        accepted(booking_rules::check_venue_deletion(&mut *store, venue_id)?)
    })
    .await??
    .into();
    Ok(web::Json(check))
}

#[derive(Deserialize, Default)]
struct ImageUploadQuery {
    /// Original file name of the image, used for choosing the file extension
    #[serde(default, rename = "fileName")]
    file_name: Option<String>,
}

/// Upload a new image for the venue. The image data is taken from the raw request body.
#[put("/venues/{venue_id}/image")]
async fn upload_venue_image(
    path: web::Path<i32>,
    query: web::Query<ImageUploadQuery>,
    body: web::Bytes,
    request: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let venue_id = path.into_inner();
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_owned());
    let updated: eventease_api_types::Venue = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let previous_image = store.get_venue(venue_id)?.image_url;
        let image_url = state.images.store_image(
            &body,
            content_type.as_deref(),
            query.file_name.as_deref(),
        )?;
        let venue = match store.set_venue_image(venue_id, &image_url) {
            Ok(venue) => venue,
            Err(e) => {
                discard_image(&*state.images, &image_url);
                return Err(e.into());
            }
        };
        if let Some(previous_image) = previous_image {
            discard_image(&*state.images, &previous_image);
        }
        Ok(venue)
    })
    .await??
    .into();
    Ok(web::Json(updated))
}

/// Remove an image which is no longer referenced by its venue. Failures are only logged.
fn discard_image(images: &dyn ImageStore, image_url: &str) {
    if let Err(e) = images.delete_image(image_url) {
        warn!("Could not delete image {}: {}", image_url, e);
    }
}
