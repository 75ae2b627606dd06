use std::fmt::Display;

mod endpoints_booking;
mod endpoints_event;
mod endpoints_image;
mod endpoints_venue;
#[cfg(test)]
mod tests;

use crate::booking_rules::{EntityRef, Rejection, RuleOutcome};
use crate::data_store::StoreError;
use crate::image_store::ImageStoreError;
use actix_web::error::JsonPayloadError;
use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    web, HttpResponse,
};
use serde_json::json;

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(get_api_service())
        .service(endpoints_image::get_image);
}

/// Maximum size of uploaded venue images in bytes
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

fn get_api_service() -> actix_web::Scope {
    let json_config =
        web::JsonConfig::default().error_handler(|err, _req| APIError::InvalidJson(err).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| APIError::InvalidData(err.to_string()).into());
    web::scope("/api/v1")
        .app_data(json_config)
        .app_data(query_config)
        .app_data(web::PayloadConfig::new(MAX_IMAGE_SIZE))
        .service(endpoints_venue::list_venues)
        .service(endpoints_venue::get_venue)
        .service(endpoints_venue::create_venue)
        .service(endpoints_venue::update_venue)
        .service(endpoints_venue::delete_venue)
        .service(endpoints_venue::check_venue_deletion)
        .service(endpoints_venue::upload_venue_image)
        .service(endpoints_event::list_events)
        .service(endpoints_event::get_event)
        .service(endpoints_event::create_event)
        .service(endpoints_event::update_event)
        .service(endpoints_event::delete_event)
        .service(endpoints_event::check_event_deletion)
        .service(endpoints_booking::list_bookings)
        .service(endpoints_booking::get_booking)
        .service(endpoints_booking::create_booking)
        .service(endpoints_booking::update_booking)
}

#[derive(Debug)]
pub enum APIError {
    NotExisting,
    /// The request has been refused by the booking rules
    Rejected(Rejection),
    InvalidJson(actix_web::error::JsonPayloadError),
    InvalidData(String),
    TransactionConflict,
    ConcurrentEditConflict,
    InternalError(String),
}

impl Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotExisting => f.write_str("Element does not exist")?,
            Self::Rejected(rejection) => write!(f, "{}", rejection)?,
            Self::InternalError(s) => {
                f.write_str("Internal error: ")?;
                f.write_str(s)?;
            }
            Self::InvalidJson(e) => {
                write!(f, "Invalid JSON request data: {}", e)?;
            }
            Self::InvalidData(e) => {
                write!(f, "Invalid request data: {}", e)?;
            }
            Self::TransactionConflict => {
                f.write_str("Concurrent database transaction conflict. Please retry request.")?;
            }
            Self::ConcurrentEditConflict => {
                f.write_str("Editing entity refused due to a concurrent update of the entity.")?;
            }
        };
        Ok(())
    }
}

impl APIError {
    /// Machine-readable details of booking rule rejections
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Rejected(Rejection::DoubleBooked {
                venue_id,
                date,
                conflicting_booking,
            }) => Some(json!({
                "venueId": venue_id,
                "date": date.to_string(),
                "conflictingBooking": conflicting_booking,
            })),
            Self::Rejected(Rejection::DeleteBlocked {
                entity,
                blocking_bookings,
            }) => {
                let (entity_type, id) = match entity {
                    EntityRef::Venue(id) => ("venue", id),
                    EntityRef::Event(id) => ("event", id),
                };
                Some(json!({
                    "entityType": entity_type,
                    "entityId": id,
                    "blockingBookings": blocking_bookings,
                }))
            }
            Self::Rejected(Rejection::StaleWrite { booking_id }) => Some(json!({
                "bookingId": booking_id,
            })),
            _ => None,
        }
    }
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse {
        let message = format!("{}", self);

        let mut body = json!({
            "httpCode": self.status_code().as_u16(),
            "message": message
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotExisting => StatusCode::NOT_FOUND,
            Self::Rejected(_) => StatusCode::CONFLICT,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidJson(e) => match e {
                JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                JsonPayloadError::Deserialize(json_error) if json_error.is_data() => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::InvalidData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TransactionConflict => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConcurrentEditConflict => StatusCode::CONFLICT,
        }
    }
}

/// Unwrap an accepted booking rules outcome or turn it into the matching error response
fn accepted<T>(outcome: RuleOutcome<T>) -> Result<T, APIError> {
    match outcome {
        RuleOutcome::Accepted(value) => Ok(value),
        RuleOutcome::Rejected(rejection) => Err(APIError::Rejected(rejection)),
        RuleOutcome::NotFound => Err(APIError::NotExisting),
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(error) => {
                Self::InternalError(format!("Could not connect to database: {}", error))
            }
            StoreError::QueryError(diesel_error) => Self::InternalError(format!(
                "Error while executing database query: {}",
                diesel_error
            )),
            StoreError::TransactionConflict => Self::TransactionConflict,
            StoreError::NotExisting => Self::NotExisting,
            StoreError::ConcurrentEditConflict => Self::ConcurrentEditConflict,
            // Only expected from writes, which are guarded by the booking rules
            StoreError::ConflictEntityExists | StoreError::StillReferenced => {
                Self::InternalError(format!("Unexpected constraint violation: {}", e))
            }
            StoreError::InvalidInputData(e) => Self::InvalidData(e),
            StoreError::InvalidDataInDatabase(e) => Self::InternalError(format!(
                "Data queried from database could not be deserialized: {}",
                e
            )),
        }
    }
}

impl From<ImageStoreError> for APIError {
    fn from(e: ImageStoreError) -> Self {
        match e {
            ImageStoreError::EmptyImage => Self::InvalidData(e.to_string()),
            ImageStoreError::InvalidName | ImageStoreError::NotFound => Self::NotExisting,
            ImageStoreError::IoError(_) | ImageStoreError::UrlError(_) => {
                Self::InternalError(e.to_string())
            }
        }
    }
}

impl From<actix_web::error::BlockingError> for APIError {
    fn from(_e: actix_web::error::BlockingError) -> Self {
        APIError::InternalError(
            "Could not get thread from thread pool for synchronous database operation.".to_owned(),
        )
    }
}
