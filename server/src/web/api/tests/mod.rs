
use crate::data_store::models::Booking;
use crate::data_store::store_mock::{StoreMock, StoreMockData};
use crate::data_store::StoreError;
use crate::image_store::MemoryImageStore;
use crate::web::api::{configure_app, APIError};
use crate::web::AppState;
use actix_web::http::StatusCode;
use actix_web::test::{call_service, init_service, read_body, read_body_json, TestRequest};
use actix_web::{web, App, ResponseError};
use serde_json::{json, Value};
use std::sync::Arc;

fn create_state() -> (AppState, Arc<StoreMock>) {
    let store = Arc::new(StoreMock::default());
    sample_data::fill_sample_data(&*store);
    let state = AppState {
        store: store.clone(),
        images: Arc::new(MemoryImageStore::default()),
    };
    (state, store)
}

#[actix_web::test]
async fn test_double_booking_is_rejected() {
    let (state, store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(json!({"bookingDate": "2025-06-01", "eventId": 4, "venueId": 1}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["httpCode"], 409);
    assert_eq!(body["message"], "Venue already booked on this date");
    assert_eq!(body["details"]["conflictingBooking"], 7);
    assert_eq!(store.data.lock().unwrap().bookings.len(), 1);

    // A time of day is dropped, the next day is free
    let req = TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(json!({"bookingDate": "2025-06-02T10:00", "eventId": 4, "venueId": 1}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let booking: eventease_api_types::Booking = read_body_json(resp).await;
    assert_eq!(
        booking.booking_date,
        chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    );
    assert_eq!(booking.event_name, "Poetry Slam");
    assert_eq!(booking.venue_name, "Town Hall");

    let req = TestRequest::get()
        .uri(&format!("/api/v1/bookings/{}", booking.id))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_update_booking() {
    let (state, _store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::get().uri("/api/v1/bookings/7").to_request();
    let booking: eventease_api_types::Booking =
        read_body_json(call_service(&app, req).await).await;

    // Changing the event without changing the date does not conflict with the booking itself
    let req = TestRequest::put()
        .uri("/api/v1/bookings/7")
        .set_json(json!({
            "bookingDate": "2025-06-01",
            "eventId": 5,
            "venueId": 1,
            "lastUpdated": booking.last_updated,
        }))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: eventease_api_types::Booking = read_body_json(resp).await;
    assert_eq!(updated.event_name, "Jazz Night");

    // Outdated version of the booking
    let req = TestRequest::put()
        .uri("/api/v1/bookings/7")
        .set_json(json!({
            "bookingDate": "2025-06-03",
            "eventId": 5,
            "venueId": 1,
            "lastUpdated": booking.last_updated,
        }))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["details"]["bookingId"], 7);

    let req = TestRequest::put()
        .uri("/api/v1/bookings/42")
        .set_json(json!({"bookingDate": "2025-06-03", "eventId": 5, "venueId": 1}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_delete_event() {
    let (state, _store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::get().uri("/api/v1/events/3/deletion").to_request();
    let check: eventease_api_types::DeletionCheck =
        read_body_json(call_service(&app, req).await).await;
    assert!(!check.deletable);
    assert_eq!(check.blocking_bookings, vec![7]);

    let req = TestRequest::delete().uri("/api/v1/events/3").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "Cannot delete event, it has associated bookings"
    );
    assert_eq!(body["details"]["blockingBookings"], json!([7]));

    let req = TestRequest::get().uri("/api/v1/events/3").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::delete().uri("/api/v1/events/5").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let req = TestRequest::get().uri("/api/v1/events/5").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_delete_venue() {
    let (state, store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::delete().uri("/api/v1/venues/1").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "Cannot delete venue, it has associated bookings"
    );
    let req = TestRequest::get().uri("/api/v1/venues/1").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::delete().uri("/api/v1/venues/6").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The Rose Garden's event has no bookings and is removed together with the venue
    let req = TestRequest::delete().uri("/api/v1/venues/2").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let req = TestRequest::get().uri("/api/v1/events/4").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::delete().uri("/api/v1/venues/2").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.data.lock().unwrap().venues.len(), 1);
}

#[actix_web::test]
async fn test_create_and_update_venue_and_event() {
    let (state, _store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::post()
        .uri("/api/v1/venues")
        .set_json(json!({"name": "Harbour Hall", "location": "Pier 3", "capacity": 120}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let venue: eventease_api_types::Venue = read_body_json(resp).await;
    assert_eq!(venue.capacity, Some(120));

    let req = TestRequest::post()
        .uri("/api/v1/venues")
        .set_json(json!({"name": "  "}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = TestRequest::post()
        .uri("/api/v1/venues")
        .set_json(json!({"name": "Arena", "capacity": -5}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = TestRequest::post()
        .uri("/api/v1/events")
        .set_json(json!({"name": "Harbour Festival", "date": "2025-08-01T12:00:00Z", "venueId": venue.id}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let event: eventease_api_types::Event = read_body_json(resp).await;
    assert_eq!(event.venue_name, "Harbour Hall");

    let req = TestRequest::post()
        .uri("/api/v1/events")
        .set_json(json!({"name": "Nowhere Party", "date": "2025-08-01T12:00:00Z", "venueId": 42}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::put()
        .uri(&format!("/api/v1/events/{}", event.id))
        .set_json(json!({
            "name": "Harbour Festival",
            "date": "2025-08-02T12:00:00Z",
            "venueId": 2,
            "lastUpdated": event.last_updated,
        }))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let event: eventease_api_types::Event = read_body_json(resp).await;
    assert_eq!(event.venue_name, "Rose Garden");

    let req = TestRequest::put()
        .uri(&format!("/api/v1/venues/{}", venue.id))
        .set_json(json!({
            "name": "Harbour Hall",
            "capacity": 150,
            "lastUpdated": "2000-01-01T00:00:00Z",
        }))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_venue_image() {
    let (state, _store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::put()
        .uri("/api/v1/venues/2/image")
        .insert_header(("Content-Type", "image/png"))
        .set_payload("\u{89}PNG data")
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let venue: eventease_api_types::Venue = read_body_json(resp).await;
    let image_url = venue.image_url.unwrap();
    assert!(image_url.starts_with("http://localhost/images/"));
    assert!(image_url.ends_with(".png"));

    let image_path = image_url.trim_start_matches("http://localhost");
    let req = TestRequest::get().uri(image_path).to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap().to_str().unwrap(),
        "image/png"
    );
    assert_eq!(read_body(resp).await, "\u{89}PNG data".as_bytes());

    // Updating the venue without image keeps the image
    let req = TestRequest::put()
        .uri("/api/v1/venues/2")
        .set_json(json!({"name": "Rose Garden", "capacity": 90}))
        .to_request();
    let venue: eventease_api_types::Venue = read_body_json(call_service(&app, req).await).await;
    assert_eq!(venue.image_url.as_deref(), Some(image_url.as_str()));

    let req = TestRequest::put()
        .uri("/api/v1/venues/2/image")
        .insert_header(("Content-Type", "image/png"))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = TestRequest::put()
        .uri("/api/v1/venues/42/image")
        .insert_header(("Content-Type", "image/png"))
        .set_payload("\u{89}PNG data")
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::get().uri("/images/unknown.png").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_unused_venue_images_are_removed() {
    let store = Arc::new(StoreMock::default());
    sample_data::fill_sample_data(&*store);
    let images = Arc::new(MemoryImageStore::default());
    let state = AppState {
        store: store.clone(),
        images: images.clone(),
    };
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::put()
        .uri("/api/v1/venues/2/image")
        .insert_header(("Content-Type", "image/png"))
        .set_payload("\u{89}PNG data")
        .to_request();
    let venue: eventease_api_types::Venue = read_body_json(call_service(&app, req).await).await;
    let first_image = venue.image_url.unwrap();

    let req = TestRequest::put()
        .uri("/api/v1/venues/2/image?fileName=garden.jpg")
        .insert_header(("Content-Type", "image/jpeg"))
        .set_payload("JPEG data")
        .to_request();
    let venue: eventease_api_types::Venue = read_body_json(call_service(&app, req).await).await;
    let second_image = venue.image_url.unwrap();
    assert!(second_image.ends_with(".jpg"));
    let req = TestRequest::get()
        .uri(first_image.trim_start_matches("http://localhost"))
        .to_request();
    assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(images.images.lock().unwrap().len(), 1);

    // The venue vanishes while its image is uploaded
    store.data.lock().unwrap().before_next_write = Some(Box::new(|data: &mut StoreMockData| {
        data.venues.retain(|v| v.id != 6)
    }));
    let req = TestRequest::put()
        .uri("/api/v1/venues/6/image")
        .insert_header(("Content-Type", "image/png"))
        .set_payload("\u{89}PNG data")
        .to_request();
    assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(images.images.lock().unwrap().len(), 1);

    let req = TestRequest::delete().uri("/api/v1/venues/2").to_request();
    assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    assert!(images.images.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn test_search() {
    let (state, _store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::get().uri("/api/v1/venues?search=GARDEN").to_request();
    let venues: Vec<eventease_api_types::Venue> =
        read_body_json(call_service(&app, req).await).await;
    assert_eq!(venues.len(), 1);
    assert_eq!(venues[0].name, "Rose Garden");

    let req = TestRequest::get().uri("/api/v1/venues").to_request();
    let venues: Vec<eventease_api_types::Venue> =
        read_body_json(call_service(&app, req).await).await;
    assert_eq!(
        venues.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        vec!["Old Barn", "Rose Garden", "Town Hall"]
    );

    let req = TestRequest::get().uri("/api/v1/events?search=town").to_request();
    let events: Vec<eventease_api_types::Event> =
        read_body_json(call_service(&app, req).await).await;
    assert_eq!(
        events.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![3, 5]
    );

    let req = TestRequest::get().uri("/api/v1/bookings?search=concert").to_request();
    let bookings: Vec<eventease_api_types::Booking> =
        read_body_json(call_service(&app, req).await).await;
    assert_eq!(bookings.len(), 1);
    let req = TestRequest::get().uri("/api/v1/bookings?search=2025-06-01").to_request();
    let bookings: Vec<eventease_api_types::Booking> =
        read_body_json(call_service(&app, req).await).await;
    assert_eq!(bookings.len(), 1);
    let req = TestRequest::get().uri("/api/v1/bookings?search=slam").to_request();
    let bookings: Vec<eventease_api_types::Booking> =
        read_body_json(call_service(&app, req).await).await;
    assert!(bookings.is_empty());
}

#[actix_web::test]
async fn test_errors() {
    let (state, store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    let req = TestRequest::get().uri("/api/v1/bookings/42").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["httpCode"], 404);

    let req = TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(json!({"bookingDate": "2025-06-05", "eventId": 3, "venueId": 42}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(json!({"bookingDate": "tomorrow", "eventId": 3, "venueId": 1}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"bookingDate\": ")
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    store.data.lock().unwrap().next_error =
        Some(StoreError::ConnectionError("database is down".to_string()));
    let req = TestRequest::get().uri("/api/v1/venues").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    store.data.lock().unwrap().next_error = Some(StoreError::TransactionConflict);
    let req = TestRequest::delete().uri("/api/v1/events/5").to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(store.data.lock().unwrap().events.len(), 3);
}

#[actix_web::test]
async fn test_concurrent_booking_is_rejected() {
    let (state, store) = create_state();
    let app = init_service(
        App::new()
            .configure(configure_app)
            .app_data(web::Data::new(state)),
    )
    .await;

    // Another request books the Town Hall between the check and the insert
    store.data.lock().unwrap().before_next_write = Some(Box::new(|data: &mut StoreMockData| {
        data.bookings.push(Booking {
            id: 98,
            booking_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            event_id: 5,
            venue_id: 1,
            last_updated: chrono::Utc::now(),
        })
    }));
    let req = TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(json!({"bookingDate": "2025-06-02", "eventId": 4, "venueId": 1}))
        .to_request();
    let resp = call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["message"], "Venue already booked on this date");
    assert_eq!(
        body["details"],
        json!({"venueId": 1, "date": "2025-06-02", "conflictingBooking": 98})
    );
    assert_eq!(store.data.lock().unwrap().bookings.len(), 2);
}

#[test]
fn test_constraint_violations_outside_booking_rules() {
    for error in [StoreError::ConflictEntityExists, StoreError::StillReferenced] {
        let api_error = APIError::from(error);
        assert!(matches!(api_error, APIError::InternalError(_)));
        assert_eq!(api_error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
