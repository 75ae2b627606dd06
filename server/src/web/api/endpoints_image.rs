use crate::web::api::APIError;
use crate::web::AppState;
use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{get, web, HttpResponse, Responder};

/// Serve an uploaded venue image. Image names are unique, so the response may be cached forever.
#[get("/images/{name}")]
async fn get_image(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let name = path.into_inner();
    let content_type = mime_guess::from_path(&name).first_or_octet_stream();
    let data = web::block(move || state.images.read_image(&name)).await??;
    Ok(HttpResponse::Ok()
        .content_type(content_type.as_ref())
        .append_header(CacheControl(vec![CacheDirective::MaxAge(86400 * 365)]))
        .body(data))
}
