use actix_web::{http::header, web, HttpResponse, Responder};
use tracing::instrument;

use crate::{errors::PhotoSetError, utils::valid_uuid::valid_uuid, AppState};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Serves the photo's bytes, downloading them on first request.
#[instrument(skip(state))]
pub async fn get_photo_image(
    photo_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, PhotoSetError> {
    let id = valid_uuid(&photo_id, "photo")?;
    let data = state.photo_set_handler.ensure_payload(id).await?;

    let content_type = infer::get(&data)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_CONTENT_TYPE);

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(data))
}
