use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{errors::PhotoSetError, utils::valid_uuid::valid_uuid, AppState};

#[instrument(skip(state))]
pub async fn open_album(
    location_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, PhotoSetError> {
    let id = valid_uuid(&location_id, "location")?;
    let album = state.photo_set_handler.open(id).await?;

    Ok(HttpResponse::Ok().json(album))
}

#[instrument(skip(state))]
pub async fn close_album(
    location_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, PhotoSetError> {
    let id = valid_uuid(&location_id, "location")?;
    state.photo_set_handler.close(id);

    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(state))]
pub async fn new_collection(
    location_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, PhotoSetError> {
    let id = valid_uuid(&location_id, "location")?;
    let response = state.photo_set_handler.request_new_collection(id).await?;

    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state))]
pub async fn toggle_selection(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<impl Responder, PhotoSetError> {
    let (location_id, photo_id) = path.into_inner();
    let location_id = valid_uuid(&location_id, "location")?;
    let photo_id = valid_uuid(&photo_id, "photo")?;

    let change = state.photo_set_handler.toggle_select(location_id, photo_id)?;

    Ok(HttpResponse::Ok().json(change))
}

#[instrument(skip(state))]
pub async fn prefetch_album(
    location_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, PhotoSetError> {
    let id = valid_uuid(&location_id, "location")?;
    let report = state.photo_set_handler.prefetch_payloads(id).await?;

    Ok(HttpResponse::Ok().json(report))
}
