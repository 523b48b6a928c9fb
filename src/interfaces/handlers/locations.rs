use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{entities::location::LocationPoint, errors::AppError, utils::valid_uuid::valid_uuid, AppState};

#[instrument(skip(state, data))]
pub async fn create_location(
    state: web::Data<AppState>,
    data: web::Json<LocationPoint>,
) -> Result<impl Responder, AppError> {
    let response = state.location_handler
        .create_location(data.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(response))
}

#[instrument(skip(state))]
pub async fn list_locations(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let locations = state.location_handler.list_locations().await?;
    Ok(HttpResponse::Ok().json(locations))
}

#[instrument(skip(state, query))]
pub async fn lookup_location(
    state: web::Data<AppState>,
    query: web::Query<LocationPoint>,
) -> Result<impl Responder, AppError> {
    let location = state.location_handler
        .find_location(query.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(location))
}

#[instrument(skip(state))]
pub async fn get_location(
    location_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id = valid_uuid(&location_id, "location")?;
    let location = state.location_handler.get_location(&id).await?;

    Ok(HttpResponse::Ok().json(location))
}

/// Deletes the pin and drops whatever album state was held for it.
#[instrument(skip(state))]
pub async fn delete_location(
    location_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id = valid_uuid(&location_id, "location")?;

    state.location_handler.delete_location(&id).await?;
    state.photo_set_handler.discard(id);

    Ok(HttpResponse::NoContent().finish())
}
