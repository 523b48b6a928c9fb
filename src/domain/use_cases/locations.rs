use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::location::{Location, LocationCreatedResponse, LocationListResponse, LocationPoint},
    errors::AppError,
    repositories::location::LocationRepository,
};

pub struct LocationHandler<R>
where
    R: LocationRepository,
{
    pub location_repo: R,
}

impl<R> LocationHandler<R>
where
    R: LocationRepository,
{
    pub fn new(location_repo: R) -> Self {
        LocationHandler { location_repo }
    }

    /// Drops a new pin. Identical coordinates are rejected with a conflict.
    pub async fn create_location(&self, point: LocationPoint) -> Result<LocationCreatedResponse, AppError> {
        point.validate()?;

        let id = self.location_repo.create_location(&point).await?;
        tracing::info!(location_id = %id, latitude = point.latitude, longitude = point.longitude, "Location created");

        Ok(LocationCreatedResponse {
            id,
            latitude: point.latitude,
            longitude: point.longitude,
            message: "Location created successfully".to_string(),
        })
    }

    pub async fn list_locations(&self) -> Result<LocationListResponse, AppError> {
        let locations = self.location_repo.list_locations().await?;
        let total = locations.len();

        Ok(LocationListResponse { locations, total })
    }

    pub async fn get_location(&self, id: &Uuid) -> Result<Location, AppError> {
        self.location_repo.get_location_by_id(id).await
    }

    /// Finds the pin sitting exactly on `point`, as the map does when a pin is tapped.
    pub async fn find_location(&self, point: LocationPoint) -> Result<Location, AppError> {
        point.validate()?;

        self.location_repo
            .find_location_by_point(&point)
            .await?
            .ok_or_else(|| AppError::NotFound("No location at these coordinates".to_string()))
    }

    /// Deletes a pin and, through the store cascade, all of its photos.
    pub async fn delete_location(&self, id: &Uuid) -> Result<(), AppError> {
        if self.location_repo.delete_location(id).await? {
            tracing::info!(location_id = %id, "Location deleted");
            Ok(())
        } else {
            Err(AppError::NotFound("Location not found".to_string()))
        }
    }
}
