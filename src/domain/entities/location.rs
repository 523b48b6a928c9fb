use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A user-placed geographic marker. Identity is the (latitude, longitude) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationPoint {
    #[validate(
        range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"),
        custom(function = "validate_finite", message = "Latitude must be a finite number")
    )]
    pub latitude: f64,

    #[validate(
        range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"),
        custom(function = "validate_finite", message = "Longitude must be a finite number")
    )]
    pub longitude: f64,
}

impl LocationPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        LocationPoint { latitude, longitude }
    }
}

fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("not_finite"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Location {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn point(&self) -> LocationPoint {
        LocationPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Serialize)]
pub struct LocationCreatedResponse {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LocationListResponse {
    pub locations: Vec<Location>,
    pub total: usize,
}
