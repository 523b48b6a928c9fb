use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A cached reference to one remote photo, owned by a location.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Photo {
    pub id: Uuid,
    pub location_id: Uuid,
    pub url: String, // Flickr medium-size URL
    pub image_data: Option<Vec<u8>>, // Filled once downloaded
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    pub fn has_image_data(&self) -> bool {
        self.image_data.is_some()
    }
}

/// A photo row without its image bytes, as listed for an album.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PhotoSummary {
    pub id: Uuid,
    pub location_id: Uuid,
    pub url: String,
    pub has_image: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// A photo URL returned by the remote search, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub url: String,
}

impl ImageReference {
    pub fn new(url: impl Into<String>) -> Self {
        ImageReference { url: url.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub url: String,
    pub position: i64,
    pub has_image: bool,
}

impl From<&PhotoSummary> for PhotoResponse {
    fn from(photo: &PhotoSummary) -> Self {
        PhotoResponse {
            id: photo.id,
            url: photo.url.clone(),
            position: photo.position,
            has_image: photo.has_image,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PrefetchReport {
    pub fetched: usize,
    pub cached: usize,
    pub failed: usize,
}
