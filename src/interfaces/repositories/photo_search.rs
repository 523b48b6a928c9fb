use async_trait::async_trait;

use crate::{
    entities::{location::LocationPoint, photo::ImageReference},
    errors::SearchError,
};

#[async_trait]
pub trait PhotoSearchRepository: Send + Sync {
    /// Fetches one page of photo references around `point`. Has no side effects.
    async fn search_photos(
        &self,
        point: &LocationPoint,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ImageReference>, SearchError>;
}
