use async_trait::async_trait;

use crate::errors::FetchError;

#[async_trait]
pub trait ImageDataRepository: Send + Sync {
    /// Downloads the raw bytes behind `url`. No caching.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
