use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{
    constants::{
        FLICKR_MEDIUM_URL_EXTRA, FLICKR_OK_STATUS, FLICKR_RESPONSE_FORMAT, FLICKR_SEARCH_METHOD,
    },
    entities::{location::LocationPoint, photo::ImageReference},
    errors::{FetchError, SearchError},
    geo::BoundingBox,
    repositories::{image_data::ImageDataRepository, photo_search::PhotoSearchRepository},
    settings::FlickrSettings,
};

/// Talks to the Flickr REST API. Cheap to clone; the inner `reqwest::Client` is shared.
#[derive(Clone, Debug)]
pub struct FlickrClient {
    http: Client,
    settings: FlickrSettings,
}

impl FlickrClient {
    pub fn new(settings: FlickrSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(FlickrClient { http, settings })
    }

    /// Builds the `flickr.photos.search` request URL. All values are query-escaped.
    pub fn search_url(&self, point: &LocationPoint, page: u32, per_page: u32) -> Result<Url, SearchError> {
        let bbox = BoundingBox::world_clamped(point, self.settings.half_width, self.settings.half_height);
        let safe_search = if self.settings.safe_search { "1" } else { "0" };

        let params = [
            ("method", FLICKR_SEARCH_METHOD.to_string()),
            ("api_key", self.settings.api_key.clone()),
            ("bbox", bbox.to_string()),
            ("lat", point.latitude.to_string()),
            ("lon", point.longitude.to_string()),
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
            ("safe_search", safe_search.to_string()),
            ("extras", FLICKR_MEDIUM_URL_EXTRA.to_string()),
            ("format", FLICKR_RESPONSE_FORMAT.to_string()),
            ("nojsoncallback", "1".to_string()),
        ];

        Url::parse_with_params(&self.settings.base_url, &params)
            .map_err(|e| SearchError::Transport(format!("Invalid search URL: {}", e)))
    }
}

#[async_trait]
impl PhotoSearchRepository for FlickrClient {
    async fn search_photos(
        &self,
        point: &LocationPoint,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ImageReference>, SearchError> {
        let url = self.search_url(point, page, per_page)?;

        let response = self.http
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), page, "Flickr search returned non-success status");
            return Err(SearchError::HttpStatus(status.as_u16()));
        }

        let envelope: SearchEnvelope = response.json().await.map_err(SearchError::from)?;
        let references = envelope.into_references()?;

        tracing::debug!(
            latitude = point.latitude,
            longitude = point.longitude,
            page,
            count = references.len(),
            "Flickr search completed"
        );

        Ok(references)
    }
}

#[async_trait]
impl ImageDataRepository for FlickrClient {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(url)
            .map_err(|e| FetchError::Transport(format!("Invalid image URL '{}': {}", url, e)))?;

        let response = self.http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(FetchError::from)?;
        Ok(bytes.to_vec())
    }
}

/// Top level of a `flickr.photos.search` JSON reply.
#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    stat: Option<String>,
    code: Option<i64>,
    message: Option<String>,
    photos: Option<PhotosPage>,
}

#[derive(Debug, Deserialize)]
struct PhotosPage {
    pages: Option<u32>,
    photo: Option<Vec<PhotoItem>>,
}

#[derive(Debug, Deserialize)]
struct PhotoItem {
    url_m: Option<String>,
}

impl SearchEnvelope {
    pub fn into_references(self) -> Result<Vec<ImageReference>, SearchError> {
        let stat = self.stat
            .ok_or_else(|| SearchError::MalformedResponse("missing 'stat' field".to_string()))?;

        if stat != FLICKR_OK_STATUS {
            return Err(SearchError::ApiRejected {
                code: self.code,
                message: self.message.unwrap_or_else(|| format!("stat was '{}'", stat)),
            });
        }

        let photos = self.photos
            .ok_or_else(|| SearchError::MalformedResponse("missing 'photos' field".to_string()))?;

        let items = photos.photo
            .ok_or_else(|| SearchError::MalformedResponse("missing 'photos.photo' field".to_string()))?;

        if let Some(pages) = photos.pages {
            tracing::trace!(pages, "Flickr reported page count");
        }

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                item.url_m.map(ImageReference::new).ok_or_else(|| {
                    SearchError::MalformedResponse(format!("photo {} has no '{}' field", index, FLICKR_MEDIUM_URL_EXTRA))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn decode(body: &str) -> Result<Vec<ImageReference>, SearchError> {
        serde_json::from_str::<SearchEnvelope>(body)
            .expect("valid json")
            .into_references()
    }

    fn client() -> FlickrClient {
        FlickrClient::new(FlickrSettings {
            api_key: "key with spaces&symbols".to_string(),
            base_url: "https://api.flickr.com/services/rest".to_string(),
            half_width: 1.0,
            half_height: 1.0,
            safe_search: true,
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    #[test]
    fn decodes_medium_urls_in_order() {
        let refs = decode(r#"{"stat":"ok","photos":{"page":1,"pages":3,"photo":[
            {"id":"1","url_m":"https://live.staticflickr.com/1/a_m.jpg"},
            {"id":"2","url_m":"https://live.staticflickr.com/1/b_m.jpg"}]}}"#).unwrap();

        assert_eq!(refs, vec![
            ImageReference::new("https://live.staticflickr.com/1/a_m.jpg"),
            ImageReference::new("https://live.staticflickr.com/1/b_m.jpg"),
        ]);
    }

    #[test]
    fn empty_page_is_not_an_error() {
        assert_eq!(decode(r#"{"stat":"ok","photos":{"photo":[]}}"#).unwrap(), vec![]);
    }

    #[test]
    fn rejected_status_carries_flickr_message() {
        let err = decode(r#"{"stat":"fail","code":100,"message":"Invalid API Key (Key has invalid format)"}"#)
            .unwrap_err();

        assert_eq!(err, SearchError::ApiRejected {
            code: Some(100),
            message: "Invalid API Key (Key has invalid format)".to_string(),
        });
    }

    #[test]
    fn missing_keys_are_malformed() {
        assert!(matches!(decode(r#"{"photos":{"photo":[]}}"#), Err(SearchError::MalformedResponse(_))));
        assert!(matches!(decode(r#"{"stat":"ok"}"#), Err(SearchError::MalformedResponse(_))));
        assert!(matches!(decode(r#"{"stat":"ok","photos":{}}"#), Err(SearchError::MalformedResponse(_))));

        let err = decode(r#"{"stat":"ok","photos":{"photo":[{"url_m":"https://a"},{"id":"9"}]}}"#).unwrap_err();
        assert_eq!(err, SearchError::MalformedResponse("photo 1 has no 'url_m' field".to_string()));
    }

    #[test]
    fn search_url_carries_every_parameter() {
        let url = client().search_url(&LocationPoint::new(10.5, 20.25), 3, 21).unwrap();
        let query: std::collections::HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("api.flickr.com"));
        assert_eq!(url.path(), "/services/rest");
        assert_eq!(query["method"], "flickr.photos.search");
        assert_eq!(query["api_key"], "key with spaces&symbols");
        assert_eq!(query["bbox"], "19.25,9.5,21.25,11.5");
        assert_eq!(query["lat"], "10.5");
        assert_eq!(query["lon"], "20.25");
        assert_eq!(query["per_page"], "21");
        assert_eq!(query["page"], "3");
        assert_eq!(query["safe_search"], "1");
        assert_eq!(query["extras"], "url_m");
        assert_eq!(query["format"], "json");
        assert_eq!(query["nojsoncallback"], "1");
        assert_eq!(query.len(), 11);
        assert!(!url.as_str().contains("key with spaces"));
    }
}
