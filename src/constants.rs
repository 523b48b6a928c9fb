use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

pub const DEFAULT_PHOTOS_PER_PAGE: u32 = 21;
pub const FLICKR_MAX_PER_PAGE: u32 = 500;

pub const FLICKR_SEARCH_METHOD: &str = "flickr.photos.search";
pub const FLICKR_MEDIUM_URL_EXTRA: &str = "url_m";
pub const FLICKR_RESPONSE_FORMAT: &str = "json";
pub const FLICKR_OK_STATUS: &str = "ok";
