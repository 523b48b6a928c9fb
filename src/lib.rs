mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;

pub use domain::{entities, geo, use_cases};
pub use interfaces::{handlers, repositories, routes};
pub use infrastructure::{db, flickr, utils};

use flickr::client::FlickrClient;
use repositories::sqlx_repo::{SqlxLocationRepo, SqlxPhotoRepo};
use settings::{AppConfig, FlickrSettings};
use use_cases::{locations::LocationHandler, photo_set::PhotoSetHandler};

pub struct AppState {
    pub location_handler: AppLocationHandler,
    pub photo_set_handler: AppPhotoSetHandler,
}

pub type AppLocationHandler = LocationHandler<SqlxLocationRepo>;
pub type AppPhotoSetHandler = PhotoSetHandler<SqlxLocationRepo, SqlxPhotoRepo, FlickrClient, FlickrClient>;

impl AppState {
    pub fn new(config: &AppConfig, pool: sqlx::SqlitePool) -> anyhow::Result<Self> {
        let flickr = FlickrClient::new(FlickrSettings::from(config))?;

        let location_handler = LocationHandler::new(SqlxLocationRepo::new(pool.clone()));
        let photo_set_handler = PhotoSetHandler::new(
            SqlxLocationRepo::new(pool.clone()),
            SqlxPhotoRepo::new(pool),
            flickr.clone(),
            flickr,
        )
        .with_page_size(config.photos_per_page)
        .with_prefetch_concurrency(config.prefetch_concurrency);

        Ok(AppState {
            location_handler,
            photo_set_handler,
        })
    }
}
