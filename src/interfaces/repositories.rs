pub mod image_data;
pub mod location;
pub mod photo;
pub mod photo_search;
pub mod sqlx_repo;
