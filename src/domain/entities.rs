pub mod album;
pub mod location;
pub mod photo;
