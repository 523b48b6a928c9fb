pub mod locations;
pub mod photo_set;
