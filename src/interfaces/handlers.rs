pub mod album;
pub mod home;
pub mod locations;
pub mod photos;
pub mod system;
