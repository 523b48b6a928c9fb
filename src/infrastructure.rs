pub mod db;
pub mod flickr;
pub mod utils;
