pub mod entities;
pub mod geo;
pub mod use_cases;
