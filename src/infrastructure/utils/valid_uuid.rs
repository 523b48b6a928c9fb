use uuid::Uuid;

use crate::errors::AppError;

/// Parses a path segment as a UUID, naming the offending segment on failure.
pub fn valid_uuid(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidInput(format!("Invalid {} id: '{}'", what, raw)))
}
