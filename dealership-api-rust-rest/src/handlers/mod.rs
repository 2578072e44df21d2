pub mod cars;
pub mod contacts;
pub mod health;

use crate::error::{AppError, AppResult};

/// Ids are positive integers; anything else is a client error rather than a
/// lookup miss.
pub(crate) fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation(format!("Invalid ID: '{}'", raw)))
}
