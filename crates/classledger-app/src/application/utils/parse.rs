use chrono::{DateTime, Utc};
use std::str::FromStr;

use classledger_domain::shared::DomainError;

/// Parse an RFC 3339 timestamp from caller input.
pub fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Validation(format!("Invalid {}: {} ({})", field, value, e)))
}

/// Parse a wire enum from caller input.
///
/// Domain `FromStr` impls report unknown stored values as data-integrity
/// problems; coming from a caller the same failure is a validation error.
pub fn parse_enum<T>(value: &str, field: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = DomainError>,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|_| DomainError::Validation(format!("Invalid {}: {}", field, value)))
}
