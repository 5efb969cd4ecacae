use std::time::Duration;

use crate::error::VerifyError;
use crate::utils::query::FieldMap;

pub const AUTH_DATE_FIELD: &str = "auth_date";

/// Default maximum payload age when configuration does not override it.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Reads `auth_date` and rejects payloads older than `max_age` at `now`.
/// Returns the issuance timestamp on success.
pub fn check_freshness(fields: &FieldMap, now: i64, max_age: Duration) -> Result<i64, VerifyError> {
    let auth_date = fields
        .get(AUTH_DATE_FIELD)
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or(VerifyError::MissingTimestamp)?;

    let max_age = max_age.as_secs();
    let age = now.saturating_sub(auth_date);
    if age > 0 && age as u64 > max_age {
        return Err(VerifyError::Expired { age, max_age });
    }

    Ok(auth_date)
}
