use crate::domain::preference::{Preference, Tier};
use crate::utils::error::{AllocError, Result};

/// Form field carrying the number of bikes an association asks for.
pub const QUOTA_FIELD: &str = "number_of_needed_bikes";

/// Turns raw submitted fields into a validated [`Preference`].
///
/// Every field other than [`QUOTA_FIELD`] is a bike id mapped to a tier between
/// 0 and 3. A single bad value rejects the whole submission. A blank quota is
/// treated as absent, which later resolves to the number of bikes of the period.
pub fn normalize_preferences<I, K, V>(fields: I) -> Result<Preference>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut preference = Preference::default();
    let mut quota_seen = false;

    for (key, value) in fields {
        let (key, value) = (key.as_ref(), value.as_ref().trim());

        if key == QUOTA_FIELD {
            if quota_seen {
                return Err(invalid(key, value, "submitted more than once"));
            }
            quota_seen = true;
            preference.requested_quota = parse_quota(value)?;
            continue;
        }

        if key.trim().is_empty() {
            return Err(invalid(key, value, "bike id cannot be empty"));
        }
        let tier = parse_tier(key, value)?;
        if preference.tiers.insert(key.to_string(), tier).is_some() {
            return Err(invalid(key, value, "submitted more than once"));
        }
    }

    Ok(preference)
}

fn parse_tier(key: &str, value: &str) -> Result<Tier> {
    let number: i64 = value
        .parse()
        .map_err(|_| invalid(key, value, "not an integer"))?;
    u8::try_from(number)
        .ok()
        .and_then(|n| Tier::try_from(n).ok())
        .ok_or_else(|| invalid(key, value, "tier must be between 0 and 3"))
}

fn parse_quota(value: &str) -> Result<Option<usize>> {
    if value.is_empty() {
        return Ok(None);
    }
    let number: i64 = value
        .parse()
        .map_err(|_| invalid(QUOTA_FIELD, value, "not an integer"))?;
    usize::try_from(number)
        .map(Some)
        .map_err(|_| invalid(QUOTA_FIELD, value, "cannot be negative"))
}

fn invalid(field: &str, value: &str, reason: &str) -> AllocError {
    AllocError::InvalidPreference {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
