//! Expiry checks over access tokens. Pure functions of the token string and a
//! clock reading; nothing here touches storage or the network.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::util::jwt_expiration_time;

/// Default window used at startup: a token expiring within a minute is treated as expired.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Expiry claim of `token`, or `None` when it cannot be decoded.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let seconds = jwt_expiration_time(token)?;
    Utc.timestamp_opt(seconds, 0).single()
}

/// Returns `true` when `now + skew >= exp`, or when the token cannot be decoded.
pub fn is_token_expired(token: &str, skew: Duration) -> bool {
    is_token_expired_at(token, skew, Utc::now())
}

pub fn is_token_expired_at(token: &str, skew: Duration, now: DateTime<Utc>) -> bool {
    let Some(expiry) = token_expiry(token) else {
        return true;
    };
    let Ok(skew) = chrono::Duration::from_std(skew) else {
        return true;
    };
    match now.checked_add_signed(skew) {
        Some(threshold) => threshold >= expiry,
        None => true,
    }
}

/// Time left before the token expires; zero once it has.
pub fn remaining_validity(token: &str) -> Option<Duration> {
    remaining_validity_at(token, Utc::now())
}

pub fn remaining_validity_at(token: &str, now: DateTime<Utc>) -> Option<Duration> {
    let expiry = token_expiry(token)?;
    Some((expiry - now).to_std().unwrap_or(Duration::ZERO))
}

/// Delay after which a proactive refresh should fire.
///
/// The delay is `remaining - margin` where the margin is `safety_margin`
/// capped at half of the remaining validity, so short-lived tokens still get
/// a positive delay that lands strictly before expiry. Returns `None` for
/// undecodable or already expired tokens.
pub fn optimal_refresh_time(token: &str, safety_margin: Duration) -> Option<Duration> {
    optimal_refresh_time_at(token, safety_margin, Utc::now())
}

pub fn optimal_refresh_time_at(
    token: &str,
    safety_margin: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let remaining = remaining_validity_at(token, now)?;
    if remaining.is_zero() {
        return None;
    }
    let margin = safety_margin.min(remaining / 2);
    Some(remaining.saturating_sub(margin))
}
