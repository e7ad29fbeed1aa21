//! Tradability filtering for market snapshots.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::types::MarketSnapshot;

/// Decide whether a market can currently be traded.
///
/// A market is tradable iff none of its status flags rule it out and its
/// expiry (when present and parsable) lies strictly in the future. Missing
/// flags and unparsable expiries count as tradable: a false negative costs
/// an opportunity, a false positive only a failed order.
pub fn is_tradable(snapshot: &MarketSnapshot, now: DateTime<Utc>) -> bool {
    if snapshot.active == Some(false) {
        return false;
    }
    if snapshot.closed == Some(true) {
        return false;
    }
    if snapshot.archived == Some(true) {
        return false;
    }
    if snapshot.accepting_orders == Some(false) {
        return false;
    }

    match snapshot.end_date.as_deref().and_then(parse_expiry) {
        Some(end) => end > now,
        None => true,
    }
}

/// Parse an upstream expiry timestamp.
///
/// Timezone-naive values are treated as UTC. Returns `None` for anything
/// unparsable.
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    None
}
