//! Maps raw ETA timestamps to display buckets and colours.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};

const GREY: &str = "#9E9E9E";
const RED: &str = "#E53935";
const ORANGE: &str = "#FB8C00";
const GREEN: &str = "#43A047";

/// Minutes at or below which an arrival is shown as imminent.
const SOON_MINUTES: i64 = 5;

/// What to show for one arrival estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaDisplay {
    /// No estimate, or one that could not be parsed
    Unavailable,
    /// The estimated time is already past
    Departed,
    /// Less than a minute away
    Arriving,
    /// Whole minutes until arrival
    Minutes(i64),
}

impl EtaDisplay {
    /// Hex colour code for the bucket.
    pub fn color(&self) -> &'static str {
        match self {
            EtaDisplay::Unavailable | EtaDisplay::Departed => GREY,
            EtaDisplay::Arriving => RED,
            EtaDisplay::Minutes(n) if *n <= SOON_MINUTES => ORANGE,
            EtaDisplay::Minutes(_) => GREEN,
        }
    }
}

impl fmt::Display for EtaDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtaDisplay::Unavailable => f.write_str("-"),
            EtaDisplay::Departed => f.write_str("Departed"),
            EtaDisplay::Arriving => f.write_str("Arriving"),
            EtaDisplay::Minutes(1) => f.write_str("1 min"),
            EtaDisplay::Minutes(n) => write!(f, "{n} mins"),
        }
    }
}

/// Buckets an RFC 3339 timestamp such as `2024-03-01T12:05:00+08:00`
/// relative to `now`.
pub fn format_eta(raw: Option<&str>, now: DateTime<Utc>) -> EtaDisplay {
    let Some(eta) = raw.and_then(parse_timestamp) else {
        return EtaDisplay::Unavailable;
    };

    let remaining_ms = eta.with_timezone(&Utc).signed_duration_since(now).num_milliseconds();
    if remaining_ms < 0 {
        EtaDisplay::Departed
    } else if remaining_ms < 60_000 {
        EtaDisplay::Arriving
    } else {
        EtaDisplay::Minutes(remaining_ms / 60_000)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00+08:00")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_unavailable() {
        assert_eq!(format_eta(None, now()), EtaDisplay::Unavailable);
        assert_eq!(format_eta(Some(""), now()), EtaDisplay::Unavailable);
        assert_eq!(format_eta(Some("soon"), now()), EtaDisplay::Unavailable);
        assert_eq!(EtaDisplay::Unavailable.to_string(), "-");
    }

    #[test]
    fn test_departed() {
        let eta = format_eta(Some("2024-03-01T11:59:30+08:00"), now());
        assert_eq!(eta, EtaDisplay::Departed);
        assert_eq!(eta.color(), GREY);
    }

    #[test]
    fn test_arriving() {
        let eta = format_eta(Some("2024-03-01T12:00:45+08:00"), now());
        assert_eq!(eta, EtaDisplay::Arriving);
        assert_eq!(eta.color(), RED);
    }

    #[test]
    fn test_minutes_floor_and_colour() {
        let soon = format_eta(Some("2024-03-01T12:04:59+08:00"), now());
        assert_eq!(soon, EtaDisplay::Minutes(4));
        assert_eq!(soon.color(), ORANGE);
        assert_eq!(soon.to_string(), "4 mins");

        let later = format_eta(Some("2024-03-01T04:12:00Z"), now());
        assert_eq!(later, EtaDisplay::Minutes(12));
        assert_eq!(later.color(), GREEN);

        assert_eq!(EtaDisplay::Minutes(1).to_string(), "1 min");
    }
}
