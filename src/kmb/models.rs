//! Typed views over KMB API payloads
//!
//! The cache stores the upstream `data` payload untouched; these structs are
//! decoded from it on the way out. Each record requires its identifying
//! field (`stop` or `route`); every other field defaults, so additions or
//! omissions upstream do not break decoding.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TransitError;
use crate::eta_display::{format_eta, EtaDisplay};
use crate::geo::Coordinate;

/// A bus stop from `/stop`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub name_tc: String,
    #[serde(default)]
    pub name_sc: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub lat: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub long: String,
}

impl Stop {
    /// Parsed coordinate, if both fields are numeric.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let lat = self.lat.trim().parse().ok()?;
        let lon = self.long.trim().parse().ok()?;
        Some(Coordinate::new(lat, lon))
    }
}

/// Route origin and destination from `/route/{route}/{direction}/{serviceType}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route: String,
    #[serde(default)]
    pub bound: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub service_type: String,
    #[serde(default)]
    pub orig_en: String,
    #[serde(default)]
    pub orig_tc: String,
    #[serde(default)]
    pub orig_sc: String,
    #[serde(default)]
    pub dest_en: String,
    #[serde(default)]
    pub dest_tc: String,
    #[serde(default)]
    pub dest_sc: String,
}

/// One stop along a route, from `/route-stop`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub bound: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub service_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub seq: String,
    pub stop: String,
}

/// One arrival estimate, from `/route-eta` or `/stop-eta`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eta {
    #[serde(default)]
    pub co: String,
    pub route: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub service_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub seq: String,
    #[serde(default)]
    pub dest_en: String,
    #[serde(default)]
    pub dest_tc: String,
    #[serde(default)]
    pub dest_sc: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub eta_seq: String,
    /// RFC 3339 arrival time, absent when no bus is scheduled
    pub eta: Option<String>,
    #[serde(default)]
    pub rmk_en: String,
    #[serde(default)]
    pub rmk_tc: String,
    #[serde(default)]
    pub rmk_sc: String,
    pub data_timestamp: Option<String>,
}

impl Eta {
    /// Display bucket for this estimate relative to `now`.
    pub fn display(&self, now: DateTime<Utc>) -> EtaDisplay {
        format_eta(self.eta.as_deref(), now)
    }
}

/// Travel direction as spelled in KMB URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = TransitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outbound" => Ok(Direction::Outbound),
            "inbound" => Ok(Direction::Inbound),
            other => Err(TransitError::InvalidParameter(format!(
                "direction must be \"outbound\" or \"inbound\", got {other:?}"
            ))),
        }
    }
}

/// Accepts `"1"`, `1` or `null` and yields a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stop_decodes_string_coordinates() {
        let stop: Stop = serde_json::from_value(json!({
            "stop": "18492910339410B1",
            "name_en": "CHUK YUEN ESTATE BUS TERMINUS",
            "name_tc": "竹園邨總站",
            "name_sc": "竹园邨总站",
            "lat": "22.345415",
            "long": "114.192640"
        }))
        .unwrap();

        let coordinate = stop.coordinate().unwrap();
        assert!((coordinate.lat - 22.345415).abs() < 1e-9);
        assert_eq!(stop.name_tc, "竹園邨總站");
    }

    #[test]
    fn test_numeric_fields_accept_numbers() {
        let route_stop: RouteStop = serde_json::from_value(json!({
            "route": "1A", "bound": "O", "service_type": 1, "seq": 3, "stop": "ABC"
        }))
        .unwrap();
        assert_eq!(route_stop.service_type, "1");
        assert_eq!(route_stop.seq, "3");
    }

    #[test]
    fn test_eta_null_time() {
        let eta: Eta = serde_json::from_value(json!({
            "co": "KMB", "route": "1A", "dir": "O", "service_type": 1,
            "seq": 1, "eta_seq": 1, "eta": null, "rmk_en": "Final Bus Departed"
        }))
        .unwrap();
        assert!(eta.eta.is_none());
        assert_eq!(eta.display(Utc::now()), EtaDisplay::Unavailable);
    }

    #[test]
    fn test_records_require_identifier() {
        let stop = json!({"stop": "ABC", "name_en": "SOME STOP", "lat": "22.3", "long": "114.1"});

        assert!(serde_json::from_value::<Eta>(stop.clone()).is_err());
        assert!(serde_json::from_value::<Route>(stop.clone()).is_err());
        assert!(serde_json::from_value::<Stop>(json!({"route": "1A"})).is_err());
        assert!(serde_json::from_value::<RouteStop>(json!({"route": "1A", "seq": 1})).is_err());
        assert_eq!(serde_json::from_value::<Stop>(stop).unwrap().stop, "ABC");
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("outbound".parse::<Direction>().unwrap(), Direction::Outbound);
        assert_eq!("inbound".parse::<Direction>().unwrap().to_string(), "inbound");
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(TransitError::InvalidParameter(_))
        ));
        assert!("Outbound".parse::<Direction>().is_err());
    }
}
