//! Cache keys for KMB queries. Identical parameters always give the same key.

/// Key of the stops slot; the class holds only this one entry.
pub const ALL_STOPS: &str = "all-stops";

/// Key of the full route-stop listing.
pub const ALL_ROUTE_STOPS: &str = "all-route-stops";

pub fn route_info(route: &str, direction: &str, service_type: u32) -> String {
    format!("{route}-{direction}-{service_type}")
}

pub fn route_eta(route: &str, service_type: u32) -> String {
    format!("{route}-{service_type}")
}

pub fn route_stops(route: &str, direction: &str, service_type: u32) -> String {
    format!("{route}-{direction}-{service_type}-stops")
}

pub fn stop_eta(stop_id: &str) -> String {
    stop_id.to_string()
}
