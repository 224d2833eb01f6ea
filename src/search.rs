//! Short-code search over the fleet snapshot.
//!
//! Two matching rules live here and must stay distinct:
//! - list display uses a case-insensitive *substring* match ([`filter_fleet`])
//! - search submission uses case-insensitive *equality* ([`find_exact`])

use crate::jeepney_models::{codes_equal, Route, Vehicle, VehicleStatus};
use serde::Serialize;

/// Vehicles and routes that pass the same short-code predicate.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredFleet<'a> {
    pub vehicles: Vec<&'a Vehicle>,
    pub routes: Vec<&'a Route>,
}

impl FilteredFleet<'_> {
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.routes.is_empty()
    }
}

/// True when `query` is empty or occurs in `code`, ignoring case.
pub fn matches_code(code: &str, query: &str) -> bool {
    query.is_empty() || code.to_lowercase().contains(&query.to_lowercase())
}

pub fn filter_fleet<'a>(vehicles: &'a [Vehicle], routes: &'a [Route], query: &str) -> FilteredFleet<'a> {
    if query.is_empty() {
        return FilteredFleet {
            vehicles: vehicles.iter().collect(),
            routes: routes.iter().collect(),
        };
    }

    FilteredFleet {
        vehicles: vehicles.iter().filter(|v| matches_code(&v.short_code, query)).collect(),
        routes: routes.iter().filter(|r| matches_code(&r.short_code, query)).collect(),
    }
}

/// First vehicle whose short code equals `query`, ignoring case.
pub fn find_exact<'a>(vehicles: &'a [Vehicle], query: &str) -> Option<&'a Vehicle> {
    vehicles.iter().find(|v| codes_equal(&v.short_code, query))
}

/// Admin listing filter; `None` means "all".
pub fn filter_by_status<'a, I>(vehicles: I, status: Option<VehicleStatus>) -> Vec<&'a Vehicle>
where
    I: IntoIterator<Item = &'a Vehicle>,
{
    vehicles
        .into_iter()
        .filter(|v| status.is_none_or(|s| v.status == s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jeepney_models::{JeepneyModels, LatLng, RouteStatus};

    fn vehicle(id: &str, code: &str, available: u32) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            position: LatLng::new(10.31, 123.89),
            plate_number: format!("PLT-{id}"),
            short_code: code.to_string(),
            route_name: "Lahug → Carbon".to_string(),
            available_seats: available,
            total_seats: 16,
            status: VehicleStatus::Active,
        }
    }

    fn route(id: &str, code: &str) -> Route {
        Route {
            id: id.to_string(),
            name: format!("Route {code}"),
            short_code: code.to_string(),
            color: "#e11d48".to_string(),
            path: vec![LatLng::new(10.33, 123.89), LatLng::new(10.29, 123.90)],
            start_point: String::new(),
            end_point: String::new(),
            status: RouteStatus::Active,
        }
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let snapshot = JeepneyModels::sample_snapshot();
        let filtered = filter_fleet(&snapshot.vehicles, &snapshot.routes, "");

        let ids: Vec<&str> = filtered.vehicles.iter().map(|v| v.id.as_str()).collect();
        let expected: Vec<&str> = snapshot.vehicles.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, expected);
        assert_eq!(filtered.routes.len(), snapshot.routes.len());
        assert!(filtered.routes.iter().zip(&snapshot.routes).all(|(a, b)| *a == b));
    }

    #[test]
    fn mixed_case_query_matches_both_vehicles_and_route() {
        let vehicles = vec![vehicle("a", "04B", 12), vehicle("b", "04B", 8), vehicle("c", "12L", 3)];
        let routes = vec![route("r1", "04B"), route("r2", "12L")];

        let filtered = filter_fleet(&vehicles, &routes, "04b");

        let seats: Vec<u32> = filtered.vehicles.iter().map(|v| v.available_seats).collect();
        assert_eq!(seats, vec![12, 8]);
        assert_eq!(filtered.routes.len(), 1);
        assert_eq!(filtered.routes[0].id, "r1");
    }

    #[test]
    fn substring_filter_is_sound_and_complete() {
        let snapshot = JeepneyModels::sample_snapshot();
        for query in ["b", "B", "4", "2L", "zzz", "0", " "] {
            let filtered = filter_fleet(&snapshot.vehicles, &snapshot.routes, query);
            let needle = query.to_lowercase();

            for v in &snapshot.vehicles {
                let shown = filtered.vehicles.iter().any(|f| f.id == v.id);
                assert_eq!(shown, v.short_code.to_lowercase().contains(&needle), "query {query:?}");
            }
            for r in &snapshot.routes {
                let shown = filtered.routes.iter().any(|f| f.id == r.id);
                assert_eq!(shown, r.short_code.to_lowercase().contains(&needle), "query {query:?}");
            }
        }
    }

    #[test]
    fn unmatched_query_yields_empty_lists() {
        let snapshot = JeepneyModels::sample_snapshot();
        let filtered = filter_fleet(&snapshot.vehicles, &snapshot.routes, "zzz");
        assert!(filtered.is_empty());
        assert_eq!(snapshot.vehicles.len(), 7);
    }

    #[test]
    fn exact_lookup_requires_equality() {
        let vehicles = vec![vehicle("a", "04BX", 1), vehicle("b", "04B", 2), vehicle("c", "04b", 3)];

        assert_eq!(find_exact(&vehicles, "04b").map(|v| v.id.as_str()), Some("b"));
        assert_eq!(find_exact(&vehicles, "04B").map(|v| v.id.as_str()), Some("b"));
        assert!(find_exact(&vehicles, "04").is_none());
        assert!(find_exact(&vehicles, "").is_none());
    }

    #[test]
    fn status_filter_keeps_order() {
        let snapshot = JeepneyModels::sample_snapshot();

        let all = filter_by_status(&snapshot.vehicles, None);
        assert_eq!(all.len(), snapshot.vehicles.len());

        let maintenance = filter_by_status(&snapshot.vehicles, Some(VehicleStatus::Maintenance));
        assert_eq!(maintenance.len(), 1);
        assert_eq!(maintenance[0].plate_number, "MNO-2345");
    }
}
