// Fleet data model and snapshot loading for the Cebu Jeepney Tracker
//
// Data sources:
// - Built-in sample fleet (Cebu City routes), used when no data directory is configured
// - CSV directory with three files:
//     vehicles.csv     id,plate_number,short_code,route_name,lat,lng,available_seats,total_seats,status
//     routes.csv       id,name,short_code,color,start_point,end_point,status
//     route_paths.csv  route_id,sequence,lat,lng
//
// Vehicles and routes are related only by their short code (case-insensitive).

use crate::error::{Result, TrackerError};
use chrono::{TimeZone, Utc};
use chrono_tz::Asia::Manila;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    #[default]
    Active,
    Inactive,
    Maintenance,
}

impl VehicleStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(VehicleStatus::Active),
            "inactive" => Some(VehicleStatus::Inactive),
            "maintenance" => Some(VehicleStatus::Maintenance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    #[default]
    Active,
    Inactive,
}

/// Map legend bucket for free seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatAvailability {
    /// 5 or more seats free
    Available,
    /// 1 to 4 seats free
    Limited,
    Full,
}

/// Share of free seats, as shown on the vehicle detail card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyBand {
    High,
    Medium,
    Low,
}

impl OccupancyBand {
    pub fn color(&self) -> &'static str {
        match self {
            OccupancyBand::High => "green",
            OccupancyBand::Medium => "yellow",
            OccupancyBand::Low => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub position: LatLng,
    pub plate_number: String,
    pub short_code: String,
    pub route_name: String,
    pub available_seats: u32,
    pub total_seats: u32,
    #[serde(default)]
    pub status: VehicleStatus,
}

impl Vehicle {
    pub fn seat_availability(&self) -> SeatAvailability {
        match self.available_seats {
            0 => SeatAvailability::Full,
            1..=4 => SeatAvailability::Limited,
            _ => SeatAvailability::Available,
        }
    }

    /// Free seats as a percentage of capacity. Zero-capacity records read as 0.
    pub fn seat_percentage(&self) -> f64 {
        if self.total_seats == 0 {
            return 0.0;
        }
        self.available_seats as f64 / self.total_seats as f64 * 100.0
    }

    pub fn occupancy_band(&self) -> OccupancyBand {
        let percentage = self.seat_percentage();
        if percentage > 50.0 {
            OccupancyBand::High
        } else if percentage > 25.0 {
            OccupancyBand::Medium
        } else {
            OccupancyBand::Low
        }
    }

    pub fn serves(&self, route: &Route) -> bool {
        codes_equal(&self.short_code, &route.short_code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub short_code: String,
    pub color: String,
    pub path: Vec<LatLng>,
    #[serde(default)]
    pub start_point: String,
    #[serde(default)]
    pub end_point: String,
    #[serde(default)]
    pub status: RouteStatus,
}

impl Route {
    /// A polyline needs at least two points to be drawn.
    pub fn is_visible(&self) -> bool {
        self.path.len() >= 2
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub routes: Vec<Route>,
    pub source: String,
    pub loaded_at: i64,
}

impl FleetSnapshot {
    pub fn new(vehicles: Vec<Vehicle>, routes: Vec<Route>, source: impl Into<String>) -> Self {
        FleetSnapshot {
            vehicles,
            routes,
            source: source.into(),
            loaded_at: JeepneyModels::get_current_timestamp(),
        }
    }

    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn route_by_code(&self, code: &str) -> Option<&Route> {
        self.routes.iter().find(|r| codes_equal(&r.short_code, code))
    }

    pub fn vehicles_on(&self, route: &Route) -> Vec<&Vehicle> {
        self.vehicles.iter().filter(|v| v.serves(route)).collect()
    }

    /// Vehicle short codes that no route carries, in first-seen order.
    pub fn orphaned_codes(&self) -> Vec<String> {
        let route_codes: HashSet<String> = self
            .routes
            .iter()
            .map(|r| r.short_code.to_lowercase())
            .collect();

        let mut seen = HashSet::new();
        self.vehicles
            .iter()
            .filter(|v| !route_codes.contains(&v.short_code.to_lowercase()))
            .filter(|v| seen.insert(v.short_code.to_lowercase()))
            .map(|v| v.short_code.clone())
            .collect()
    }
}

pub(crate) fn codes_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub route_id: String,
    pub name: String,
    pub short_code: String,
    pub color: String,
    pub start_point: String,
    pub end_point: String,
    pub status: RouteStatus,
    pub active_vehicles: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub inactive: usize,
    pub maintenance: usize,
}

impl StatusCounts {
    pub fn of(vehicles: &[Vehicle]) -> Self {
        let mut counts = StatusCounts::default();
        for vehicle in vehicles {
            match vehicle.status {
                VehicleStatus::Active => counts.active += 1,
                VehicleStatus::Inactive => counts.inactive += 1,
                VehicleStatus::Maintenance => counts.maintenance += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetStats {
    pub total_routes: usize,
    pub routes_in_service: usize,
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    pub vehicles_by_status: StatusCounts,
    pub routes: Vec<RouteSummary>,
    pub orphaned_codes: Vec<String>,
    pub source: String,
    pub loaded_at: String,
}

// ============================================================================
// CSV Records
// ============================================================================

#[derive(Debug, Deserialize)]
struct VehicleRow {
    id: String,
    plate_number: String,
    short_code: String,
    route_name: String,
    lat: f64,
    lng: f64,
    available_seats: u32,
    total_seats: u32,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    id: String,
    name: String,
    short_code: String,
    color: String,
    start_point: Option<String>,
    end_point: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoutePathRow {
    route_id: String,
    sequence: u32,
    lat: f64,
    lng: f64,
}

// ============================================================================
// Main Implementation
// ============================================================================

pub struct JeepneyModels;

impl JeepneyModels {
    pub const SAMPLE_SOURCE: &'static str = "built-in sample";

    /// Loads the fleet from `data_dir` when given, otherwise the built-in sample.
    pub fn initialize_snapshot(data_dir: Option<&Path>) -> Result<FleetSnapshot> {
        match data_dir {
            Some(dir) => {
                info!("📂 Loading fleet data from {}", dir.display());
                Self::load_snapshot_dir(dir)
            }
            None => {
                info!("📦 No data directory configured, using built-in sample fleet");
                Ok(Self::sample_snapshot())
            }
        }
    }

    pub fn load_snapshot_dir(dir: &Path) -> Result<FleetSnapshot> {
        let vehicles = Self::parse_vehicles(&dir.join("vehicles.csv"))?;
        let mut routes = Self::parse_routes(&dir.join("routes.csv"))?;
        let mut paths = Self::parse_route_paths(&dir.join("route_paths.csv"))?;

        let known_routes: HashSet<&str> = routes.iter().map(|r| r.id.as_str()).collect();
        for route_id in paths.keys() {
            if !known_routes.contains(route_id.as_str()) {
                warn!("⚠️  route_paths.csv references unknown route '{}', ignoring", route_id);
            }
        }

        for route in &mut routes {
            if let Some(points) = paths.remove(&route.id) {
                route.path = points;
            }
            if !route.is_visible() {
                warn!("⚠️  Route {} ({}) has fewer than 2 path points and will not be drawn",
                      route.short_code, route.name);
            }
        }

        let snapshot = FleetSnapshot::new(vehicles, routes, dir.display().to_string());
        Self::validate(&snapshot)?;

        info!("✓ Fleet loaded: {} vehicles, {} routes", snapshot.vehicles.len(), snapshot.routes.len());
        Ok(snapshot)
    }

    /// Rejects duplicate ids and impossible seat counts. Orphaned short codes are only reported.
    pub fn validate(snapshot: &FleetSnapshot) -> Result<()> {
        let mut vehicle_ids = HashSet::new();
        for vehicle in &snapshot.vehicles {
            if !vehicle_ids.insert(vehicle.id.as_str()) {
                return Err(TrackerError::InvalidRecord(format!("duplicate vehicle id '{}'", vehicle.id)));
            }
            if vehicle.total_seats == 0 {
                return Err(TrackerError::InvalidRecord(format!(
                    "vehicle '{}' has zero total seats", vehicle.id
                )));
            }
            if vehicle.available_seats > vehicle.total_seats {
                return Err(TrackerError::InvalidRecord(format!(
                    "vehicle '{}' has {} available seats but only {} total",
                    vehicle.id, vehicle.available_seats, vehicle.total_seats
                )));
            }
        }

        let mut route_ids = HashSet::new();
        for route in &snapshot.routes {
            if !route_ids.insert(route.id.as_str()) {
                return Err(TrackerError::InvalidRecord(format!("duplicate route id '{}'", route.id)));
            }
        }

        for code in snapshot.orphaned_codes() {
            warn!("⚠️  Vehicle short code '{}' does not match any route", code);
        }

        Ok(())
    }

    fn parse_vehicles(path: &Path) -> Result<Vec<Vehicle>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut vehicles = Vec::new();

        for row in reader.deserialize::<VehicleRow>() {
            let row = row?;
            let status = match row.status.as_deref().map(str::trim) {
                None | Some("") => VehicleStatus::default(),
                Some(raw) => VehicleStatus::parse(raw).ok_or_else(|| {
                    TrackerError::InvalidRecord(format!("vehicle '{}' has unknown status '{}'", row.id, raw))
                })?,
            };

            vehicles.push(Vehicle {
                id: row.id,
                position: LatLng::new(row.lat, row.lng),
                plate_number: row.plate_number,
                short_code: row.short_code,
                route_name: row.route_name,
                available_seats: row.available_seats,
                total_seats: row.total_seats,
                status,
            });
        }

        Ok(vehicles)
    }

    fn parse_routes(path: &Path) -> Result<Vec<Route>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut routes = Vec::new();

        for row in reader.deserialize::<RouteRow>() {
            let row = row?;
            let status = match row.status.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
                None => RouteStatus::default(),
                Some(s) if s.is_empty() || s == "active" => RouteStatus::Active,
                Some(s) if s == "inactive" => RouteStatus::Inactive,
                Some(other) => {
                    return Err(TrackerError::InvalidRecord(format!(
                        "route '{}' has unknown status '{}'", row.id, other
                    )));
                }
            };

            routes.push(Route {
                id: row.id,
                name: row.name,
                short_code: row.short_code,
                color: row.color,
                path: Vec::new(),
                start_point: row.start_point.unwrap_or_default(),
                end_point: row.end_point.unwrap_or_default(),
                status,
            });
        }

        Ok(routes)
    }

    fn parse_route_paths(path: &Path) -> Result<HashMap<String, Vec<LatLng>>> {
        if !path.exists() {
            warn!("⚠️  {} not found, routes will have no geometry", path.display());
            return Ok(HashMap::new());
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut by_route: HashMap<String, Vec<(u32, LatLng)>> = HashMap::new();

        for row in reader.deserialize::<RoutePathRow>() {
            let row = row?;
            by_route
                .entry(row.route_id)
                .or_default()
                .push((row.sequence, LatLng::new(row.lat, row.lng)));
        }

        Ok(by_route
            .into_iter()
            .map(|(route_id, mut points)| {
                points.sort_by_key(|(sequence, _)| *sequence);
                (route_id, points.into_iter().map(|(_, p)| p).collect())
            })
            .collect())
    }

    pub fn build_stats(snapshot: &FleetSnapshot) -> FleetStats {
        let routes: Vec<RouteSummary> = snapshot
            .routes
            .iter()
            .map(|route| RouteSummary {
                route_id: route.id.clone(),
                name: route.name.clone(),
                short_code: route.short_code.clone(),
                color: route.color.clone(),
                start_point: route.start_point.clone(),
                end_point: route.end_point.clone(),
                status: route.status,
                active_vehicles: snapshot
                    .vehicles_on(route)
                    .iter()
                    .filter(|v| v.status == VehicleStatus::Active)
                    .count(),
            })
            .collect();

        let vehicles_by_status = StatusCounts::of(&snapshot.vehicles);

        FleetStats {
            total_routes: routes.len(),
            routes_in_service: routes.iter().filter(|r| r.active_vehicles > 0).count(),
            total_vehicles: snapshot.vehicles.len(),
            active_vehicles: vehicles_by_status.active,
            vehicles_by_status,
            routes,
            orphaned_codes: snapshot.orphaned_codes(),
            source: snapshot.source.clone(),
            loaded_at: Self::format_timestamp_full(snapshot.loaded_at),
        }
    }

    pub fn get_snapshot_stats(snapshot: &FleetSnapshot) -> String {
        let stats = Self::build_stats(snapshot);
        let now = Self::get_current_timestamp();

        format!(
            "📊 Fleet Statistics:\n\
             • Source: {}\n\
             • Routes: {} ({} in service)\n\
             • Vehicles: {} ({} active, {} inactive, {} maintenance)\n\
             • Orphaned short codes: {}\n\
             • Snapshot age: {}s | Loaded: {}",
            stats.source,
            stats.total_routes,
            stats.routes_in_service,
            stats.total_vehicles,
            stats.vehicles_by_status.active,
            stats.vehicles_by_status.inactive,
            stats.vehicles_by_status.maintenance,
            stats.orphaned_codes.len(),
            now.saturating_sub(snapshot.loaded_at),
            stats.loaded_at,
        )
    }

    pub fn format_timestamp_full(timestamp: i64) -> String {
        match Utc.timestamp_opt(timestamp, 0).single() {
            Some(dt) => {
                let manila_time = dt.with_timezone(&Manila);
                manila_time.format("%Y-%m-%d %H:%M:%S").to_string()
            }
            None => format!("Invalid timestamp: {}", timestamp),
        }
    }

    pub fn get_current_timestamp() -> i64 {
        Utc::now().timestamp()
    }

    // ========================================================================
    // Built-in sample fleet
    // ========================================================================

    pub fn sample_snapshot() -> FleetSnapshot {
        FleetSnapshot::new(Self::sample_vehicles(), Self::sample_routes(), Self::SAMPLE_SOURCE)
    }

    fn sample_routes() -> Vec<Route> {
        let route = |id: &str, name: &str, code: &str, color: &str, from: &str, to: &str,
                     status: RouteStatus, path: &[(f64, f64)]| Route {
            id: id.to_string(),
            name: name.to_string(),
            short_code: code.to_string(),
            color: color.to_string(),
            path: path.iter().map(|&(lat, lng)| LatLng::new(lat, lng)).collect(),
            start_point: from.to_string(),
            end_point: to.to_string(),
            status,
        };

        vec![
            route("r-04b", "Lahug → Carbon", "04B", "#e11d48", "JY Square", "Carbon Market",
                  RouteStatus::Active,
                  &[(10.3306, 123.8990), (10.3172, 123.8907), (10.2966, 123.9003), (10.2925, 123.9020)]),
            route("r-12l", "Labangon → Ayala", "12L", "#2563eb", "Labangon", "Ayala Center",
                  RouteStatus::Active,
                  &[(10.2995, 123.8833), (10.3099, 123.8932), (10.3181, 123.9050)]),
            route("r-17b", "Apas → Carbon", "17B", "#16a34a", "Apas", "Carbon Market",
                  RouteStatus::Active,
                  &[(10.3380, 123.9060), (10.3308, 123.9060), (10.3099, 123.8932), (10.2925, 123.9020)]),
            route("r-62b", "Pit-os → Carbon", "62B", "#f59e0b", "Pit-os", "Carbon Market",
                  RouteStatus::Active,
                  &[(10.4147, 123.9128), (10.3667, 123.9143), (10.3470, 123.9110), (10.2925, 123.9020)]),
            route("r-01k", "Urgello → Parkmall", "01K", "#7c3aed", "Urgello", "Parkmall",
                  RouteStatus::Inactive,
                  &[(10.2980, 123.8940), (10.3119, 123.9180), (10.3258, 123.9335)]),
        ]
    }

    fn sample_vehicles() -> Vec<Vehicle> {
        let vehicle = |id: &str, plate: &str, code: &str, route: &str, lat: f64, lng: f64,
                       available: u32, total: u32, status: VehicleStatus| Vehicle {
            id: id.to_string(),
            position: LatLng::new(lat, lng),
            plate_number: plate.to_string(),
            short_code: code.to_string(),
            route_name: route.to_string(),
            available_seats: available,
            total_seats: total,
            status,
        };

        vec![
            vehicle("j-001", "ABC-1234", "04B", "Lahug → Carbon", 10.3245, 123.8975, 12, 16, VehicleStatus::Active),
            vehicle("j-002", "XYZ-5678", "04B", "Lahug → Carbon", 10.3010, 123.8990, 8, 16, VehicleStatus::Active),
            vehicle("j-003", "DEF-9012", "12L", "Labangon → Ayala", 10.3120, 123.8960, 3, 18, VehicleStatus::Active),
            vehicle("j-004", "GHI-3456", "17B", "Apas → Carbon", 10.3300, 123.9058, 0, 16, VehicleStatus::Active),
            vehicle("j-005", "JKL-7890", "17B", "Apas → Carbon", 10.3150, 123.8990, 16, 16, VehicleStatus::Inactive),
            vehicle("j-006", "MNO-2345", "62B", "Pit-os → Carbon", 10.3700, 123.9140, 6, 20, VehicleStatus::Maintenance),
            vehicle("j-007", "PQR-6789", "62B", "Pit-os → Carbon", 10.3500, 123.9112, 10, 20, VehicleStatus::Active),
        ]
    }
}
