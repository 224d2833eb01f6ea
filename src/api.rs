// HTTP API and embedded web UI for the Cebu Jeepney Tracker
//
// Every JSON response is wrapped in ApiResponse. Shared state sits behind
// Arc<Mutex<..>>; when both are needed, `fleet` is always locked before `views`.

use crate::config::{MapConfig, TrackerConfig};
use crate::driver_console::{ConsoleRegistry, ConsoleView, DriverAction};
use crate::error::{Result, TrackerError};
use crate::jeepney_models::{FleetSnapshot, JeepneyModels, LatLng, Route, Vehicle, VehicleStatus};
use crate::live_map::{VehicleCard, ViewModel, ViewRegistry};
use crate::map_surface::{BrowserSurface, MapFrame, SurfaceFailure, SurfaceReport};
use crate::search::{filter_by_status, filter_fleet};
use crate::selection::ViewAction;
use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// Embed static files at compile time
const INDEX_HTML: &str = include_str!("../static/live_map.html");
const LIVE_MAP_JS: &str = include_str!("../static/live_map.js");

#[derive(Clone)]
pub struct AppState {
    pub fleet: Arc<Mutex<FleetSnapshot>>,
    pub views: Arc<Mutex<ViewRegistry<BrowserSurface>>>,
    pub consoles: Arc<Mutex<ConsoleRegistry>>,
    pub config: Arc<TrackerConfig>,
}

impl AppState {
    pub fn new(snapshot: FleetSnapshot, config: TrackerConfig) -> Self {
        AppState {
            fleet: Arc::new(Mutex::new(snapshot)),
            views: Arc::new(Mutex::new(ViewRegistry::default())),
            consoles: Arc::new(Mutex::new(ConsoleRegistry::default())),
            config: Arc::new(config),
        }
    }

    /// Label of the snapshot being served; empty if the fleet lock is poisoned.
    fn source(&self) -> String {
        self.fleet.lock().map(|fleet| fleet.source.clone()).unwrap_or_default()
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    timestamp: i64,
    source: String,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T, source: &str) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: JeepneyModels::get_current_timestamp(),
            source: source.to_string(),
        }
    }

    fn error(message: String) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: JeepneyModels::get_current_timestamp(),
            source: String::new(),
        }
    }
}

fn lock_failed(what: &str, e: impl std::fmt::Display) -> HttpResponse {
    error!("❌ Failed to lock {}: {}", what, e);
    HttpResponse::InternalServerError()
        .json(ApiResponse::<String>::error(format!("Failed to retrieve {}", what)))
}

fn not_found(message: String) -> HttpResponse {
    warn!("⚠️  {}", message);
    HttpResponse::NotFound().json(ApiResponse::<String>::error(message))
}

fn bad_request(message: String) -> HttpResponse {
    warn!("⚠️  {}", message);
    HttpResponse::BadRequest().json(ApiResponse::<String>::error(message))
}

// ============================================================================
// Request / response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
pub struct VehicleQuery {
    #[serde(default)]
    code: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewActionRequest {
    SearchEdited { text: String },
    SearchSubmitted { text: String },
    MarkerClicked { vehicle_id: String },
    PanelToggled,
}

#[derive(Debug, Deserialize)]
pub struct OpenConsoleRequest {
    vehicle_id: String,
}

#[derive(Serialize)]
struct ViewResponse<'a> {
    view_id: Uuid,
    #[serde(flatten)]
    view: ViewModel<'a>,
    frame: Option<&'a MapFrame>,
}

#[derive(Serialize)]
struct ConsoleResponse {
    console_id: Uuid,
    #[serde(flatten)]
    console: ConsoleView,
}

#[derive(Serialize)]
struct VehicleDetails<'a> {
    vehicle: &'a Vehicle,
    card: VehicleCard,
    route: Option<&'a Route>,
}

#[derive(Serialize)]
struct RouteDetails<'a> {
    route: &'a Route,
    vehicles: Vec<&'a Vehicle>,
}

#[derive(Serialize)]
struct SurfaceMessages {
    missing_api_key: &'static str,
    script_load: &'static str,
    geolocation_denied: &'static str,
    geolocation_unsupported: &'static str,
}

#[derive(Serialize)]
struct MapClientConfig<'a> {
    api_key: Option<&'a str>,
    center: LatLng,
    zoom: u8,
    messages: SurfaceMessages,
}

impl<'a> From<&'a MapConfig> for MapClientConfig<'a> {
    fn from(map: &'a MapConfig) -> Self {
        MapClientConfig {
            api_key: map.api_key.as_deref().filter(|_| map.has_api_key()),
            center: map.center,
            zoom: map.zoom,
            messages: SurfaceMessages {
                missing_api_key: SurfaceFailure::MissingApiKey.message(),
                script_load: SurfaceFailure::ScriptLoad.message(),
                geolocation_denied: SurfaceFailure::GeolocationDenied.message(),
                geolocation_unsupported: SurfaceFailure::GeolocationUnsupported.message(),
            },
        }
    }
}

// ============================================================================
// Frontend Routes
// ============================================================================

async fn serve_index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

async fn serve_js() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(LIVE_MAP_JS)
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "Cebu Jeepney Tracker",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": JeepneyModels::get_current_timestamp(),
        "embedded_frontend": true
    }))
}

// ============================================================================
// Fleet Endpoints
// ============================================================================

async fn get_fleet(state: web::Data<AppState>, query: web::Query<CodeQuery>) -> HttpResponse {
    match state.fleet.lock() {
        Ok(fleet) => {
            let filtered = filter_fleet(&fleet.vehicles, &fleet.routes, &query.code);
            info!("🗺️  Fleet requested (code '{}'): {} vehicles, {} routes",
                  query.code, filtered.vehicles.len(), filtered.routes.len());
            HttpResponse::Ok().json(ApiResponse::success(filtered, &fleet.source))
        }
        Err(e) => lock_failed("fleet", e),
    }
}

async fn get_vehicles(state: web::Data<AppState>, query: web::Query<VehicleQuery>) -> HttpResponse {
    let status = match query.status.as_deref() {
        None | Some("all") | Some("") => None,
        Some(raw) => match VehicleStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return bad_request(format!("Unknown vehicle status '{}'", raw));
            }
        },
    };

    match state.fleet.lock() {
        Ok(fleet) => {
            let filtered = filter_fleet(&fleet.vehicles, &fleet.routes, &query.code);
            let vehicles = filter_by_status(filtered.vehicles, status);
            info!("🚌 Vehicles requested: {} matching", vehicles.len());
            HttpResponse::Ok().json(ApiResponse::success(vehicles, &fleet.source))
        }
        Err(e) => lock_failed("vehicles", e),
    }
}

async fn get_routes(state: web::Data<AppState>, query: web::Query<CodeQuery>) -> HttpResponse {
    match state.fleet.lock() {
        Ok(fleet) => {
            let filtered = filter_fleet(&fleet.vehicles, &fleet.routes, &query.code);
            info!("🛣️  Routes requested: {} matching", filtered.routes.len());
            HttpResponse::Ok().json(ApiResponse::success(filtered.routes, &fleet.source))
        }
        Err(e) => lock_failed("routes", e),
    }
}

async fn get_vehicle_by_id(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let vehicle_id = path.into_inner();

    match state.fleet.lock() {
        Ok(fleet) => match fleet.vehicle(&vehicle_id) {
            Some(vehicle) => {
                info!("🚌 Vehicle retrieved: {} ({})", vehicle.plate_number, vehicle.id);
                HttpResponse::Ok().json(ApiResponse::success(VehicleDetails {
                    vehicle,
                    card: VehicleCard::from(vehicle),
                    route: fleet.route_by_code(&vehicle.short_code),
                }, &fleet.source))
            }
            None => not_found(format!("Vehicle '{}' not found", vehicle_id)),
        },
        Err(e) => lock_failed("vehicle", e),
    }
}

async fn get_route_by_code(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let code = path.into_inner();

    match state.fleet.lock() {
        Ok(fleet) => match fleet.route_by_code(&code) {
            Some(route) => {
                info!("🛣️  Route retrieved: {} ({})", route.short_code, route.name);
                HttpResponse::Ok().json(ApiResponse::success(RouteDetails {
                    route,
                    vehicles: fleet.vehicles_on(route),
                }, &fleet.source))
            }
            None => not_found(format!("Route '{}' not found", code)),
        },
        Err(e) => lock_failed("route", e),
    }
}

async fn get_stats(state: web::Data<AppState>) -> HttpResponse {
    match state.fleet.lock() {
        Ok(fleet) => {
            info!("📊 Stats requested");
            HttpResponse::Ok().json(ApiResponse::success(JeepneyModels::build_stats(&fleet), &fleet.source))
        }
        Err(e) => lock_failed("stats", e),
    }
}

async fn get_map_config(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(MapClientConfig::from(&state.config.map), &state.source()))
}

/// Reloads the snapshot from the configured data directory and redraws every
/// mounted view. Returns `None` when there is no directory to reload from.
pub fn reload_fleet(state: &AppState) -> Result<Option<usize>> {
    let Some(dir) = state.config.fleet.data_dir.as_deref() else {
        return Ok(None);
    };

    let snapshot = JeepneyModels::load_snapshot_dir(dir)?;

    let mut fleet = state
        .fleet
        .lock()
        .map_err(|e| TrackerError::State(format!("Failed to lock fleet: {}", e)))?;
    *fleet = snapshot;

    let mut views = state
        .views
        .lock()
        .map_err(|e| TrackerError::State(format!("Failed to lock views: {}", e)))?;
    views.redraw_all(&fleet);

    Ok(Some(fleet.vehicles.len()))
}

async fn force_refresh(state: web::Data<AppState>) -> HttpResponse {
    info!("🔄 Manual refresh requested...");

    let app_state = state.get_ref().clone();
    match tokio::task::spawn_blocking(move || reload_fleet(&app_state)).await {
        Ok(Ok(Some(count))) => {
            info!("✓ Manual refresh completed: {} vehicles", count);
            HttpResponse::Ok().json(ApiResponse::success("Fleet data refreshed successfully", &state.source()))
        }
        Ok(Ok(None)) => {
            HttpResponse::Ok().json(ApiResponse::success("Built-in sample fleet, nothing to refresh", &state.source()))
        }
        Ok(Err(e)) => {
            warn!("⚠️  Manual refresh failed: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<String>::error(format!("Refresh failed: {}", e)))
        }
        Err(e) => {
            error!("❌ Manual refresh task panicked: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<String>::error("Refresh task panicked".to_string()))
        }
    }
}

// ============================================================================
// Live Map Views
// ============================================================================

fn view_response(view_id: Uuid, fleet: &FleetSnapshot, views: &ViewRegistry<BrowserSurface>) -> HttpResponse {
    match views.get(&view_id) {
        Some(view) => HttpResponse::Ok().json(ApiResponse::success(ViewResponse {
            view_id,
            view: view.view_model(fleet),
            frame: view.surface().frame(),
        }, &fleet.source)),
        None => not_found(format!("View '{}' not found", view_id)),
    }
}

async fn mount_view(state: web::Data<AppState>) -> HttpResponse {
    let fleet = match state.fleet.lock() {
        Ok(fleet) => fleet,
        Err(e) => return lock_failed("fleet", e),
    };
    let mut views = match state.views.lock() {
        Ok(views) => views,
        Err(e) => return lock_failed("views", e),
    };

    let view_id = views.mount(BrowserSurface::new(&state.config.map), &fleet);
    info!("🆕 Live map view mounted: {} ({} open)", view_id, views.len());
    view_response(view_id, &fleet, &views)
}

async fn get_view(state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    let view_id = path.into_inner();
    let fleet = match state.fleet.lock() {
        Ok(fleet) => fleet,
        Err(e) => return lock_failed("fleet", e),
    };
    match state.views.lock() {
        Ok(views) => view_response(view_id, &fleet, &views),
        Err(e) => lock_failed("views", e),
    }
}

async fn unmount_view(state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    let view_id = path.into_inner();
    let source = state.source();
    match state.views.lock() {
        Ok(mut views) => {
            if views.unmount(&view_id) {
                info!("👋 Live map view unmounted: {}", view_id);
                HttpResponse::Ok().json(ApiResponse::success("View unmounted", &source))
            } else {
                not_found(format!("View '{}' not found", view_id))
            }
        }
        Err(e) => lock_failed("views", e),
    }
}

async fn view_action(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ViewActionRequest>,
) -> HttpResponse {
    let view_id = path.into_inner();
    let fleet = match state.fleet.lock() {
        Ok(fleet) => fleet,
        Err(e) => return lock_failed("fleet", e),
    };

    let action = match body.into_inner() {
        ViewActionRequest::SearchEdited { text } => ViewAction::SearchEdited(text),
        ViewActionRequest::SearchSubmitted { text } => ViewAction::SearchSubmitted(text),
        ViewActionRequest::PanelToggled => ViewAction::PanelToggled,
        ViewActionRequest::MarkerClicked { vehicle_id } => match fleet.vehicle(&vehicle_id) {
            Some(vehicle) => ViewAction::MarkerClicked(vehicle.clone()),
            None => return not_found(format!("Vehicle '{}' not found", vehicle_id)),
        },
    };

    let mut views = match state.views.lock() {
        Ok(views) => views,
        Err(e) => return lock_failed("views", e),
    };
    match views.get_mut(&view_id) {
        Some(view) => view.dispatch(&action, &fleet),
        None => return not_found(format!("View '{}' not found", view_id)),
    }

    view_response(view_id, &fleet, &views)
}

async fn report_surface(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SurfaceReport>,
) -> HttpResponse {
    let view_id = path.into_inner();
    let fleet = match state.fleet.lock() {
        Ok(fleet) => fleet,
        Err(e) => return lock_failed("fleet", e),
    };
    let mut views = match state.views.lock() {
        Ok(views) => views,
        Err(e) => return lock_failed("views", e),
    };

    match views.get_mut(&view_id) {
        Some(view) => {
            if let Some(message) = body.error.as_deref() {
                warn!("🗺️  Map surface for view {} reported: {}", view_id, message);
            }
            view.report_surface(&body);
        }
        None => return not_found(format!("View '{}' not found", view_id)),
    }

    view_response(view_id, &fleet, &views)
}

// ============================================================================
// Driver Consoles
// ============================================================================

async fn open_console(state: web::Data<AppState>, body: web::Json<OpenConsoleRequest>) -> HttpResponse {
    let fleet = match state.fleet.lock() {
        Ok(fleet) => fleet,
        Err(e) => return lock_failed("fleet", e),
    };
    let Some(vehicle) = fleet.vehicle(&body.vehicle_id) else {
        return not_found(format!("Vehicle '{}' not found", body.vehicle_id));
    };

    match state.consoles.lock() {
        Ok(mut consoles) => {
            let console_id = consoles.open(vehicle);
            info!("🧑‍✈️ Driver console opened for {} ({})", vehicle.plate_number, console_id);
            console_response(console_id, &consoles, &fleet.source)
        }
        Err(e) => lock_failed("consoles", e),
    }
}

fn console_response(console_id: Uuid, consoles: &ConsoleRegistry, source: &str) -> HttpResponse {
    match consoles.get(&console_id) {
        Some(console) => HttpResponse::Ok().json(ApiResponse::success(ConsoleResponse {
            console_id,
            console: ConsoleView::from(console),
        }, source)),
        None => not_found(format!("Driver console '{}' not found", console_id)),
    }
}

async fn get_console(state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    let source = state.source();
    match state.consoles.lock() {
        Ok(consoles) => console_response(path.into_inner(), &consoles, &source),
        Err(e) => lock_failed("consoles", e),
    }
}

async fn console_action(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<DriverAction>,
) -> HttpResponse {
    let console_id = path.into_inner();
    let source = state.source();
    match state.consoles.lock() {
        Ok(mut consoles) => {
            match consoles.get_mut(&console_id) {
                Some(console) => console.apply(body.into_inner()),
                None => return not_found(format!("Driver console '{}' not found", console_id)),
            }
            console_response(console_id, &consoles, &source)
        }
        Err(e) => lock_failed("consoles", e),
    }
}

async fn close_console(state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    let console_id = path.into_inner();
    let source = state.source();
    match state.consoles.lock() {
        Ok(mut consoles) => {
            if consoles.close(&console_id) {
                HttpResponse::Ok().json(ApiResponse::success("Driver console closed", &source))
            } else {
                not_found(format!("Driver console '{}' not found", console_id))
            }
        }
        Err(e) => lock_failed("consoles", e),
    }
}

// ============================================================================
// Route table
// ============================================================================

// Extractor failures get the same envelope as handler errors.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = bad_request(format!("Malformed request body: {}", err));
    InternalError::from_response(err, response).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = bad_request(format!("Malformed query string: {}", err));
    InternalError::from_response(err, response).into()
}

fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    let response = not_found(format!("No such resource '{}'", req.path()));
    InternalError::from_response(err, response).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/", web::get().to(serve_index))
        .route("/live-map.js", web::get().to(serve_js))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/api/jeepney")
                .route("/fleet", web::get().to(get_fleet))
                .route("/vehicles", web::get().to(get_vehicles))
                .route("/routes", web::get().to(get_routes))
                .route("/vehicle/{id}", web::get().to(get_vehicle_by_id))
                .route("/route/{code}", web::get().to(get_route_by_code))
                .route("/stats", web::get().to(get_stats))
                .route("/map-config", web::get().to(get_map_config))
                .route("/refresh", web::post().to(force_refresh))
                .route("/views", web::post().to(mount_view))
                .route("/views/{id}", web::get().to(get_view))
                .route("/views/{id}", web::delete().to(unmount_view))
                .route("/views/{id}/actions", web::post().to(view_action))
                .route("/views/{id}/surface", web::post().to(report_surface))
                .route("/drivers", web::post().to(open_console))
                .route("/drivers/{id}", web::get().to(get_console))
                .route("/drivers/{id}", web::delete().to(close_console))
                .route("/drivers/{id}/actions", web::post().to(console_action)),
        );
}


// Plain #[test] is shadowed by actix_web::test inside the module above.
#[cfg(test)]
mod reload_tests {
    use super::*;

    #[test]
    fn reload_swaps_snapshot_and_redraws_views() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vehicles.csv"),
            "id,plate_number,short_code,route_name,lat,lng,available_seats,total_seats,status\n\
             v1,NEW-0001,04B,Lahug → Carbon,10.32,123.89,5,16,active\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("routes.csv"),
            "id,name,short_code,color,start_point,end_point,status\n\
             r1,Lahug → Carbon,04B,#e11d48,JY Square,Carbon Market,active\n",
        )
        .unwrap();

        let mut config = TrackerConfig::default();
        config.fleet.data_dir = Some(dir.path().to_path_buf());
        let state = AppState::new(JeepneyModels::sample_snapshot(), config);

        let view_id = {
            let fleet = state.fleet.lock().unwrap();
            state
                .views
                .lock()
                .unwrap()
                .mount(BrowserSurface::new(&state.config.map), &fleet)
        };

        assert_eq!(reload_fleet(&state).unwrap(), Some(1));

        let views = state.views.lock().unwrap();
        let frame = views.get(&view_id).unwrap().surface().frame().unwrap();
        assert_eq!(frame.markers.len(), 1);
        assert_eq!(frame.markers[0].vehicle_id, "v1");
    }
}
