// Map Rendering Surface
//
// The surface draws markers and polylines handed to it and owns its own
// failures. A missing key or a script that will not load leaves no map to
// draw on; geolocation problems only add a notice to a working map. Nothing
// here feeds into search or selection state.

use crate::config::MapConfig;
use crate::jeepney_models::{LatLng, Route, SeatAvailability, Vehicle};
use serde::{Deserialize, Serialize};

pub const ROUTE_STROKE_OPACITY: f32 = 0.8;
pub const ROUTE_STROKE_WEIGHT: u32 = 4;

// ============================================================================
// Surface status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFailure {
    MissingApiKey,
    ScriptLoad,
    GeolocationDenied,
    GeolocationUnsupported,
}

impl SurfaceFailure {
    pub fn message(&self) -> &'static str {
        match self {
            SurfaceFailure::MissingApiKey => {
                "Google Maps API key not configured. Set GOOGLE_MAPS_API_KEY or map.api_key in config.toml"
            }
            SurfaceFailure::ScriptLoad => "Error loading Google Maps",
            SurfaceFailure::GeolocationDenied => "Location permission denied, showing the city center instead",
            SurfaceFailure::GeolocationUnsupported => "Geolocation is not supported by this browser",
        }
    }

    /// Whether the map itself is unusable. Geolocation failures fall back to
    /// the default center.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SurfaceFailure::MissingApiKey | SurfaceFailure::ScriptLoad)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SurfaceStatus {
    Loading,
    Ready { notice: Option<String> },
    Failed { message: String },
}

impl SurfaceStatus {
    pub fn failed(failure: SurfaceFailure) -> Self {
        SurfaceStatus::Failed { message: failure.message().to_string() }
    }

    /// Builds a status from what the widget reports. An error wins over readiness.
    pub fn from_report(report: &SurfaceReport) -> Self {
        match non_blank(&report.error) {
            Some(message) => SurfaceStatus::Failed { message },
            None if report.ready => SurfaceStatus::Ready { notice: non_blank(&report.notice) },
            None => SurfaceStatus::Loading,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, SurfaceStatus::Ready { .. })
    }
}

fn non_blank(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// What the widget says about itself. `error` means the map cannot be shown;
/// `notice` is a message to display on top of a working map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurfaceReport {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub notice: Option<String>,
}

// ============================================================================
// Frame handed to the surface
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerIcon {
    Default,
    Selected,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerSpec {
    pub vehicle_id: String,
    pub position: LatLng,
    pub title: String,
    pub icon: MarkerIcon,
    pub seat_availability: SeatAvailability,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolylineSpec {
    pub route_id: String,
    pub path: Vec<LatLng>,
    pub stroke_color: String,
    pub stroke_opacity: f32,
    pub stroke_weight: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapFrame {
    pub center: LatLng,
    pub zoom: u8,
    pub markers: Vec<MarkerSpec>,
    pub polylines: Vec<PolylineSpec>,
}

impl MapFrame {
    pub fn build(
        center: LatLng,
        zoom: u8,
        vehicles: &[&Vehicle],
        routes: &[&Route],
        selected: Option<&str>,
    ) -> Self {
        let markers = vehicles
            .iter()
            .map(|v| MarkerSpec {
                vehicle_id: v.id.clone(),
                position: v.position,
                title: format!("{} - {}", v.plate_number, v.route_name),
                icon: if selected == Some(v.id.as_str()) {
                    MarkerIcon::Selected
                } else {
                    MarkerIcon::Default
                },
                seat_availability: v.seat_availability(),
            })
            .collect();

        let polylines = routes
            .iter()
            .filter(|r| r.is_visible())
            .map(|r| PolylineSpec {
                route_id: r.id.clone(),
                path: r.path.clone(),
                stroke_color: r.color.clone(),
                stroke_opacity: ROUTE_STROKE_OPACITY,
                stroke_weight: ROUTE_STROKE_WEIGHT,
            })
            .collect();

        MapFrame { center, zoom, markers, polylines }
    }
}

// ============================================================================
// Surface trait and the browser-backed implementation
// ============================================================================

pub trait MapSurface {
    fn status(&self) -> &SurfaceStatus;

    /// Replaces whatever the surface is showing. Called after every view transition.
    fn render(&mut self, vehicles: &[&Vehicle], routes: &[&Route], selected: Option<&str>);

    /// Status update coming from the widget itself.
    fn report(&mut self, report: &SurfaceReport);
}

/// Surface drawn by the embedded web page. Keeps the last frame until the
/// browser polls it.
#[derive(Debug, Clone)]
pub struct BrowserSurface {
    center: LatLng,
    zoom: u8,
    status: SurfaceStatus,
    frame: Option<MapFrame>,
}

impl BrowserSurface {
    pub fn new(config: &MapConfig) -> Self {
        let status = if config.has_api_key() {
            SurfaceStatus::Loading
        } else {
            SurfaceStatus::failed(SurfaceFailure::MissingApiKey)
        };

        BrowserSurface {
            center: config.center,
            zoom: config.zoom,
            status,
            frame: None,
        }
    }

    pub fn frame(&self) -> Option<&MapFrame> {
        self.frame.as_ref()
    }
}

impl MapSurface for BrowserSurface {
    fn status(&self) -> &SurfaceStatus {
        &self.status
    }

    fn render(&mut self, vehicles: &[&Vehicle], routes: &[&Route], selected: Option<&str>) {
        self.frame = Some(MapFrame::build(self.center, self.zoom, vehicles, routes, selected));
    }

    fn report(&mut self, report: &SurfaceReport) {
        // Without a key the widget can never load; keep that message.
        if self.status == SurfaceStatus::failed(SurfaceFailure::MissingApiKey) {
            return;
        }
        self.status = match (SurfaceStatus::from_report(report), &self.status) {
            // A loaded map stays loaded; a later report can only change its notice.
            (SurfaceStatus::Loading, SurfaceStatus::Ready { notice }) => SurfaceStatus::Ready {
                notice: non_blank(&report.notice).or_else(|| notice.clone()),
            },
            (status, _) => status,
        };
    }
}
