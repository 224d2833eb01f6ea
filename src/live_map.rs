//! Commuter live map view: search, selection and the map surface wired
//! together over one fleet snapshot.

use crate::jeepney_models::{FleetSnapshot, OccupancyBand, SeatAvailability, Vehicle};
use crate::map_surface::{MapSurface, SurfaceReport, SurfaceStatus};
use crate::search::{filter_fleet, FilteredFleet};
use crate::selection::{Selection, ViewAction, ViewState};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct VehicleCard {
    pub vehicle_id: String,
    pub plate_number: String,
    pub short_code: String,
    pub route_name: String,
    pub available_seats: u32,
    pub total_seats: u32,
    pub seat_percentage: f64,
    pub seat_availability: SeatAvailability,
    pub occupancy: OccupancyBand,
    pub occupancy_color: &'static str,
}

impl From<&Vehicle> for VehicleCard {
    fn from(v: &Vehicle) -> Self {
        let occupancy = v.occupancy_band();
        VehicleCard {
            vehicle_id: v.id.clone(),
            plate_number: v.plate_number.clone(),
            short_code: v.short_code.clone(),
            route_name: v.route_name.clone(),
            available_seats: v.available_seats,
            total_seats: v.total_seats,
            seat_percentage: v.seat_percentage(),
            seat_availability: v.seat_availability(),
            occupancy,
            occupancy_color: occupancy.color(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoPanel {
    Idle,
    Selected { vehicle: VehicleCard },
    NoResults { query: String },
}

/// Everything the page needs to draw one frame of the view.
#[derive(Debug, Clone, Serialize)]
pub struct ViewModel<'a> {
    pub search_code: &'a str,
    pub panel_open: bool,
    pub selection: &'a Selection,
    pub fleet: FilteredFleet<'a>,
    pub info_panel: InfoPanel,
    pub surface: &'a SurfaceStatus,
}

pub struct LiveMapView<S: MapSurface> {
    state: ViewState,
    surface: S,
}

impl<S: MapSurface> LiveMapView<S> {
    /// Fresh view: nothing selected, empty search, panel closed.
    pub fn mount(surface: S, snapshot: &FleetSnapshot) -> Self {
        let mut view = LiveMapView {
            state: ViewState::default(),
            surface,
        };
        view.redraw(snapshot);
        view
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn dispatch(&mut self, action: &ViewAction, snapshot: &FleetSnapshot) {
        self.state.dispatch(action, &snapshot.vehicles);
        debug!("view action {:?} -> {:?}", action, self.state);
        self.redraw(snapshot);
    }

    /// Marker callback from the surface.
    pub fn on_vehicle_activated(&mut self, vehicle: &Vehicle, snapshot: &FleetSnapshot) {
        self.dispatch(&ViewAction::MarkerClicked(vehicle.clone()), snapshot);
    }

    /// Forwards a widget status report. View state is untouched.
    pub fn report_surface(&mut self, report: &SurfaceReport) {
        self.surface.report(report);
    }

    /// Re-renders against a (possibly reloaded) snapshot.
    pub fn redraw(&mut self, snapshot: &FleetSnapshot) {
        let fleet = filter_fleet(&snapshot.vehicles, &snapshot.routes, &self.state.search_code);
        self.surface
            .render(&fleet.vehicles, &fleet.routes, self.state.selection.vehicle_id());
    }

    pub fn view_model<'a>(&'a self, snapshot: &'a FleetSnapshot) -> ViewModel<'a> {
        let fleet = filter_fleet(&snapshot.vehicles, &snapshot.routes, &self.state.search_code);

        let selected = self
            .state
            .selection
            .vehicle_id()
            .and_then(|id| snapshot.vehicle(id));

        let info_panel = match selected {
            Some(vehicle) => InfoPanel::Selected { vehicle: VehicleCard::from(vehicle) },
            None if !self.state.search_code.is_empty() => InfoPanel::NoResults {
                query: self.state.search_code.clone(),
            },
            None => InfoPanel::Idle,
        };

        ViewModel {
            search_code: &self.state.search_code,
            panel_open: self.state.panel_open,
            selection: &self.state.selection,
            fleet,
            info_panel,
            surface: self.surface.status(),
        }
    }

    /// Tears the view down, handing back the surface.
    pub fn unmount(self) -> S {
        self.surface
    }
}

// ============================================================================
// Mounted views
// ============================================================================

pub struct ViewRegistry<S: MapSurface> {
    views: HashMap<Uuid, LiveMapView<S>>,
}

impl<S: MapSurface> Default for ViewRegistry<S> {
    fn default() -> Self {
        ViewRegistry { views: HashMap::new() }
    }
}

impl<S: MapSurface> ViewRegistry<S> {
    pub fn mount(&mut self, surface: S, snapshot: &FleetSnapshot) -> Uuid {
        let id = Uuid::new_v4();
        self.views.insert(id, LiveMapView::mount(surface, snapshot));
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&LiveMapView<S>> {
        self.views.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut LiveMapView<S>> {
        self.views.get_mut(id)
    }

    pub fn unmount(&mut self, id: &Uuid) -> bool {
        self.views.remove(id).map(LiveMapView::unmount).is_some()
    }

    /// Re-renders every mounted view, e.g. after the snapshot was reloaded.
    pub fn redraw_all(&mut self, snapshot: &FleetSnapshot) {
        for view in self.views.values_mut() {
            view.redraw(snapshot);
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::jeepney_models::JeepneyModels;
    use crate::map_surface::{BrowserSurface, MarkerIcon, SurfaceFailure};

    fn keyed_surface() -> BrowserSurface {
        BrowserSurface::new(&MapConfig {
            api_key: Some("test-key".into()),
            ..MapConfig::default()
        })
    }

    #[test]
    fn mount_renders_the_whole_fleet() {
        let snapshot = JeepneyModels::sample_snapshot();
        let view = LiveMapView::mount(keyed_surface(), &snapshot);

        let frame = view.surface().frame().unwrap();
        assert_eq!(frame.markers.len(), snapshot.vehicles.len());
        assert_eq!(frame.polylines.len(), snapshot.routes.len());
        assert!(matches!(view.view_model(&snapshot).info_panel, InfoPanel::Idle));
    }

    #[test]
    fn panel_and_surface_share_the_filtered_lists() {
        let snapshot = JeepneyModels::sample_snapshot();
        let mut view = LiveMapView::mount(keyed_surface(), &snapshot);

        view.dispatch(&ViewAction::SearchEdited("17".into()), &snapshot);

        let model = view.view_model(&snapshot);
        let frame = view.surface().frame().unwrap();
        let model_ids: Vec<&str> = model.fleet.vehicles.iter().map(|v| v.id.as_str()).collect();
        let frame_ids: Vec<&str> = frame.markers.iter().map(|m| m.vehicle_id.as_str()).collect();
        assert_eq!(model_ids, vec!["j-004", "j-005"]);
        assert_eq!(model_ids, frame_ids);
        assert_eq!(frame.polylines.len(), 1);
    }

    #[test]
    fn marker_activation_selects_and_highlights() {
        let snapshot = JeepneyModels::sample_snapshot();
        let mut view = LiveMapView::mount(keyed_surface(), &snapshot);
        let target = snapshot.vehicle("j-007").unwrap();

        view.on_vehicle_activated(target, &snapshot);

        let model = view.view_model(&snapshot);
        assert_eq!(model.search_code, "62B");
        assert!(model.panel_open);
        match model.info_panel {
            InfoPanel::Selected { vehicle } => {
                assert_eq!(vehicle.plate_number, "PQR-6789");
                assert_eq!(vehicle.occupancy, OccupancyBand::Medium);
            }
            other => panic!("unexpected panel {other:?}"),
        }

        let frame = view.surface().frame().unwrap();
        let highlighted: Vec<&str> = frame
            .markers
            .iter()
            .filter(|m| m.icon == MarkerIcon::Selected)
            .map(|m| m.vehicle_id.as_str())
            .collect();
        assert_eq!(highlighted, vec!["j-007"]);
    }

    #[test]
    fn failed_submission_shows_no_results() {
        let snapshot = JeepneyModels::sample_snapshot();
        let mut view = LiveMapView::mount(keyed_surface(), &snapshot);

        view.dispatch(&ViewAction::SearchSubmitted("zzz".into()), &snapshot);

        let model = view.view_model(&snapshot);
        assert!(model.fleet.is_empty());
        assert!(matches!(model.info_panel, InfoPanel::NoResults { ref query } if query == "zzz"));
    }

    #[test]
    fn surface_failure_leaves_view_state_alone() {
        let snapshot = JeepneyModels::sample_snapshot();
        let mut view = LiveMapView::mount(keyed_surface(), &snapshot);
        view.dispatch(&ViewAction::SearchSubmitted("04b".into()), &snapshot);
        let before = view.state().clone();

        view.report_surface(&SurfaceReport {
            ready: false,
            error: Some("Script error".into()),
            notice: None,
        });

        assert_eq!(*view.state(), before);
        assert!(matches!(view.view_model(&snapshot).surface, SurfaceStatus::Failed { .. }));
    }

    #[test]
    fn geolocation_notice_leaves_view_state_alone() {
        let snapshot = JeepneyModels::sample_snapshot();
        let mut view = LiveMapView::mount(keyed_surface(), &snapshot);
        view.report_surface(&SurfaceReport { ready: true, ..SurfaceReport::default() });
        view.dispatch(&ViewAction::SearchSubmitted("17B".into()), &snapshot);
        let before = view.state().clone();

        view.report_surface(&SurfaceReport {
            ready: true,
            error: None,
            notice: Some(SurfaceFailure::GeolocationDenied.message().into()),
        });

        assert_eq!(*view.state(), before);
        let model = view.view_model(&snapshot);
        assert!(model.surface.is_usable());
        assert!(matches!(model.surface, SurfaceStatus::Ready { notice: Some(_) }));
    }

    #[test]
    fn selection_of_vanished_vehicle_reads_as_no_results() {
        let snapshot = JeepneyModels::sample_snapshot();
        let mut view = LiveMapView::mount(keyed_surface(), &snapshot);
        view.dispatch(&ViewAction::SearchSubmitted("12L".into()), &snapshot);

        let mut reloaded = snapshot.clone();
        reloaded.vehicles.retain(|v| v.id != "j-003");
        view.redraw(&reloaded);

        assert!(matches!(view.view_model(&reloaded).info_panel, InfoPanel::NoResults { .. }));
    }

    #[test]
    fn remount_starts_from_scratch() {
        let snapshot = JeepneyModels::sample_snapshot();
        let mut registry: ViewRegistry<BrowserSurface> = ViewRegistry::default();

        let first = registry.mount(keyed_surface(), &snapshot);
        let target = snapshot.vehicle("j-001").unwrap().clone();
        registry
            .get_mut(&first)
            .unwrap()
            .dispatch(&ViewAction::MarkerClicked(target), &snapshot);
        assert!(registry.unmount(&first));
        assert!(!registry.unmount(&first));
        assert!(registry.get(&first).is_none());

        let second = registry.mount(keyed_surface(), &snapshot);
        assert_ne!(first, second);
        let state = registry.get(&second).unwrap().state();
        assert_eq!(state.selection, Selection::None);
        assert!(state.search_code.is_empty());
        assert!(!state.panel_open);
        assert_eq!(registry.len(), 1);
    }
}
