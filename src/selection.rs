//! Live map view state and its reducer.
//!
//! State only changes through [`reduce`]: marker clicks, search edits,
//! search submissions and panel toggles.

use crate::jeepney_models::Vehicle;
use crate::search::find_exact;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    None,
    Selected { vehicle_id: String },
}

impl Selection {
    pub fn vehicle_id(&self) -> Option<&str> {
        match self {
            Selection::None => None,
            Selection::Selected { vehicle_id } => Some(vehicle_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub selection: Selection,
    pub search_code: String,
    pub panel_open: bool,
}

#[derive(Debug, Clone)]
pub enum ViewAction {
    /// Text box changed. Only the search code moves.
    SearchEdited(String),
    /// Search form submitted; selects the first exact short-code match.
    SearchSubmitted(String),
    MarkerClicked(Vehicle),
    PanelToggled,
}

pub fn reduce(state: &ViewState, action: &ViewAction, vehicles: &[Vehicle]) -> ViewState {
    match action {
        ViewAction::SearchEdited(text) => ViewState {
            search_code: text.clone(),
            ..state.clone()
        },
        ViewAction::SearchSubmitted(text) => {
            let selection = match find_exact(vehicles, text) {
                Some(vehicle) => Selection::Selected { vehicle_id: vehicle.id.clone() },
                None => Selection::None,
            };
            ViewState {
                selection,
                search_code: text.clone(),
                panel_open: true,
            }
        }
        ViewAction::MarkerClicked(vehicle) => ViewState {
            selection: Selection::Selected { vehicle_id: vehicle.id.clone() },
            search_code: vehicle.short_code.clone(),
            panel_open: true,
        },
        ViewAction::PanelToggled => ViewState {
            panel_open: !state.panel_open,
            ..state.clone()
        },
    }
}

impl ViewState {
    pub fn dispatch(&mut self, action: &ViewAction, vehicles: &[Vehicle]) {
        *self = reduce(self, action, vehicles);
    }
}
