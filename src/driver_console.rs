//! Driver console: local tracking toggle and passenger counter.
//!
//! Nothing here is transmitted. Tracking start/stop only flips a flag and
//! logs it.

use crate::jeepney_models::Vehicle;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_CAPACITY: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverAction {
    StartTracking,
    StopTracking,
    Board,
    Alight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverConsole {
    pub vehicle_id: String,
    pub plate_number: String,
    pub tracking: bool,
    pub passenger_count: u32,
    pub capacity: u32,
}

impl DriverConsole {
    pub fn for_vehicle(vehicle: &Vehicle) -> Self {
        DriverConsole {
            vehicle_id: vehicle.id.clone(),
            plate_number: vehicle.plate_number.clone(),
            tracking: false,
            passenger_count: 0,
            capacity: if vehicle.total_seats == 0 { DEFAULT_CAPACITY } else { vehicle.total_seats },
        }
    }

    pub fn apply(&mut self, action: DriverAction) {
        match action {
            DriverAction::StartTracking => {
                self.tracking = true;
                info!("📡 Tracking started for {} ({})", self.plate_number, self.vehicle_id);
            }
            DriverAction::StopTracking => {
                self.tracking = false;
                info!("⏹️  Tracking stopped for {} ({})", self.plate_number, self.vehicle_id);
            }
            DriverAction::Board => {
                self.passenger_count = self.passenger_count.saturating_add(1).min(self.capacity);
            }
            DriverAction::Alight => {
                self.passenger_count = self.passenger_count.saturating_sub(1);
            }
        }
    }

    pub fn seats_left(&self) -> u32 {
        self.capacity - self.passenger_count
    }

    pub fn load_percentage(&self) -> f64 {
        self.passenger_count as f64 / self.capacity as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleView {
    #[serde(flatten)]
    pub console: DriverConsole,
    pub seats_left: u32,
    pub load_percentage: f64,
}

impl From<&DriverConsole> for ConsoleView {
    fn from(console: &DriverConsole) -> Self {
        ConsoleView {
            console: console.clone(),
            seats_left: console.seats_left(),
            load_percentage: console.load_percentage(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsoleRegistry {
    consoles: HashMap<Uuid, DriverConsole>,
}

impl ConsoleRegistry {
    pub fn open(&mut self, vehicle: &Vehicle) -> Uuid {
        let id = Uuid::new_v4();
        self.consoles.insert(id, DriverConsole::for_vehicle(vehicle));
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&DriverConsole> {
        self.consoles.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut DriverConsole> {
        self.consoles.get_mut(id)
    }

    pub fn close(&mut self, id: &Uuid) -> bool {
        self.consoles.remove(id).is_some()
    }
}
