//! Cebu Jeepney Tracker
//!
//! Commuter live map view: fleet snapshot, short-code search, selection
//! state and the map surface interface, plus the HTTP service that hosts it.

pub mod api;
pub mod config;
pub mod driver_console;
pub mod error;
pub mod jeepney_models;
pub mod live_map;
pub mod map_surface;
pub mod search;
pub mod selection;
