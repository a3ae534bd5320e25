//! Emergency alert mode and location reporting.

mod controller;
mod location;

pub use controller::{EmergencyController, EmergencyDirective};
pub use location::{
    LocationProvider, LocationReporter, LocationSample, Thresholds, best_last_known, best_of,
};
