mod elements;
mod error;
mod ground_station;
mod observation;
mod pass_finder;
mod propagation;
mod time;
mod tle_loader;
mod types;

pub use elements::{OrbitalElements, PropagationModel, EARTH_RADIUS_KM};
pub use error::PredictError;
pub use ground_station::Observer;
pub use observation::{gmst, observe, Observation};
pub use pass_finder::{
    aos_happens, coarse_step_seconds, elevation_at, is_visible, next_aos, next_los, next_pass,
    observe_at, passes_from, predict_passes, search_horizon_days, Passes,
};
pub use propagation::{propagate, try_propagate, OrbitState};
pub use time::{from_julian, to_julian, JulianDate};
pub use tle_loader::{find_in_str, TleLoader};
pub use types::PassWindow;
