use std::f64::consts::TAU;

use crate::predict::ground_station::Observer;
use crate::predict::propagation::{norm, OrbitState};
use crate::predict::time::JulianDate;

/// Topocentric look angles. Azimuth is measured from north, clockwise, in
/// `[0, 2π)`; elevation is positive above the horizon. NaN throughout when
/// the underlying state is degenerate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub time: JulianDate,
    pub azimuth: f64,
    pub elevation: f64,
    pub range_km: f64,
    pub range_rate_km_s: f64,
}

impl Observation {
    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth.to_degrees()
    }

    pub fn elevation_deg(&self) -> f64 {
        self.elevation.to_degrees()
    }

    /// `elevation >= threshold`; never true for NaN.
    pub fn is_above(&self, threshold: f64) -> bool {
        is_above(self.elevation, threshold)
    }
}

pub(crate) fn is_above(elevation: f64, threshold: f64) -> bool {
    elevation.is_finite() && elevation >= threshold
}

/// Greenwich mean sidereal time in radians.
pub fn gmst(time: JulianDate) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(time.julian_years_since_j2000())
}

pub fn observe(observer: &Observer, state: &OrbitState) -> Observation {
    let theta = (gmst(state.time) + observer.longitude).rem_euclid(TAU);

    let obs_pos = observer.position_km(theta);
    let obs_vel = observer.velocity_km_s(theta);

    let dr = sub(state.position, obs_pos);
    let dv = sub(state.velocity, obs_vel);
    let range_km = norm(dr);

    let (east, north, up) = to_enu(dr, observer.latitude, theta);

    let mut azimuth = east.atan2(north).rem_euclid(TAU);
    if azimuth >= TAU {
        azimuth = 0.0;
    }
    let elevation = if range_km > 0.0 {
        (up / range_km).clamp(-1.0, 1.0).asin()
    } else {
        f64::NAN
    };
    let range_rate_km_s = (dr[0] * dv[0] + dr[1] * dv[1] + dr[2] * dv[2]) / range_km;

    Observation {
        time: state.time,
        azimuth,
        elevation,
        range_km,
        range_rate_km_s,
    }
}

/// Rotate an Earth-centered vector into the local east/north/up frame of a
/// site at geodetic latitude `lat` whose meridian sits at angle `theta`.
pub fn to_enu(dr: [f64; 3], lat: f64, theta: f64) -> (f64, f64, f64) {
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let sin_theta = theta.sin();
    let cos_theta = theta.cos();

    let east = -sin_theta * dr[0] + cos_theta * dr[1];
    let north = -sin_lat * cos_theta * dr[0] - sin_lat * sin_theta * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_theta * dr[0] + cos_lat * sin_theta * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
