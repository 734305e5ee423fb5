use std::f64::consts::PI;
use std::fmt;

use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;
use crate::predict::time::{JulianDate, SECONDS_PER_DAY};

// WGS-84
pub const EARTH_RADIUS_KM: f64 = 6378.137;
pub const EARTH_MU_KM3_S2: f64 = 398_600.4418;

/// Orbits with a period at or above this use the deep-space (SDP4) model.
pub const DEEP_SPACE_PERIOD_MINUTES: f64 = 225.0;

/// Mean motion (rev/day) at which an orbit is considered re-entered.
const DECAY_MEAN_MOTION: f64 = 16.666666;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationModel {
    NearEarth,
    DeepSpace,
}

impl PropagationModel {
    pub fn for_period_minutes(period: f64) -> Self {
        if period >= DEEP_SPACE_PERIOD_MINUTES {
            PropagationModel::DeepSpace
        } else {
            PropagationModel::NearEarth
        }
    }
}

impl fmt::Display for PropagationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationModel::NearEarth => write!(f, "near-earth"),
            PropagationModel::DeepSpace => write!(f, "deep-space"),
        }
    }
}

/// Validated mean elements for one satellite.
///
/// Angles are stored in radians, mean motion in revolutions per day. The
/// `sgp4` initialisation constants are computed once here, so the choice of
/// near-earth or deep-space perturbations is fixed at construction and
/// propagation never mutates anything.
pub struct OrbitalElements {
    name: Option<String>,
    norad_id: u64,
    epoch: JulianDate,
    mean_motion: f64,
    mean_motion_dot: f64,
    mean_motion_ddot: f64,
    eccentricity: f64,
    inclination: f64,
    right_ascension: f64,
    argument_of_perigee: f64,
    mean_anomaly: f64,
    drag_term: f64,
    model: PropagationModel,
    constants: Constants,
}

impl OrbitalElements {
    /// Parse a two-line element set (optionally with its name line).
    pub fn from_tle(name: Option<String>, line1: &str, line2: &str) -> Result<Self, PredictError> {
        let elements = Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| PredictError::Elements(e.to_string()))?;
        Self::from_sgp4(&elements)
    }

    pub fn from_sgp4(elements: &Elements) -> Result<Self, PredictError> {
        if !(elements.mean_motion > 0.0) {
            return Err(PredictError::Elements(format!(
                "mean motion must be positive, got {}",
                elements.mean_motion
            )));
        }

        let constants = Constants::from_elements(elements)
            .map_err(|e| PredictError::Elements(e.to_string()))?;

        let period = 1440.0 / elements.mean_motion;

        Ok(Self {
            name: elements.object_name.clone(),
            norad_id: elements.norad_id,
            epoch: JulianDate::from_datetime(&elements.datetime.and_utc()),
            mean_motion: elements.mean_motion,
            mean_motion_dot: elements.mean_motion_dot,
            mean_motion_ddot: elements.mean_motion_ddot,
            eccentricity: elements.eccentricity,
            inclination: elements.inclination.to_radians(),
            right_ascension: elements.right_ascension.to_radians(),
            argument_of_perigee: elements.argument_of_perigee.to_radians(),
            mean_anomaly: elements.mean_anomaly.to_radians(),
            drag_term: elements.drag_term,
            model: PropagationModel::for_period_minutes(period),
            constants,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for log lines, falling back to the catalog number.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.norad_id),
            None => format!("NORAD {}", self.norad_id),
        }
    }

    pub fn norad_id(&self) -> u64 {
        self.norad_id
    }

    pub fn epoch(&self) -> JulianDate {
        self.epoch
    }

    /// Revolutions per day.
    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    pub fn mean_motion_dot(&self) -> f64 {
        self.mean_motion_dot
    }

    pub fn mean_motion_ddot(&self) -> f64 {
        self.mean_motion_ddot
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    pub fn right_ascension(&self) -> f64 {
        self.right_ascension
    }

    pub fn argument_of_perigee(&self) -> f64 {
        self.argument_of_perigee
    }

    pub fn mean_anomaly(&self) -> f64 {
        self.mean_anomaly
    }

    /// B* drag term, 1/earth radii.
    pub fn drag_term(&self) -> f64 {
        self.drag_term
    }

    pub fn model(&self) -> PropagationModel {
        self.model
    }

    pub(crate) fn constants(&self) -> &Constants {
        &self.constants
    }

    pub fn period_minutes(&self) -> f64 {
        1440.0 / self.mean_motion
    }

    pub fn semi_major_axis_km(&self) -> f64 {
        let n = self.mean_motion * 2.0 * PI / SECONDS_PER_DAY;
        (EARTH_MU_KM3_S2 / (n * n)).cbrt()
    }

    pub fn perigee_altitude_km(&self) -> f64 {
        self.semi_major_axis_km() * (1.0 - self.eccentricity) - EARTH_RADIUS_KM
    }

    pub fn apogee_altitude_km(&self) -> f64 {
        self.semi_major_axis_km() * (1.0 + self.eccentricity) - EARTH_RADIUS_KM
    }

    /// Rough re-entry estimate from the first derivative of mean motion.
    ///
    /// `None` when the element set carries no decay rate.
    pub fn decay_date(&self) -> Option<JulianDate> {
        if self.mean_motion_dot == 0.0 || !self.mean_motion_dot.is_finite() {
            return None;
        }
        let days = (DECAY_MEAN_MOTION - self.mean_motion) / (10.0 * self.mean_motion_dot.abs());
        Some(self.epoch.plus_days(days))
    }

    pub fn is_decayed(&self, time: JulianDate) -> bool {
        self.decay_date().is_some_and(|decay| time > decay)
    }
}

impl fmt::Debug for OrbitalElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrbitalElements")
            .field("name", &self.name)
            .field("norad_id", &self.norad_id)
            .field("epoch", &self.epoch)
            .field("mean_motion", &self.mean_motion)
            .field("eccentricity", &self.eccentricity)
            .field("inclination", &self.inclination)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
