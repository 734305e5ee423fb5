use sgp4::MinutesSinceEpoch;

use crate::predict::elements::OrbitalElements;
use crate::predict::error::PredictError;
use crate::predict::time::JulianDate;

/// Satellite state in the TEME frame at `time`.
///
/// Position in km, velocity in km/s. A state produced from a decayed or
/// otherwise unpropagatable element set carries NaN vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub time: JulianDate,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

impl OrbitState {
    pub fn degenerate(time: JulianDate) -> Self {
        Self {
            time,
            position: [f64::NAN; 3],
            velocity: [f64::NAN; 3],
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.position
            .iter()
            .chain(self.velocity.iter())
            .any(|v| !v.is_finite())
    }

    pub fn radius_km(&self) -> f64 {
        norm(self.position)
    }
}

/// Advance `elements` to `time`.
///
/// Errors from the underlying SGP4/SDP4 model (eccentricity out of range,
/// negative semi-latus rectum) are returned as `PredictError::Propagation`.
pub fn try_propagate(
    elements: &OrbitalElements,
    time: JulianDate,
) -> Result<OrbitState, PredictError> {
    let minutes = time.minutes_since(elements.epoch());

    let prediction = elements
        .constants()
        .propagate(MinutesSinceEpoch(minutes))
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    Ok(OrbitState {
        time,
        position: prediction.position,
        velocity: prediction.velocity,
    })
}

/// Same as [`try_propagate`], but failures yield a degenerate state instead of an error.
pub fn propagate(elements: &OrbitalElements, time: JulianDate) -> OrbitState {
    match try_propagate(elements, time) {
        Ok(state) => state,
        Err(e) => {
            log::trace!("{}: {} at {}", elements.display_name(), e, time);
            OrbitState::degenerate(time)
        }
    }
}

pub(crate) fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::fixtures::*;

    /// Satellite 00005 from the SGP4 verification set (Vallado et al., "Revisiting
    /// Spacetrack Report #3"). The published states use WGS-72; the WGS-84
    /// constants used here move them by metres, not kilometres.
    #[test]
    fn matches_published_verification_states() {
        let elements = OrbitalElements::from_tle(
            None,
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
        )
        .unwrap();

        let published = [
            (
                0.0,
                [7022.46529266, -1400.08296755, 0.03995155],
                [1.893841015, 6.405893759, 4.534807250],
            ),
            (
                360.0,
                [-7154.03120202, -3783.17682504, -3536.19412294],
                [4.741887409, -4.151817765, -2.093935425],
            ),
            (
                720.0,
                [-7134.59340119, 6531.68641334, 3260.27186483],
                [-4.113793027, -2.911922039, -2.557327851],
            ),
        ];

        for (minutes, position, velocity) in published {
            let time = elements.epoch().plus_seconds(minutes * 60.0);
            let state = try_propagate(&elements, time).unwrap();
            for axis in 0..3 {
                assert!(
                    (state.position[axis] - position[axis]).abs() < 1.0,
                    "t+{} min, axis {}: {} km vs {} km",
                    minutes,
                    axis,
                    state.position[axis],
                    position[axis]
                );
                assert!(
                    (state.velocity[axis] - velocity[axis]).abs() < 1e-3,
                    "t+{} min, axis {}: {} km/s vs {} km/s",
                    minutes,
                    axis,
                    state.velocity[axis],
                    velocity[axis]
                );
            }
        }
    }

    #[test]
    fn iss_at_epoch_is_in_low_orbit() {
        let iss = iss();
        let state = propagate(&iss, iss.epoch());
        assert!(!state.is_degenerate());
        let altitude = state.radius_km() - 6378.137;
        assert!(altitude > 300.0 && altitude < 420.0, "altitude {}", altitude);
        let speed = norm(state.velocity);
        assert!((speed - 7.7).abs() < 0.2, "speed {}", speed);
    }

    #[test]
    fn deterministic() {
        let iss = iss();
        let t = iss.epoch().plus_days(1.25);
        let a = propagate(&iss, t);
        let b = propagate(&iss, t);
        assert_eq!(a, b);
    }

    #[test]
    fn geostationary_radius() {
        let geo = geostationary();
        let state = propagate(&geo, geo.epoch().plus_days(3.0));
        assert!(!state.is_degenerate());
        assert!((state.radius_km() - 42_164.0).abs() < 200.0);
    }

    #[test]
    fn degenerate_state() {
        let t = JulianDate(2_460_000.5);
        let state = OrbitState::degenerate(t);
        assert!(state.is_degenerate());
        assert_eq!(state.time, t);
        assert!(state.radius_km().is_nan());
    }

    #[test]
    fn decayed_orbit_does_not_panic() {
        let obj = decaying();
        // Far past re-entry: either the model errors out or returns something finite.
        let state = propagate(&obj, obj.epoch().plus_days(365.0));
        assert_eq!(state.time.days(), obj.epoch().plus_days(365.0).days());
    }
}
