use std::f64::consts::{FRAC_PI_2, PI};

use crate::predict::elements::{OrbitalElements, EARTH_RADIUS_KM};
use crate::predict::ground_station::Observer;
use crate::predict::observation::{is_above, observe, Observation};
use crate::predict::propagation::propagate;
use crate::predict::time::{JulianDate, MINUTES_PER_DAY};
use crate::predict::types::PassWindow;

const MIN_COARSE_STEP_SECONDS: f64 = 1.0;
const MAX_COARSE_STEP_SECONDS: f64 = 300.0;
/// Coarse samples taken across the longest possible pass.
const STEPS_PER_PASS: f64 = 10.0;
const REFINE_TOLERANCE_SECONDS: f64 = 0.5;
const MIN_SEARCH_HORIZON_DAYS: f64 = 2.0;
const SEARCH_HORIZON_PERIODS: f64 = 2.0;
/// Slack for the ellipsoid in the visibility pre-check (0.5 degrees).
const AOS_LATITUDE_MARGIN: f64 = 0.5 * PI / 180.0;

/// Observation of `elements` from `observer` at `time`. Elevation is NaN when
/// the orbit has decayed or cannot be propagated.
pub fn observe_at(observer: &Observer, elements: &OrbitalElements, time: JulianDate) -> Observation {
    let mut observation = observe(observer, &propagate(elements, time));
    if elements.is_decayed(time) {
        observation.elevation = f64::NAN;
    }
    observation
}

pub fn elevation_at(observer: &Observer, elements: &OrbitalElements, time: JulianDate) -> f64 {
    observe_at(observer, elements, time).elevation
}

/// Whether the satellite is at or above `threshold` (radians) at `time`.
pub fn is_visible(
    observer: &Observer,
    elements: &OrbitalElements,
    time: JulianDate,
    threshold: f64,
) -> bool {
    is_above(elevation_at(observer, elements, time), threshold)
}

/// Whether the orbit can ever bring the satellite above the observer's horizon.
///
/// Compares the observer's latitude with the highest latitude the satellite
/// can be seen from: orbit inclination plus the horizon half-angle at apogee.
pub fn aos_happens(elements: &OrbitalElements, observer: &Observer) -> bool {
    let mut inclination = elements.inclination();
    if inclination > FRAC_PI_2 {
        inclination = PI - inclination;
    }

    let apogee = elements.apogee_altitude_km();
    if !(apogee > 0.0) {
        return false;
    }

    inclination + ground_half_angle(apogee, 0.0) + AOS_LATITUDE_MARGIN > observer.latitude.abs()
}

/// Coarse scan step, a tenth of the longest time this orbit can spend above
/// `threshold` (a zenith pass at perigee altitude).
pub fn coarse_step_seconds(elements: &OrbitalElements, threshold: f64) -> f64 {
    let period = elements.period_minutes() * 60.0;
    let perigee = elements.perigee_altitude_km();
    if !(perigee > 0.0) || !period.is_finite() {
        return MIN_COARSE_STEP_SECONDS;
    }

    let longest_pass = period * ground_half_angle(perigee, threshold) / PI;
    (longest_pass / STEPS_PER_PASS).clamp(MIN_COARSE_STEP_SECONDS, MAX_COARSE_STEP_SECONDS)
}

/// Earth-central angle between the sub-satellite point and an observer who
/// sees a satellite at `altitude_km` exactly at `elevation` (clamped to the
/// horizon when negative).
fn ground_half_angle(altitude_km: f64, elevation: f64) -> f64 {
    let el = elevation.clamp(0.0, FRAC_PI_2);
    let ratio = EARTH_RADIUS_KM / (EARTH_RADIUS_KM + altitude_km) * el.cos();
    (ratio.acos() - el).max(0.0)
}

/// How far ahead a single AOS/LOS search looks before giving up.
pub fn search_horizon_days(elements: &OrbitalElements) -> f64 {
    let periods = elements.period_minutes() * SEARCH_HORIZON_PERIODS / MINUTES_PER_DAY;
    if periods.is_finite() {
        periods.max(MIN_SEARCH_HORIZON_DAYS)
    } else {
        MIN_SEARCH_HORIZON_DAYS
    }
}

/// Next rise above `threshold` at or after `from`.
///
/// If the satellite is already above the threshold at `from`, the current pass
/// is skipped and the rise of the following one is returned. `None` when no
/// rise happens within the search horizon, the geometry never allows one, or
/// the orbit has decayed.
pub fn next_aos(
    observer: &Observer,
    elements: &OrbitalElements,
    from: JulianDate,
    threshold: f64,
) -> Option<JulianDate> {
    let search = Search::new(observer, elements, threshold);
    if !search.feasible(from) {
        return None;
    }

    let until = from.plus_days(search_horizon_days(elements));
    let start = if search.above(from) {
        search.find_crossing(from, until, false)?
    } else {
        from
    };
    search.find_crossing(start, until, true)
}

/// Next set below `threshold` at or after `from`.
///
/// Intended for use while the satellite is in view; if it is not, this is the
/// LOS of the next pass.
pub fn next_los(
    observer: &Observer,
    elements: &OrbitalElements,
    from: JulianDate,
    threshold: f64,
) -> Option<JulianDate> {
    let search = Search::new(observer, elements, threshold);
    if !search.feasible(from) {
        return None;
    }

    let until = from.plus_days(search_horizon_days(elements));
    let start = if search.above(from) {
        from
    } else {
        search.find_crossing(from, until, true)?
    };
    search.find_crossing(start, until, false)
}

/// The pass in progress at `from`, or the next one.
pub fn next_pass(
    observer: &Observer,
    elements: &OrbitalElements,
    from: JulianDate,
    threshold: f64,
) -> Option<PassWindow> {
    let search = Search::new(observer, elements, threshold);
    if !search.feasible(from) {
        return None;
    }

    let until = from.plus_days(search_horizon_days(elements));
    let aos = if search.above(from) {
        from
    } else {
        search.find_crossing(from, until, true)?
    };
    let los = search.find_crossing(aos, until, false)?;

    Some(search.describe(aos, los))
}

/// Successive passes from `start`, each searched from the previous LOS.
pub fn passes_from<'a>(
    observer: &'a Observer,
    elements: &'a OrbitalElements,
    start: JulianDate,
    threshold: f64,
) -> Passes<'a> {
    Passes {
        observer,
        elements,
        cursor: Some(start),
        threshold,
    }
}

/// All passes starting between `start` and `end`.
pub fn predict_passes(
    observer: &Observer,
    elements: &OrbitalElements,
    start: JulianDate,
    end: JulianDate,
    threshold: f64,
) -> Vec<PassWindow> {
    if !(start < end) {
        return Vec::new();
    }
    passes_from(observer, elements, start, threshold)
        .take_while(|pass| pass.aos <= end)
        .collect()
}

/// Iterator returned by [`passes_from`]. Ends at the first search that finds
/// no pass within the horizon.
pub struct Passes<'a> {
    observer: &'a Observer,
    elements: &'a OrbitalElements,
    cursor: Option<JulianDate>,
    threshold: f64,
}

impl Iterator for Passes<'_> {
    type Item = PassWindow;

    fn next(&mut self) -> Option<PassWindow> {
        let cursor = self.cursor?;
        let pass = next_pass(self.observer, self.elements, cursor, self.threshold);
        self.cursor = pass.map(|p| p.los);
        pass
    }
}

struct Search<'a> {
    observer: &'a Observer,
    elements: &'a OrbitalElements,
    threshold: f64,
    step_seconds: f64,
}

impl<'a> Search<'a> {
    fn new(observer: &'a Observer, elements: &'a OrbitalElements, threshold: f64) -> Self {
        Self {
            observer,
            elements,
            threshold,
            step_seconds: coarse_step_seconds(elements, threshold),
        }
    }

    fn feasible(&self, from: JulianDate) -> bool {
        if self.elements.is_decayed(from) {
            log::debug!("{} has decayed by {}", self.elements.display_name(), from);
            return false;
        }
        if self.threshold >= 0.0 && !aos_happens(self.elements, self.observer) {
            log::debug!(
                "{} never rises at latitude {:.2}",
                self.elements.display_name(),
                self.observer.latitude_deg()
            );
            return false;
        }
        true
    }

    fn above(&self, time: JulianDate) -> bool {
        is_visible(self.observer, self.elements, time, self.threshold)
    }

    /// First crossing after `from` and no later than `until`, in the given
    /// direction. Scans with the coarse step, then bisects the bracket.
    fn find_crossing(&self, from: JulianDate, until: JulianDate, rising: bool) -> Option<JulianDate> {
        let mut prev = from;
        let mut prev_above = self.above(from);

        while prev < until {
            let mut next = prev.plus_seconds(self.step_seconds);
            if next > until {
                next = until;
            }

            let above = self.above(next);
            if above == rising && prev_above != rising {
                return Some(self.refine_crossing(prev, next, rising));
            }

            prev = next;
            prev_above = above;
        }

        None
    }

    /// Binary search inside a bracket whose ends straddle the threshold.
    /// Returns the end on the far side of the crossing: the first instant
    /// above for a rise, the first instant below for a set.
    fn refine_crossing(&self, before: JulianDate, after: JulianDate, rising: bool) -> JulianDate {
        let mut low = before;
        let mut high = after;

        while high.seconds_since(low) > REFINE_TOLERANCE_SECONDS {
            let mid = JulianDate((low.days() + high.days()) / 2.0);
            if self.above(mid) == rising {
                high = mid;
            } else {
                low = mid;
            }
        }

        high
    }

    fn describe(&self, aos: JulianDate, los: JulianDate) -> PassWindow {
        let (tca, max_elevation) = self.culmination(aos, los);
        PassWindow {
            norad_id: self.elements.norad_id(),
            aos,
            los,
            tca,
            max_elevation,
            aos_azimuth: observe_at(self.observer, self.elements, aos).azimuth,
            los_azimuth: observe_at(self.observer, self.elements, los).azimuth,
        }
    }

    /// Time and value of maximum elevation between `aos` and `los`.
    fn culmination(&self, aos: JulianDate, los: JulianDate) -> (JulianDate, f64) {
        let elevation = |t: JulianDate| {
            let el = elevation_at(self.observer, self.elements, t);
            if el.is_finite() {
                el
            } else {
                f64::NEG_INFINITY
            }
        };

        let sample_step = (self.step_seconds / 4.0).max(MIN_COARSE_STEP_SECONDS);
        let mut best = aos;
        let mut best_el = elevation(aos);
        let mut cursor = aos;
        while cursor < los {
            cursor = cursor.plus_seconds(sample_step);
            if cursor > los {
                cursor = los;
            }
            let el = elevation(cursor);
            if el > best_el {
                best = cursor;
                best_el = el;
            }
        }

        let mut low = JulianDate(best.plus_seconds(-sample_step).days().max(aos.days()));
        let mut high = JulianDate(best.plus_seconds(sample_step).days().min(los.days()));
        while high.seconds_since(low) > REFINE_TOLERANCE_SECONDS {
            let third = high.seconds_since(low) / 3.0;
            let a = low.plus_seconds(third);
            let b = high.plus_seconds(-third);
            if elevation(a) < elevation(b) {
                low = a;
            } else {
                high = b;
            }
        }

        let tca = JulianDate((low.days() + high.days()) / 2.0);
        let tca_el = elevation(tca);
        if tca_el >= best_el {
            (tca, tca_el)
        } else {
            (best, best_el)
        }
    }
}
