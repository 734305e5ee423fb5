use crate::predict::time::JulianDate;

/// A predicted satellite pass. Angles in radians.
///
/// When the satellite is already above the threshold at the search start,
/// `aos` is the search start itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassWindow {
    pub norad_id: u64,
    pub aos: JulianDate,
    pub los: JulianDate,
    pub tca: JulianDate,
    pub max_elevation: f64,
    pub aos_azimuth: f64,
    pub los_azimuth: f64,
}

impl PassWindow {
    pub fn duration_seconds(&self) -> f64 {
        self.los.seconds_since(self.aos)
    }

    pub fn midpoint(&self) -> JulianDate {
        JulianDate((self.aos.days() + self.los.days()) / 2.0)
    }

    pub fn contains(&self, time: JulianDate) -> bool {
        self.aos <= time && time < self.los
    }
}
