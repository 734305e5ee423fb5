pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;

// WGS-84
const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const EARTH_ECCENTRICITY_SQUARED: f64 = 0.00669437999014;

/// Geodetic observer location. Latitude and longitude in radians (east positive),
/// altitude in meters above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

impl Default for Observer {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude_m: 0.0,
        }
    }
}

impl Observer {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude_m,
        }
    }

    pub fn from_degrees(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self::new(latitude_deg.to_radians(), longitude_deg.to_radians(), altitude_m)
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude.to_degrees()
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude.to_degrees()
    }

    /// Position in an Earth-centered frame rotated by `theta`, the local
    /// sidereal angle (GMST + longitude). With `theta` equal to the longitude
    /// this is plain ECEF.
    pub fn position_km(&self, theta: f64) -> [f64; 3] {
        let sin_lat = self.latitude.sin();
        let cos_lat = self.latitude.cos();
        let n = EARTH_EQUATORIAL_RADIUS_KM
            / (1.0 - EARTH_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * theta.cos(),
            (n + alt_km) * cos_lat * theta.sin(),
            (n * (1.0 - EARTH_ECCENTRICITY_SQUARED) + alt_km) * sin_lat,
        ]
    }

    /// Inertial velocity due to Earth rotation, for the same `theta`.
    pub fn velocity_km_s(&self, theta: f64) -> [f64; 3] {
        let pos = self.position_km(theta);
        [
            -EARTH_ROTATION_RAD_S * pos[1],
            EARTH_ROTATION_RAD_S * pos[0],
            0.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Observer {
        fn ecef(&self) -> [f64; 3] {
            self.position_km(self.longitude)
        }
    }

    #[test]
    fn equator_prime_meridian() {
        let obs = Observer::default();
        let p = obs.ecef();
        assert!((p[0] - 6378.137).abs() < 1e-9);
        assert!(p[1].abs() < 1e-9);
        assert!(p[2].abs() < 1e-9);
    }

    #[test]
    fn pole_uses_polar_radius() {
        let obs = Observer::from_degrees(90.0, 0.0, 0.0);
        let p = obs.ecef();
        assert!((p[2] - 6356.752).abs() < 0.01, "z {}", p[2]);
    }

    #[test]
    fn altitude_raises_position() {
        let low = Observer::from_degrees(45.0, 10.0, 0.0).ecef();
        let high = Observer::from_degrees(45.0, 10.0, 1000.0).ecef();
        let r = |p: [f64; 3]| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        assert!((r(high) - r(low) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_velocity_at_equator() {
        let v = Observer::default().velocity_km_s(0.0);
        assert!(v[0].abs() < 1e-12);
        assert!((v[1] - 0.4651).abs() < 1e-3);
    }
}
