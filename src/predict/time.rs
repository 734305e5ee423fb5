use std::fmt;
use std::ops::Sub;

use chrono::{DateTime, Utc};

/// Julian date of the Unix epoch, 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Julian date of J2000.0, 2000-01-01T12:00:00 TT (treated as UTC here).
pub const J2000_JD: f64 = 2_451_545.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const MINUTES_PER_DAY: f64 = 1_440.0;
const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

/// Continuous day count used by every propagation and search routine.
///
/// Holds a standard astronomical Julian date including the fractional day.
/// Nothing below the scheduler reads the wall clock; times enter the
/// prediction code only as `JulianDate`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct JulianDate(pub f64);

impl JulianDate {
    pub fn from_unix_seconds(seconds: f64) -> Self {
        JulianDate(seconds / SECONDS_PER_DAY + UNIX_EPOCH_JD)
    }

    pub fn to_unix_seconds(self) -> f64 {
        (self.0 - UNIX_EPOCH_JD) * SECONDS_PER_DAY
    }

    pub fn from_datetime(datetime: &DateTime<Utc>) -> Self {
        let seconds =
            datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) * 1e-9;
        Self::from_unix_seconds(seconds)
    }

    /// Returns `None` for dates chrono cannot represent (including NaN).
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let seconds = self.to_unix_seconds();
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }

    pub fn days(self) -> f64 {
        self.0
    }

    pub fn plus_seconds(self, seconds: f64) -> Self {
        JulianDate(self.0 + seconds / SECONDS_PER_DAY)
    }

    pub fn plus_days(self, days: f64) -> Self {
        JulianDate(self.0 + days)
    }

    pub fn seconds_since(self, earlier: JulianDate) -> f64 {
        (self.0 - earlier.0) * SECONDS_PER_DAY
    }

    pub fn minutes_since(self, earlier: JulianDate) -> f64 {
        (self.0 - earlier.0) * MINUTES_PER_DAY
    }

    /// Julian years since J2000, the epoch argument `sgp4` expects for sidereal time.
    pub fn julian_years_since_j2000(self) -> f64 {
        (self.0 - J2000_JD) / DAYS_PER_JULIAN_YEAR
    }
}

impl From<DateTime<Utc>> for JulianDate {
    fn from(datetime: DateTime<Utc>) -> Self {
        JulianDate::from_datetime(&datetime)
    }
}

impl Sub for JulianDate {
    type Output = f64;

    /// Difference in days.
    fn sub(self, rhs: JulianDate) -> f64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for JulianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "JD {}", self.0),
        }
    }
}

/// Converts Unix time (whole seconds) to a Julian date.
pub fn to_julian(unix_time: i64) -> JulianDate {
    JulianDate::from_unix_seconds(unix_time as f64)
}

/// Converts a Julian date back to Unix time, rounded to the nearest second.
pub fn from_julian(date: JulianDate) -> i64 {
    date.to_unix_seconds().round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unix_epoch_is_reference_julian_date() {
        assert_eq!(to_julian(0), JulianDate(UNIX_EPOCH_JD));
        assert_eq!(from_julian(JulianDate(UNIX_EPOCH_JD)), 0);
    }

    #[test]
    fn j2000_noon() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let jd = JulianDate::from(j2000);
        assert!((jd.days() - J2000_JD).abs() < 1e-9);
        assert!(jd.julian_years_since_j2000().abs() < 1e-12);
    }

    #[test]
    fn round_trip_whole_seconds() {
        // 1950 through 2100, stepped by an odd stride so every second-of-day gets hit.
        let start = -631_152_000_i64;
        let end = 4_102_444_800_i64;
        let mut t = start;
        while t < end {
            assert_eq!(from_julian(to_julian(t)), t, "round trip failed for {}", t);
            t += 7_919_999;
        }
        for t in [1_222_000_000, 1_700_000_001, 1_700_000_059, 2_000_000_000] {
            assert_eq!(from_julian(to_julian(t)), t);
        }
    }

    #[test]
    fn datetime_round_trip_keeps_subseconds() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 15).unwrap()
            + chrono::Duration::milliseconds(250);
        let back = JulianDate::from(dt).to_datetime().unwrap();
        assert!((back - dt).num_milliseconds().abs() <= 1);
    }

    #[test]
    fn arithmetic() {
        let t = to_julian(1_000_000);
        assert!((t.plus_seconds(90.0).seconds_since(t) - 90.0).abs() < 1e-4);
        assert!((t.plus_days(0.5) - t - 0.5).abs() < 1e-9);
        assert!((t.plus_days(1.0).minutes_since(t) - 1440.0).abs() < 1e-5);
        assert!(t.plus_seconds(1.0) > t);
    }

    #[test]
    fn nan_has_no_datetime() {
        assert!(JulianDate(f64::NAN).to_datetime().is_none());
    }
}
