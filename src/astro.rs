//! Sunrise and sunset computation for a fixed coordinate.
//!
//! Implements the NOAA solar-position method: given a UTC calendar date and
//! a geographic coordinate it yields the day's sunrise and sunset instants,
//! rounded to whole minutes. Pure arithmetic, no I/O; callers inject `now`
//! when they need the daylight flag, which keeps the boundary testable.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// Solar zenith at sunrise/sunset, including refraction and solar radius.
const ZENITH_DEG: f64 = 90.833;

#[derive(Debug, Error, PartialEq)]
pub enum AstroError {
    #[error("latitude {0} outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    InvalidLongitude(f64),
    /// Polar day or polar night: the sun never crosses the horizon today.
    #[error("no sunrise/sunset at this latitude on this date")]
    NoHorizonCrossing,
}

/// Today's sunrise and sunset, whole-minute precision, seconds zeroed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl SunTimes {
    /// Whether `now` falls in the daylight window.
    ///
    /// Inclusive at sunrise, exclusive at sunset: the instant of sunset is
    /// already night.
    pub fn is_daylight(&self, now: DateTime<Utc>) -> bool {
        now >= self.sunrise && now < self.sunset
    }
}

/// Compute sunrise and sunset for `date` at the given coordinate.
pub fn sun_times(date: NaiveDate, latitude: f64, longitude: f64) -> Result<SunTimes, AstroError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AstroError::InvalidLatitude(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AstroError::InvalidLongitude(longitude));
    }

    let jc = julian_century(date);

    let geom_mean_long = (280.46646 + jc * (36000.76983 + 0.0003032 * jc)).rem_euclid(360.0);
    let geom_mean_anom = 357.52911 + jc * (35999.05029 - 0.0001537 * jc);
    let eccentricity = 0.016708634 - jc * (0.000042037 + 0.0000001267 * jc);

    let eq_of_center = geom_mean_anom.to_radians().sin()
        * (1.914602 - jc * (0.004817 + 0.000014 * jc))
        + (2.0 * geom_mean_anom).to_radians().sin() * (0.019993 - 0.000101 * jc)
        + (3.0 * geom_mean_anom).to_radians().sin() * 0.000289;

    let true_long = geom_mean_long + eq_of_center;
    let omega = 125.04 - 1934.136 * jc;
    let apparent_long = true_long - 0.00569 - 0.00478 * omega.to_radians().sin();

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813))) / 60.0) / 60.0;
    let obliquity = mean_obliquity + 0.00256 * omega.to_radians().cos();

    let declination = (obliquity.to_radians().sin() * apparent_long.to_radians().sin())
        .asin()
        .to_degrees();

    // Equation of time, in minutes.
    let var_y = (obliquity / 2.0).to_radians().tan().powi(2);
    let eq_of_time = 4.0
        * (var_y * (2.0 * geom_mean_long).to_radians().sin()
            - 2.0 * eccentricity * geom_mean_anom.to_radians().sin()
            + 4.0
                * eccentricity
                * var_y
                * geom_mean_anom.to_radians().sin()
                * (2.0 * geom_mean_long).to_radians().cos()
            - 0.5 * var_y * var_y * (4.0 * geom_mean_long).to_radians().sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * geom_mean_anom).to_radians().sin())
        .to_degrees();

    let cos_hour_angle = ZENITH_DEG.to_radians().cos()
        / (latitude.to_radians().cos() * declination.to_radians().cos())
        - latitude.to_radians().tan() * declination.to_radians().tan();
    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return Err(AstroError::NoHorizonCrossing);
    }
    let hour_angle = cos_hour_angle.acos().to_degrees();

    // Minutes past UTC midnight.
    let solar_noon = 720.0 - 4.0 * longitude - eq_of_time;
    let sunrise_min = (solar_noon - 4.0 * hour_angle).round() as i64;
    let sunset_min = (solar_noon + 4.0 * hour_angle).round() as i64;

    let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    Ok(SunTimes {
        sunrise: midnight + Duration::minutes(sunrise_min),
        sunset: midnight + Duration::minutes(sunset_min),
    })
}

/// Julian centuries since J2000 for the civil date, at noon UT.
fn julian_century(date: NaiveDate) -> f64 {
    let y = i64::from(date.year());
    let m = i64::from(date.month());
    let d = i64::from(date.day());

    let a = (14 - m) / 12;
    let y2 = y + 4800 - a;
    let m2 = m + 12 * a - 3;
    let jdn = d + (153 * m2 + 2) / 5 + 365 * y2 + y2 / 4 - y2 / 100 + y2 / 400 - 32045;

    (jdn as f64 - 2_451_545.0) / 36_525.0
}
