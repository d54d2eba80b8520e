//! Geographic location and solar event calculations.
//!
//! This module provides:
//! - [`Location`]: validated station coordinates
//! - Timezone detection from coordinates (used when the config names no timezone)
//! - [`solar`]: sunrise/sunset computation behind the [`SolarEventSource`] trait

pub mod solar;

pub use solar::{SolarError, SolarEventSource, SpaSource, SunEvents};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::fmt;

/// Fixed geographic position of a camera station.
///
/// Immutable once constructed; the constructor rejects coordinates outside
/// the valid latitude/longitude ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Create a location from degrees.
    ///
    /// # Arguments
    /// * `latitude` - Geographic latitude in degrees (-90 to +90)
    /// * `longitude` - Geographic longitude in degrees (-180 to +180)
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!(
                "Invalid latitude: {}. Must be between -90 and 90 degrees",
                latitude
            );
        }
        if !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!(
                "Invalid longitude: {}. Must be between -180 and 180 degrees",
                longitude
            );
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4}°{}, {:.4}°{}",
            self.latitude.abs(),
            if self.latitude >= 0.0 { "N" } else { "S" },
            self.longitude.abs(),
            if self.longitude >= 0.0 { "E" } else { "W" },
        )
    }
}

/// Determine the timezone for given coordinates using precise timezone boundary data.
///
/// Uses the tzf-rs crate for timezone detection based on geographic boundaries.
/// Falls back to `$TZ`, then UTC, when the boundary data names no parseable zone
/// (open ocean, for instance).
pub fn timezone_for_coordinates(latitude: f64, longitude: f64) -> Tz {
    use std::sync::OnceLock;
    use tzf_rs::DefaultFinder;

    // The finder loads the whole boundary set, build it once
    static FINDER: OnceLock<DefaultFinder> = OnceLock::new();
    let finder = FINDER.get_or_init(DefaultFinder::new);

    // Note: tzf-rs uses (longitude, latitude) order
    let tz_name = finder.get_tz_name(longitude, latitude);

    match tz_name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => match std::env::var("TZ") {
            Ok(tz_str) => tz_str.parse().unwrap_or(Tz::UTC),
            Err(_) => Tz::UTC,
        },
    }
}

/// Local midnight at the start of `date`.
///
/// Zones that skip midnight for DST start the day at the first valid instant.
pub fn start_of_local_day(timezone: Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| timezone.from_utc_datetime(&midnight))
}
