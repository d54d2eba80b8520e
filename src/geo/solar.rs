//! Sunrise and sunset calculations for a station location.
//!
//! The scheduler only needs one capability from astronomy: the sunrise and sunset
//! instants of a given calendar date at a given location. [`SolarEventSource`] is
//! that seam, and [`SpaSource`] implements it with the NREL Solar Position
//! Algorithm from the `solar-positioning` crate.
//!
//! Inside the polar circles the sun may not rise or set at all on a given date.
//! Instead of handing back degenerate instants, the source reports those days as
//! [`SolarError::PolarDay`] or [`SolarError::PolarNight`] so the scheduler can
//! apply an explicit policy.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use solar_positioning::{SunriseResult, spa, time::DeltaT};
use std::fmt;

use super::{Location, start_of_local_day};

/// Sun centre altitude at sunrise/sunset, refraction and solar radius included.
const SUNRISE_ELEVATION_DEG: f64 = -0.833;

/// Sunrise and sunset of one calendar date, in the caller's timezone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunEvents {
    pub sunrise: DateTime<Tz>,
    pub sunset: DateTime<Tz>,
}

/// Reasons a source cannot produce a sunrise/sunset pair.
#[derive(Debug, Clone, PartialEq)]
pub enum SolarError {
    /// The sun stays above the horizon for the whole date (midnight sun).
    PolarDay,
    /// The sun stays below the horizon for the whole date.
    PolarNight,
    /// The computation itself failed.
    Computation(String),
}

impl fmt::Display for SolarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolarError::PolarDay => write!(f, "the sun does not set on this date"),
            SolarError::PolarNight => write!(f, "the sun does not rise on this date"),
            SolarError::Computation(reason) => write!(f, "solar computation failed: {}", reason),
        }
    }
}

impl std::error::Error for SolarError {}

/// Anything that can compute a date's sunrise and sunset for a location.
///
/// `date` is a civil date in `timezone`; the returned events belong to that day.
pub trait SolarEventSource {
    fn sun_events(
        &self,
        location: &Location,
        date: NaiveDate,
        timezone: Tz,
    ) -> Result<SunEvents, SolarError>;
}

/// Solar events from the SPA algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaSource;

impl SpaSource {
    /// SPA result for the UTC calendar day `day`, expressed in `timezone`.
    fn utc_day(
        location: &Location,
        day: NaiveDate,
        timezone: Tz,
    ) -> Result<SunriseResult<DateTime<Tz>>, SolarError> {
        let computation = |e: solar_positioning::Error| SolarError::Computation(e.to_string());

        let delta_t = DeltaT::estimate_from_date_like(day).map_err(computation)?;
        let utc_midnight = timezone.from_utc_datetime(&day.and_time(NaiveTime::MIN));

        spa::sunrise_sunset(
            utc_midnight,
            location.latitude(),
            location.longitude(),
            delta_t,
            SUNRISE_ELEVATION_DEG,
        )
        .map_err(computation)
    }
}

impl SolarEventSource for SpaSource {
    fn sun_events(
        &self,
        location: &Location,
        date: NaiveDate,
        timezone: Tz,
    ) -> Result<SunEvents, SolarError> {
        // SPA works in UTC days. A local day in a UTC+14 or UTC-12 zone overlaps
        // three of them, and its sunset may fall on the one after.
        let first = date
            .pred_opt()
            .ok_or_else(|| SolarError::Computation(format!("date {} out of range", date)))?;
        let days = first
            .iter_days()
            .take(4)
            .map(|day| Self::utc_day(location, day, timezone))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sunrises: Vec<DateTime<Tz>> = days.iter().filter_map(|d| d.sunrise().copied()).collect();
        let mut sunsets: Vec<DateTime<Tz>> = days.iter().filter_map(|d| d.sunset().copied()).collect();
        sunrises.sort();
        sunsets.sort();

        let on_date = |instant: &&DateTime<Tz>| instant.date_naive() == date;
        let sunrise = sunrises.iter().find(on_date).copied();
        let sunset = match sunrise {
            Some(rise) => sunsets.iter().find(|set| **set > rise).copied(),
            None => sunsets.iter().find(on_date).copied(),
        };

        match (sunrise, sunset) {
            (Some(sunrise), sunset) => {
                // No sunset within a day means polar day starts tonight
                let sunset = sunset
                    .filter(|set| *set - sunrise < TimeDelta::hours(24))
                    .or_else(|| date.succ_opt().map(|next| start_of_local_day(timezone, next)))
                    .ok_or_else(|| SolarError::Computation(format!("date {} out of range", date)))?;
                Ok(SunEvents { sunrise, sunset })
            }
            // The sun was already up at midnight: polar day ending today
            (None, Some(sunset)) => Ok(SunEvents {
                sunrise: start_of_local_day(timezone, date),
                sunset,
            }),
            (None, None) => {
                let today = days
                    .iter()
                    .find(|d| d.transit().date_naive() == date)
                    .ok_or_else(|| {
                        SolarError::Computation(format!("no solar transit found on {}", date))
                    })?;
                match today {
                    SunriseResult::AllDay { .. } => Err(SolarError::PolarDay),
                    SunriseResult::AllNight { .. } => Err(SolarError::PolarNight),
                    SunriseResult::RegularDay { .. } => Err(SolarError::Computation(format!(
                        "no sunrise or sunset on {} at {}",
                        date, location
                    ))),
                }
            }
        }
    }
}
