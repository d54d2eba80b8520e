use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use proptest::prelude::*;

use suncam::geo::{Location, SolarError, SolarEventSource, SunEvents, timezone_for_coordinates};
use suncam::scheduler::{DayScheduler, ScheduleState};

/// Sunrise 06:00, sunset 18:00 on every date.
struct EquinoxSource;

impl SolarEventSource for EquinoxSource {
    fn sun_events(
        &self,
        _location: &Location,
        date: NaiveDate,
        timezone: Tz,
    ) -> Result<SunEvents, SolarError> {
        let at = |h| {
            timezone
                .from_local_datetime(&date.and_time(NaiveTime::from_hms_opt(h, 0, 0).unwrap()))
                .unwrap()
        };
        Ok(SunEvents {
            sunrise: at(6),
            sunset: at(18),
        })
    }
}

/// Generate instants across two years, to the second
fn instant_strategy() -> impl Strategy<Value = DateTime<Tz>> {
    (0i64..730, 0i64..86400).prop_map(|(day, second)| {
        let start = chrono_tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        start + TimeDelta::days(day) + TimeDelta::seconds(second)
    })
}

/// Latitudes and longitudes with an ordinary day/night cycle all year
fn temperate_location_strategy() -> impl Strategy<Value = (f64, f64)> {
    (-55.0..55.0, -180.0..180.0)
}

#[cfg(test)]
mod scripted_schedule_tests {
    use super::*;

    fn scheduler() -> DayScheduler<EquinoxSource> {
        let location = Location::new(0.0, 0.0).unwrap();
        DayScheduler::with_source(location, chrono_tz::UTC, EquinoxSource)
    }

    proptest! {
        /// The next ON is exactly the nearest 06:00 strictly after T
        #[test]
        fn test_next_on_is_nearest_sunrise(t in instant_strategy()) {
            let next = scheduler().get_next_on_time(&t).unwrap();

            let six = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
            let today_sunrise = chrono_tz::UTC
                .from_local_datetime(&t.date_naive().and_time(six))
                .unwrap();
            let expected = if t < today_sunrise {
                today_sunrise
            } else {
                today_sunrise + TimeDelta::days(1)
            };

            prop_assert_eq!(next, expected);
            prop_assert!(next > t);
        }

        /// ON exactly during [06:00, 18:00)
        #[test]
        fn test_state_matches_daylight_window(t in instant_strategy()) {
            let state = scheduler().get_state(&t).unwrap();
            let seconds = t.time().signed_duration_since(NaiveTime::MIN).num_seconds();
            let daylight = (6 * 3600..18 * 3600).contains(&seconds);

            prop_assert_eq!(state == ScheduleState::On, daylight);
        }
    }
}

#[cfg(test)]
mod solar_schedule_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// The next ON is always in the future and never more than two days away
        #[test]
        fn test_next_on_is_strictly_later(
            (lat, lon) in temperate_location_strategy(),
            t in instant_strategy()
        ) {
            let timezone = timezone_for_coordinates(lat, lon);
            let scheduler = DayScheduler::new(Location::new(lat, lon).unwrap(), timezone);
            let t = t.with_timezone(&timezone);

            let next = scheduler.get_next_on_time(&t).unwrap();
            prop_assert!(next > t);
            prop_assert!(next - t <= TimeDelta::hours(48));
        }

        /// State agrees with the day's own sunrise and sunset
        #[test]
        fn test_state_consistent_with_schedule(
            (lat, lon) in temperate_location_strategy(),
            t in instant_strategy()
        ) {
            let timezone = timezone_for_coordinates(lat, lon);
            let scheduler = DayScheduler::new(Location::new(lat, lon).unwrap(), timezone);
            let t = t.with_timezone(&timezone);

            let schedule = scheduler.get_schedule(t.date_naive()).unwrap();
            let events = schedule.events();
            prop_assert_eq!(events.len(), 2);
            prop_assert!(events[0].time < events[1].time);

            let expected = if events[0].time <= t && t < events[1].time {
                ScheduleState::On
            } else {
                ScheduleState::Off
            };
            prop_assert_eq!(scheduler.get_state(&t).unwrap(), expected);
        }

        /// Sunrise is reported on the requested civil day, whatever the zone's offset
        #[test]
        fn test_sunrise_on_requested_local_day(
            (lat, lon) in temperate_location_strategy(),
            day in 0i64..730
        ) {
            let timezone = timezone_for_coordinates(lat, lon);
            let scheduler = DayScheduler::new(Location::new(lat, lon).unwrap(), timezone);
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + TimeDelta::days(day);

            let schedule = scheduler.get_schedule(date).unwrap();
            prop_assert_eq!(schedule.events()[0].time.date_naive(), date);
            prop_assert_eq!(schedule.events()[0].state, ScheduleState::On);
        }

        /// Schedules do not change between calls
        #[test]
        fn test_schedule_is_idempotent(
            (lat, lon) in temperate_location_strategy(),
            day in 0i64..730
        ) {
            let timezone = timezone_for_coordinates(lat, lon);
            let scheduler = DayScheduler::new(Location::new(lat, lon).unwrap(), timezone);
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + TimeDelta::days(day);

            prop_assert_eq!(
                scheduler.get_schedule(date).unwrap(),
                scheduler.get_schedule(date).unwrap()
            );
        }
    }
}
