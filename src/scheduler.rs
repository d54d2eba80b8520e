//! Day/night schedule calculations for the capture loop.
//!
//! This module turns one calendar day's sunrise and sunset into an ordered list of
//! ON/OFF transitions and answers the two questions the wake loop asks:
//!
//! - **State Detection**: is the station ON or OFF at instant `T`?
//! - **Next Wake**: when is the next ON transition strictly after `T`, rolling over
//!   into the following day when today's window has already passed?
//!
//! Schedules are rebuilt from the solar source on every query and never cached.
//!
//! ## Day/night policy
//! - A normal day is `[(sunrise, ON), (sunset, OFF)]`.
//! - State at `T` only consults `T`'s own calendar day; before sunrise it is OFF.
//! - At the sunrise instant the state is ON, at the sunset instant it is OFF.
//! - A polar day (midnight sun) is ON from local midnight; a polar night is OFF
//!   from local midnight.

use anyhow::Result;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::fmt;

use crate::geo::{Location, SolarError, SolarEventSource, SpaSource, start_of_local_day};

/// Whether the station should be capturing.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ScheduleState {
    On,  // Daylight, capture images
    Off, // Night, stay dormant
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleState::On => write!(f, "ON"),
            ScheduleState::Off => write!(f, "OFF"),
        }
    }
}

/// "The state becomes `state` at `time`."
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct ScheduleEvent {
    pub time: DateTime<Tz>,
    pub state: ScheduleState,
}

/// The ordered transitions of one calendar date.
#[derive(Debug, PartialEq, Clone)]
pub struct ScheduleDay {
    date: NaiveDate,
    events: Vec<ScheduleEvent>,
}

impl ScheduleDay {
    /// Build a day from its transitions; they are kept sorted by instant.
    pub fn new(date: NaiveDate, mut events: Vec<ScheduleEvent>) -> Self {
        events.sort_by_key(|event| event.time);
        Self { date, events }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    /// State introduced by the last event at or before `instant`, OFF if there is none.
    pub fn state_at(&self, instant: &DateTime<Tz>) -> ScheduleState {
        self.events
            .iter()
            .filter(|event| event.time <= *instant)
            .last()
            .map(|event| event.state)
            .unwrap_or(ScheduleState::Off)
    }

    /// First ON transition strictly after `instant`.
    pub fn next_on_after(&self, instant: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.events
            .iter()
            .find(|event| event.state == ScheduleState::On && event.time > *instant)
            .map(|event| event.time)
    }
}

/// Failures of the scheduling queries.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// The solar source produced no usable events for this date.
    UpstreamComputation { date: NaiveDate, reason: String },
    /// Neither this day nor the next holds an ON transition after `after`.
    NoUpcomingOnTime { after: DateTime<Tz> },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::UpstreamComputation { date, reason } => {
                write!(f, "Could not compute the schedule for {}: {}", date, reason)
            }
            SchedulerError::NoUpcomingOnTime { after } => write!(
                f,
                "No ON time within two days after {}. Check the configured coordinates",
                after.format("%Y-%m-%d %H:%M:%S %Z")
            ),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Computes day/night schedules for a fixed station.
///
/// Generic over the solar source so tests can substitute fixed sunrise/sunset times.
pub struct DayScheduler<S = SpaSource> {
    location: Location,
    timezone: Tz,
    source: S,
}

impl DayScheduler<SpaSource> {
    /// Scheduler backed by the SPA solar algorithm.
    pub fn new(location: Location, timezone: Tz) -> Self {
        Self::with_source(location, timezone, SpaSource)
    }
}

impl<S: SolarEventSource> DayScheduler<S> {
    pub fn with_source(location: Location, timezone: Tz, source: S) -> Self {
        Self {
            location,
            timezone,
            source,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Transitions for `date`.
    ///
    /// # Returns
    /// - `[(sunrise, ON), (sunset, OFF)]` on a normal day
    /// - `[(midnight, ON)]` on a polar day, `[(midnight, OFF)]` on a polar night
    /// - `SchedulerError::UpstreamComputation` if the solar source fails
    pub fn get_schedule(&self, date: NaiveDate) -> Result<ScheduleDay> {
        let events = match self.source.sun_events(&self.location, date, self.timezone) {
            Ok(sun) => vec![
                ScheduleEvent {
                    time: sun.sunrise,
                    state: ScheduleState::On,
                },
                ScheduleEvent {
                    time: sun.sunset,
                    state: ScheduleState::Off,
                },
            ],
            Err(SolarError::PolarDay) => vec![ScheduleEvent {
                time: start_of_local_day(self.timezone, date),
                state: ScheduleState::On,
            }],
            Err(SolarError::PolarNight) => vec![ScheduleEvent {
                time: start_of_local_day(self.timezone, date),
                state: ScheduleState::Off,
            }],
            Err(e @ SolarError::Computation(_)) => {
                return Err(SchedulerError::UpstreamComputation {
                    date,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        Ok(ScheduleDay::new(date, events))
    }

    /// State at `instant`, judged against that instant's own calendar day only.
    pub fn get_state(&self, instant: &DateTime<Tz>) -> Result<ScheduleState> {
        let local = instant.with_timezone(&self.timezone);
        let schedule = self.get_schedule(local.date_naive())?;
        Ok(schedule.state_at(&local))
    }

    /// The next ON transition strictly after `instant`.
    ///
    /// Looks through `instant`'s calendar day, then the following one. Finding
    /// nothing in either is a `SchedulerError::NoUpcomingOnTime`.
    pub fn get_next_on_time(&self, instant: &DateTime<Tz>) -> Result<DateTime<Tz>> {
        let local = instant.with_timezone(&self.timezone);
        let today = local.date_naive();

        if let Some(next_on) = self.get_schedule(today)?.next_on_after(&local) {
            return Ok(next_on);
        }

        if let Some(tomorrow) = today.succ_opt() {
            if let Some(next_on) = self.get_schedule(tomorrow)?.next_on_after(&local) {
                return Ok(next_on);
            }
        }

        Err(SchedulerError::NoUpcomingOnTime { after: local }.into())
    }
}
