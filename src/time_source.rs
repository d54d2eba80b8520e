//! Clock abstraction for the wake loop.
//!
//! The loop only ever asks for "now" and "sleep for this long". Routing both through
//! [`TimeSource`] lets the real daemon use the system clock while tests drive days of
//! captures in microseconds with [`ManualTimeSource`].

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::constants::CHECK_INTERVAL_SECS;

/// Trait for abstracting time operations.
pub trait TimeSource {
    /// Current instant in the station's timezone.
    fn now(&self) -> DateTime<Tz>;

    /// Sleep for `duration`, or less if shutdown was requested meanwhile.
    fn sleep(&self, duration: Duration);
}

/// Wall clock time, with sleeps that notice shutdown requests.
pub struct SystemTimeSource {
    timezone: Tz,
    running: Arc<AtomicBool>,
}

impl SystemTimeSource {
    pub fn new(timezone: Tz, running: Arc<AtomicBool>) -> Self {
        Self { timezone, running }
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// Sleep in short slices so a signal interrupts a multi-minute wait promptly.
    fn sleep(&self, duration: Duration) {
        let slice = Duration::from_secs(CHECK_INTERVAL_SECS);
        let mut remaining = duration;

        while !remaining.is_zero() && self.running.load(Ordering::SeqCst) {
            let step = remaining.min(slice);
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}

/// Simulated clock that jumps forward on every sleep.
///
/// Records each requested sleep. When a deadline is set, the shared running flag is
/// cleared as soon as simulated time reaches it, which ends the loop under test.
#[cfg(any(test, feature = "testing-support"))]
pub struct ManualTimeSource {
    current: std::sync::Mutex<DateTime<Tz>>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
    deadline: Option<(DateTime<Tz>, Arc<AtomicBool>)>,
}

#[cfg(any(test, feature = "testing-support"))]
impl ManualTimeSource {
    pub fn new(start: DateTime<Tz>) -> Self {
        Self {
            current: std::sync::Mutex::new(start),
            sleeps: std::sync::Mutex::new(Vec::new()),
            deadline: None,
        }
    }

    /// Clear `running` once simulated time reaches `end`.
    pub fn with_deadline(mut self, end: DateTime<Tz>, running: Arc<AtomicBool>) -> Self {
        self.deadline = Some((end, running));
        self
    }

    /// Move the clock without recording a sleep.
    pub fn advance(&self, by: TimeDelta) {
        let mut current = self.current.lock().unwrap();
        *current += by;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    fn check_deadline(&self) {
        if let Some((end, running)) = &self.deadline {
            if *self.current.lock().unwrap() >= *end {
                running.store(false, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(any(test, feature = "testing-support"))]
impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Tz> {
        *self.current.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let step = TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX);
        self.advance(step);
        self.check_deadline();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::TEST_TIMEZONE;
    use chrono::TimeZone;
    use std::time::Instant;

    #[test]
    fn test_manual_source_advances_on_sleep() {
        let start = TEST_TIMEZONE.with_ymd_and_hms(2025, 6, 6, 12, 0, 0).unwrap();
        let clock = ManualTimeSource::new(start);

        clock.sleep(Duration::from_secs(300));
        clock.sleep(Duration::from_secs(60));

        assert_eq!(clock.now(), start + TimeDelta::seconds(360));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(300), Duration::from_secs(60)]
        );
    }

    #[test]
    fn test_manual_source_deadline_clears_running_flag() {
        let start = TEST_TIMEZONE.with_ymd_and_hms(2025, 6, 6, 12, 0, 0).unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let clock = ManualTimeSource::new(start)
            .with_deadline(start + TimeDelta::minutes(10), running.clone());

        clock.sleep(Duration::from_secs(300));
        assert!(running.load(Ordering::SeqCst));
        clock.sleep(Duration::from_secs(300));
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_system_source_reports_station_timezone() {
        let running = Arc::new(AtomicBool::new(true));
        let clock = SystemTimeSource::new(TEST_TIMEZONE, running);
        assert_eq!(clock.now().timezone(), TEST_TIMEZONE);
    }

    #[test]
    fn test_system_sleep_returns_when_stopped() {
        let running = Arc::new(AtomicBool::new(false));
        let clock = SystemTimeSource::new(TEST_TIMEZONE, running);

        let started = Instant::now();
        clock.sleep(Duration::from_secs(3600));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
