//! The wake loop: sleep through the night, capture through the day.
//!
//! The loop alternates between two phases:
//!
//! - **Sleeping**: work out the next ON instant and sleep towards it in chunks of
//!   at most `sleep_interval`, re-checking the schedule after every chunk. A clock
//!   jump, a DST shift or a restart therefore never makes the station oversleep
//!   by more than one chunk.
//! - **Capturing**: take one image, upload whatever is pending, then wait one
//!   `capture_interval` before checking whether the sun has set.
//!
//! Hardware and network failures are logged and the loop carries on; they never
//! end the process. A schedule that finds no sunrise within two days does.

use anyhow::Result;
use chrono::{DateTime, Local, TimeDelta};
use chrono_tz::Tz;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::camera::Camera;
use crate::geo::SolarEventSource;
use crate::images::ImageStore;
use crate::logger::Log;
use crate::power::{GovernorMode, PowerControl};
use crate::scheduler::{DayScheduler, SchedulerError, ScheduleState};
use crate::time_source::TimeSource;
use crate::upload::Uploader;

/// Which half of the day/night cycle the loop is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Sleeping,
    Capturing,
}

impl From<ScheduleState> for LoopPhase {
    fn from(state: ScheduleState) -> Self {
        match state {
            ScheduleState::On => LoopPhase::Capturing,
            ScheduleState::Off => LoopPhase::Sleeping,
        }
    }
}

/// Timing knobs for the loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Wait between two daytime captures.
    pub capture_interval: Duration,
    /// Longest single sleep while waiting for sunrise.
    pub sleep_interval: Duration,
    /// Load camera drivers before each capture and unload them after.
    pub power_cycle_camera: bool,
    /// Set when running with stand-in hardware; only affects log output.
    pub debug: bool,
}

/// The side-effecting collaborators the loop drives.
pub struct Devices {
    pub camera: Box<dyn Camera>,
    pub uploader: Box<dyn Uploader>,
    pub power: Box<dyn PowerControl>,
}

/// Drives a station through sleep and capture cycles until `running` is cleared.
pub struct WakeLoop<S: SolarEventSource, C: TimeSource> {
    scheduler: DayScheduler<S>,
    devices: Devices,
    store: ImageStore,
    clock: C,
    bucket: String,
    settings: LoopSettings,
    running: Arc<AtomicBool>,
}

impl<S: SolarEventSource, C: TimeSource> WakeLoop<S, C> {
    pub fn new(
        scheduler: DayScheduler<S>,
        devices: Devices,
        store: ImageStore,
        clock: C,
        bucket: String,
        settings: LoopSettings,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            scheduler,
            devices,
            store,
            clock,
            bucket,
            settings,
            running,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until shutdown is requested.
    ///
    /// # Returns
    /// - `Ok(())` once the running flag has been cleared
    /// - `Err` only for scheduling failures that cannot resolve themselves
    ///   (no sunrise within two days)
    pub fn run(&mut self) -> Result<()> {
        Log::log_block_start(&format!(
            "Wake loop started at {} ({})",
            self.scheduler.location(),
            self.scheduler.timezone()
        ));
        if self.settings.debug {
            Log::log_indented("Debug mode: no hardware or network access");
        }
        self.set_governor(GovernorMode::Ondemand);

        let now = self.clock.now();
        let mut phase = match self.recoverable(self.scheduler.get_state(&now))? {
            Some(state) => LoopPhase::from(state),
            None => LoopPhase::Sleeping,
        };

        while self.is_running() {
            self.rotate_log();
            phase = match phase {
                LoopPhase::Sleeping => self.sleep_until_on()?,
                LoopPhase::Capturing => self.capture_cycle()?,
            };
        }

        Log::log_block_start("Wake loop stopped");
        Ok(())
    }

    /// Downgrade upstream solar failures to a logged `None`; anything else is fatal.
    fn recoverable<T>(&self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) => match e.downcast_ref::<SchedulerError>() {
                Some(SchedulerError::UpstreamComputation { .. }) => {
                    Log::log_error(&format!("{}. Retrying later", e));
                    Ok(None)
                }
                _ => Err(e),
            },
        }
    }

    /// Start a fresh log file once the current one holds a week of entries.
    fn rotate_log(&self) {
        let now = self.clock.now().with_timezone(&Local).naive_local();
        match Log::rotate_if_due(now) {
            Ok(true) => Log::log_decorated("Rotated log file"),
            Ok(false) => {}
            Err(e) => Log::log_warning(&format!("Could not rotate log file: {:#}", e)),
        }
    }

    fn set_governor(&self, mode: GovernorMode) {
        if let Err(e) = self.devices.power.set_governor(mode) {
            Log::log_warning(&format!(
                "Could not set CPU governor to {}: {:#}",
                mode.as_str(),
                e
            ));
        }
    }

    /// One sleeping phase: wait in bounded chunks until the next ON instant.
    ///
    /// Returns `Capturing` once the schedule reports ON, `Sleeping` if the wait was
    /// cut short (shutdown or a failed solar computation).
    pub fn sleep_until_on(&mut self) -> Result<LoopPhase> {
        let now = self.clock.now();
        let Some(next_on) = self.recoverable(self.scheduler.get_next_on_time(&now))? else {
            self.clock.sleep(self.settings.sleep_interval);
            return Ok(LoopPhase::Sleeping);
        };

        Log::log_block_start(&format!(
            "Night: next capture window opens {}",
            format_instant(&next_on)
        ));

        let chunk = TimeDelta::from_std(self.settings.sleep_interval).unwrap_or(TimeDelta::MAX);
        let mut remaining = next_on - now;

        while remaining > chunk {
            if !self.is_running() {
                return Ok(LoopPhase::Sleeping);
            }

            Log::log_debug(&format!(
                "Sleeping {}s, {}s to go",
                chunk.num_seconds(),
                remaining.num_seconds()
            ));
            self.clock.sleep(self.settings.sleep_interval);

            let now = self.clock.now();
            match self.recoverable(self.scheduler.get_state(&now))? {
                Some(ScheduleState::On) => {
                    Log::log_decorated("Daylight reached early");
                    return Ok(LoopPhase::Capturing);
                }
                Some(ScheduleState::Off) => {}
                None => {
                    remaining -= chunk;
                    continue;
                }
            }

            remaining = match self.recoverable(self.scheduler.get_next_on_time(&now))? {
                Some(next_on) => next_on - now,
                None => remaining - chunk,
            };
        }

        if !self.is_running() {
            return Ok(LoopPhase::Sleeping);
        }
        if let Ok(last) = remaining.to_std() {
            if !last.is_zero() {
                self.clock.sleep(last);
            }
        }

        let now = self.clock.now();
        Ok(match self.recoverable(self.scheduler.get_state(&now))? {
            Some(state) => LoopPhase::from(state),
            None => LoopPhase::Sleeping,
        })
    }

    /// One daytime cycle: capture, upload what is pending, wait, re-check.
    pub fn capture_cycle(&mut self) -> Result<LoopPhase> {
        let now = self.clock.now();
        Log::log_block_start(&format!("Day: capturing at {}", format_instant(&now)));

        self.capture(&now);
        // Runs even when the capture failed, older images may still be waiting
        self.upload(&now);

        self.clock.sleep(self.settings.capture_interval);

        let now = self.clock.now();
        Ok(match self.recoverable(self.scheduler.get_state(&now))? {
            Some(ScheduleState::On) | None => LoopPhase::Capturing,
            Some(ScheduleState::Off) => {
                Log::log_decorated("Sunset reached, stopping captures");
                LoopPhase::Sleeping
            }
        })
    }

    fn capture(&mut self, now: &DateTime<Tz>) {
        let path = self.store.pending_image_path(now);
        let power_cycle = self.settings.power_cycle_camera;
        let camera = &mut self.devices.camera;

        if power_cycle {
            if let Err(e) = camera.power_on() {
                Log::log_warning(&format!("Could not power on camera: {:#}", e));
            }
        }

        // The camera is mounted upside down
        match camera.capture_image(&path, true, false) {
            Ok(()) => Log::log_decorated(&format!("Captured {}", path.display())),
            Err(e) => {
                Log::log_error(&format!("Capture failed: {:#}", e));
                // A half-written image must not reach the bucket
                if path.exists() {
                    if let Err(e) = fs::remove_file(&path) {
                        Log::log_warning(&format!(
                            "Could not remove partial image {}: {}",
                            path.display(),
                            e
                        ));
                    }
                }
            }
        }

        if power_cycle {
            if let Err(e) = camera.power_off() {
                Log::log_warning(&format!("Could not power off camera: {:#}", e));
            }
        }
    }

    fn upload(&self, now: &DateTime<Tz>) {
        let pending = match self.store.list_pending() {
            Ok(pending) => pending,
            Err(e) => {
                Log::log_error(&format!("Could not list pending images: {:#}", e));
                return;
            }
        };

        if !pending.is_empty() {
            self.set_governor(GovernorMode::Performance);
            match self
                .store
                .upload_pending(self.devices.uploader.as_ref(), &self.bucket, now.date_naive())
            {
                Ok(summary) if summary.failed > 0 => Log::log_warning(&format!(
                    "{} upload(s) failed, {} succeeded",
                    summary.failed, summary.uploaded
                )),
                Ok(_) => {}
                Err(e) => Log::log_error(&format!("Upload pass failed: {:#}", e)),
            }
            self.set_governor(GovernorMode::Ondemand);
        }
    }
}

fn format_instant(instant: &DateTime<Tz>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}
