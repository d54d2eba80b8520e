//! # Suncam
//!
//! A sunrise-to-sunset photo capture scheduler for fixed-location camera stations.
//!
//! Suncam works out from the station's coordinates when the sun is up, captures an
//! image at a fixed interval through the day, uploads pending images to object
//! storage, and sleeps through the night in bounded chunks so it never oversleeps
//! past sunrise.
//!
//! ## Architecture
//!
//! - **args**: Command-line parsing
//! - **camera**: Capture backends (libcamera and a debug stand-in)
//! - **config**: Configuration loading, validation, and template generation
//! - **constants**: Application-wide constants and defaults
//! - **driver**: The wake loop alternating between sleeping and capturing
//! - **geo**: Station location, timezone detection, and sunrise/sunset computation
//! - **images**: Pending image store, naming, and upload bookkeeping
//! - **lock**: Single-instance lock file
//! - **logger**: Structured logging with visual formatting and a log file
//! - **power**: CPU governor control
//! - **scheduler**: Day/night schedules, state detection, and next-wake calculation
//! - **time_source**: Clock abstraction for real and simulated time
//! - **upload**: Object storage uploaders

pub mod args;
pub mod camera;
pub mod config;
pub mod constants;
pub mod driver;
pub mod geo;
pub mod images;
pub mod lock;
pub mod logger;
pub mod power;
pub mod scheduler;
pub mod time_source;
pub mod upload;

// Re-export important types for easier access
pub use config::Config;
pub use driver::{Devices, LoopPhase, LoopSettings, WakeLoop};
pub use geo::Location;
pub use logger::{Log, LogLevel};
pub use scheduler::{DayScheduler, ScheduleDay, ScheduleEvent, ScheduleState, SchedulerError};
