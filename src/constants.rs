//! Application constants and default values for suncam.
//!
//! This module contains the configuration defaults, validation limits,
//! file naming pieces and operational constants used throughout the application.

use crate::camera::CameraKind;

// ═══ Application Configuration Defaults ═══
// These values are used when config options are not specified by the user

pub const DEFAULT_CAPTURE_INTERVAL: u64 = 10800; // seconds - three hours between daytime captures
pub const DEFAULT_SLEEP_INTERVAL: u64 = 300; // seconds - longest single sleep while waiting for sunrise
pub const DEFAULT_CAMERA: CameraKind = CameraKind::Libcamera;
pub const DEFAULT_IMAGE_WIDTH: u32 = 1024; // pixels
pub const DEFAULT_IMAGE_HEIGHT: u32 = 768; // pixels
pub const DEFAULT_IMAGE_QUALITY: u8 = 95; // JPEG quality (1-100)
pub const DEFAULT_DELETE_CACHE: bool = true; // drop local copies even when an upload fails
pub const DEFAULT_POWER_CYCLE_CAMERA: bool = false; // keep camera drivers loaded between captures
pub const APP_DIR_NAME: &str = "suncam";
pub const CONFIG_FILE_NAME: &str = "suncam.toml";

// ═══ Validation Limits ═══
// These limits keep user inputs within ranges the device can actually honour

// Capture interval limits
pub const MINIMUM_CAPTURE_INTERVAL: u64 = 10; // seconds (the camera needs a few seconds per still)
pub const MAXIMUM_CAPTURE_INTERVAL: u64 = 86400; // seconds (one capture per day)

// Sleep interval limits
pub const MINIMUM_SLEEP_INTERVAL: u64 = 1; // seconds
pub const MAXIMUM_SLEEP_INTERVAL: u64 = 3600; // seconds (wake at least hourly to re-check the clock)

// Image limits
pub const MINIMUM_IMAGE_DIMENSION: u32 = 64;
pub const MAXIMUM_IMAGE_DIMENSION: u32 = 8192;
pub const MINIMUM_IMAGE_QUALITY: u8 = 1;
pub const MAXIMUM_IMAGE_QUALITY: u8 = 100;

// ═══ Artifact Naming ═══
// Station file names look like CARGN_SE_01_PCAM_E_20250606_120000.jpg

pub const COMPOUND_ID: &str = "01";
pub const SENSOR_TYPE: &str = "PCAM";
pub const IMAGE_EXTENSION: &str = "jpg";
pub const IMAGE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const PARTITION_DATE_FORMAT: &str = "%Y-%m-%d";
pub const PENDING_DIR_NAME: &str = "pending_uploads";
pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_FILE_NAME: &str = "suncam.log";
pub const LOCK_FILE_NAME: &str = "suncam.lock";

// ═══ External Commands ═══

pub const LIBCAMERA_COMMAND: &str = "libcamera-still";
pub const AWS_COMMAND: &str = "aws";
pub const S3_STORAGE_CLASS: &str = "STANDARD";
pub const CAMERA_KERNEL_MODULES: [&str; 2] = ["bcm2835-isp", "bcm2835-v4l2"]; // load order
pub const CAMERA_MODULE_SYSFS: &str = "/sys/module/bcm2835_v4l2";
pub const CPU_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

// ═══ Environment Variables ═══

pub const BUCKET_ENV_VAR: &str = "AWS_BUCKET_NAME";

// ═══ Operational Timing Constants ═══

pub const CHECK_INTERVAL_SECS: u64 = 1; // How often to check the running flag during sleep
pub const LOG_ROTATION_DAYS: u64 = 7; // Rotate the log file weekly
pub const LOG_BACKUP_COUNT: u32 = 4; // Keep four weeks of old logs

// ═══ Exit Codes ═══

pub const EXIT_FAILURE: i32 = 1; // General failure
