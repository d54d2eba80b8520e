//! Configuration system for suncam with validation and timezone resolution.
//!
//! This module loads the station's TOML configuration, fills in defaults and
//! validates every field before the wake loop is built.
//!
//! ## Configuration Source
//!
//! The configuration file lives at `$XDG_CONFIG_HOME/suncam/suncam.toml` unless a
//! path is given with `--config`. When the default file does not exist, a commented
//! template is written there and startup stops so the station details can be
//! filled in.
//!
//! ## Configuration Structure
//!
//! ```toml
//! # Station identity (used in image names and bucket partitions)
//! site = "SE"
//! catchment = "CARGN"
//! direction = "E"
//!
//! # Station location
//! latitude = 55.8626
//! longitude = -3.2031
//! timezone = "Europe/London"       # Optional, detected from coordinates
//!
//! # Timing
//! capture_interval = 10800         # Seconds between daytime captures
//! sleep_interval = 300             # Longest single sleep at night (seconds)
//!
//! # Camera
//! camera = "libcamera"             # "libcamera" or "debug"
//! image_width = 1024
//! image_height = 768
//! image_quality = 95
//! power_cycle_camera = false       # Unload camera drivers between captures
//!
//! # Storage
//! bucket = "station-images"        # Falls back to $AWS_BUCKET_NAME
//! delete_cache = true              # Drop local copies even when an upload fails
//! data_dir = "/var/lib/suncam"     # Optional, defaults to the user data dir
//! ```
//!
//! Uploads go through the AWS CLI and its credential chain. Stations that upload
//! under an assumed IAM role configure `role_arn` and `source_profile` in
//! `~/.aws/config`; suncam itself holds no credentials.
//!
//! ## Validation and Error Handling
//!
//! - **Identity**: site, catchment and direction must be non-empty path-safe names
//! - **Geographic validation**: Latitude (-90° to +90°), longitude (-180° to +180°)
//! - **Range validation**: intervals, image size and JPEG quality
//! - **Timezone**: must be a known IANA name when given
//!
//! Any failure here is fatal: the station refuses to start with a bad config.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::CameraKind;
use crate::constants::*;
use crate::driver::LoopSettings;
use crate::geo::{self, Location};
use crate::logger::Log;

/// Configuration structure for suncam station settings.
///
/// Station identity and coordinates are required. Every other field is optional
/// in the file and holds its default after loading.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub site: String,
    pub catchment: String,
    pub direction: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub capture_interval: Option<u64>, // seconds
    pub sleep_interval: Option<u64>,   // seconds
    pub camera: Option<CameraKind>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub image_quality: Option<u8>,
    pub power_cycle_camera: Option<bool>,
    pub bucket: Option<String>,
    pub delete_cache: Option<bool>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Write a commented configuration template to `path`.
    pub fn create_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = ConfigBuilder::new()
            .add_section("Station identity")
            .add_setting("site", "\"SITE\"", "Site code, e.g. \"SE\"")
            .add_setting("catchment", "\"CATCHMENT\"", "Catchment code, e.g. \"CARGN\"")
            .add_setting("direction", "\"N\"", "Direction the camera faces")
            .add_section("Station location")
            .add_setting("latitude", "0.0", "Degrees north (-90 to 90)")
            .add_setting("longitude", "0.0", "Degrees east (-180 to 180)")
            .add_section("Timing")
            .add_setting(
                "capture_interval",
                &DEFAULT_CAPTURE_INTERVAL.to_string(),
                &format!(
                    "Seconds between daytime captures ({}-{})",
                    MINIMUM_CAPTURE_INTERVAL, MAXIMUM_CAPTURE_INTERVAL
                ),
            )
            .add_setting(
                "sleep_interval",
                &DEFAULT_SLEEP_INTERVAL.to_string(),
                &format!(
                    "Longest single sleep at night in seconds ({}-{})",
                    MINIMUM_SLEEP_INTERVAL, MAXIMUM_SLEEP_INTERVAL
                ),
            )
            .add_section("Camera")
            .add_setting(
                "camera",
                &format!("\"{}\"", DEFAULT_CAMERA),
                "\"libcamera\" or \"debug\"",
            )
            .add_setting("image_width", &DEFAULT_IMAGE_WIDTH.to_string(), "Pixels")
            .add_setting("image_height", &DEFAULT_IMAGE_HEIGHT.to_string(), "Pixels")
            .add_setting(
                "image_quality",
                &DEFAULT_IMAGE_QUALITY.to_string(),
                "JPEG quality (1-100)",
            )
            .add_setting(
                "power_cycle_camera",
                &DEFAULT_POWER_CYCLE_CAMERA.to_string(),
                "Load camera drivers before each capture and unload them after",
            )
            .add_section("Storage")
            .add_setting(
                "delete_cache",
                &DEFAULT_DELETE_CACHE.to_string(),
                "Delete local images even when an upload fails",
            )
            .add_note("The upload bucket is read from $AWS_BUCKET_NAME unless set here:")
            .add_note("bucket = \"station-images\"")
            .add_note("Uploads use the AWS CLI credential chain. To upload under an IAM role,")
            .add_note("set role_arn and source_profile for the profile in ~/.aws/config.")
            .build();

        fs::write(path, content)
            .with_context(|| format!("Failed to write config template to {}", path.display()))
    }

    fn apply_defaults_and_validate_fields(config: &mut Config) -> Result<()> {
        for (name, value) in [
            ("site", &config.site),
            ("catchment", &config.catchment),
            ("direction", &config.direction),
        ] {
            validate_identifier(name, value)?;
        }

        Location::new(config.latitude, config.longitude)?;

        if let Some(name) = &config.timezone {
            name.parse::<Tz>()
                .map_err(|_| anyhow::anyhow!("Unknown timezone '{}' in config", name))?;
        }

        // Validate capture interval if specified
        if let Some(interval) = config.capture_interval {
            validate_capture_interval(interval)?;
        } else {
            config.capture_interval = Some(DEFAULT_CAPTURE_INTERVAL);
        }

        if let Some(interval) = config.sleep_interval {
            if !(MINIMUM_SLEEP_INTERVAL..=MAXIMUM_SLEEP_INTERVAL).contains(&interval) {
                anyhow::bail!(
                    "Sleep interval must be between {} and {} seconds",
                    MINIMUM_SLEEP_INTERVAL,
                    MAXIMUM_SLEEP_INTERVAL
                );
            }
        } else {
            config.sleep_interval = Some(DEFAULT_SLEEP_INTERVAL);
        }

        if config.camera.is_none() {
            config.camera = Some(DEFAULT_CAMERA);
        }

        for (name, value, default) in [
            ("Image width", &mut config.image_width, DEFAULT_IMAGE_WIDTH),
            ("Image height", &mut config.image_height, DEFAULT_IMAGE_HEIGHT),
        ] {
            match *value {
                Some(pixels) => {
                    if !(MINIMUM_IMAGE_DIMENSION..=MAXIMUM_IMAGE_DIMENSION).contains(&pixels) {
                        anyhow::bail!(
                            "{} must be between {} and {} pixels",
                            name,
                            MINIMUM_IMAGE_DIMENSION,
                            MAXIMUM_IMAGE_DIMENSION
                        );
                    }
                }
                None => *value = Some(default),
            }
        }

        if let Some(quality) = config.image_quality {
            if !(MINIMUM_IMAGE_QUALITY..=MAXIMUM_IMAGE_QUALITY).contains(&quality) {
                anyhow::bail!(
                    "Image quality must be between {} and {}",
                    MINIMUM_IMAGE_QUALITY,
                    MAXIMUM_IMAGE_QUALITY
                );
            }
        } else {
            config.image_quality = Some(DEFAULT_IMAGE_QUALITY);
        }

        if config.bucket.is_none() {
            config.bucket = std::env::var(BUCKET_ENV_VAR)
                .ok()
                .filter(|bucket| !bucket.trim().is_empty());
        }
        if let Some(bucket) = &config.bucket {
            if bucket.trim().is_empty() || bucket.contains('/') {
                anyhow::bail!("Bucket name '{}' is not valid", bucket);
            }
        }

        if config.delete_cache.is_none() {
            config.delete_cache = Some(DEFAULT_DELETE_CACHE);
        }
        if config.power_cycle_camera.is_none() {
            config.power_cycle_camera = Some(DEFAULT_POWER_CYCLE_CAMERA);
        }

        Ok(())
    }

    /// Load and validate the configuration at `path`.
    ///
    /// Does NOT create a template if the path doesn't exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file not found at specified path: {}",
                path.display()
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        Self::apply_defaults_and_validate_fields(&mut config)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Load the configuration from the default location.
    ///
    /// A missing file is replaced by a template and reported as an error, since a
    /// station cannot run without its identity and coordinates.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)
                .context("Failed to create default config during load")?;
            anyhow::bail!(
                "No configuration found. A template was written to {}; fill in the station details and restart",
                config_path.display()
            );
        }

        Self::load_from_path(&config_path).with_context(|| {
            Log::log_pipe();
            format!(
                "Failed to load configuration from {}",
                config_path.display()
            )
        })
    }

    /// Replace the capture interval (from `--interval`), validating it like the file value.
    pub fn override_capture_interval(&mut self, seconds: u64) -> Result<()> {
        validate_capture_interval(seconds)?;
        self.capture_interval = Some(seconds);
        Ok(())
    }

    pub fn location(&self) -> Result<Location> {
        Location::new(self.latitude, self.longitude)
    }

    /// The configured timezone, or the one containing the station's coordinates.
    pub fn resolve_timezone(&self) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or_else(|| geo::timezone_for_coordinates(self.latitude, self.longitude))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .context("Could not determine data directory")?
                .join(APP_DIR_NAME)),
        }
    }

    /// Camera backend, with `--debug` forcing the stand-in camera.
    pub fn camera_kind(&self, debug: bool) -> CameraKind {
        if debug {
            CameraKind::Debug
        } else {
            self.camera.unwrap_or(DEFAULT_CAMERA)
        }
    }

    /// Bucket to upload to. Only debug runs may go without one.
    pub fn require_bucket(&self, debug: bool) -> Result<String> {
        match (&self.bucket, debug) {
            (Some(bucket), _) => Ok(bucket.clone()),
            (None, true) => Ok("debug".to_string()),
            (None, false) => anyhow::bail!(
                "No upload bucket configured. Set 'bucket' in the config or {}",
                BUCKET_ENV_VAR
            ),
        }
    }

    pub fn loop_settings(&self, debug: bool) -> LoopSettings {
        LoopSettings {
            capture_interval: Duration::from_secs(
                self.capture_interval.unwrap_or(DEFAULT_CAPTURE_INTERVAL),
            ),
            sleep_interval: Duration::from_secs(
                self.sleep_interval.unwrap_or(DEFAULT_SLEEP_INTERVAL),
            ),
            // Stand-in cameras have no drivers to cycle
            power_cycle_camera: !debug
                && self.power_cycle_camera.unwrap_or(DEFAULT_POWER_CYCLE_CAMERA),
            debug,
        }
    }

    pub fn log_config(&self, config_path: &Path) {
        Log::log_block_start(&format!(
            "Loaded configuration from {}",
            config_path.display()
        ));

        Log::log_indented(&format!(
            "Station: {} / {} facing {}",
            self.catchment, self.site, self.direction
        ));
        if let Ok(location) = self.location() {
            Log::log_indented(&format!("Location: {}", location));
        }
        Log::log_indented(&format!("Timezone: {}", self.resolve_timezone()));
        Log::log_indented(&format!(
            "Capture interval: {} seconds",
            self.capture_interval.unwrap_or(DEFAULT_CAPTURE_INTERVAL)
        ));
        Log::log_indented(&format!(
            "Sleep interval: {} seconds",
            self.sleep_interval.unwrap_or(DEFAULT_SLEEP_INTERVAL)
        ));
        Log::log_indented(&format!(
            "Camera: {} ({}x{}, quality {})",
            self.camera.unwrap_or(DEFAULT_CAMERA),
            self.image_width.unwrap_or(DEFAULT_IMAGE_WIDTH),
            self.image_height.unwrap_or(DEFAULT_IMAGE_HEIGHT),
            self.image_quality.unwrap_or(DEFAULT_IMAGE_QUALITY)
        ));
        if self.power_cycle_camera.unwrap_or(DEFAULT_POWER_CYCLE_CAMERA) {
            Log::log_indented("Camera drivers are unloaded between captures");
        }
        Log::log_indented(&format!(
            "Bucket: {}",
            self.bucket.as_deref().unwrap_or("(not set)")
        ));
        Log::log_indented(&format!(
            "Delete cache: {}",
            self.delete_cache.unwrap_or(DEFAULT_DELETE_CACHE)
        ));
    }
}

fn validate_identifier(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("'{}' must not be empty", name);
    }
    if value.contains(['/', '\\', '=']) || value.chars().any(char::is_whitespace) {
        anyhow::bail!(
            "'{}' may not contain slashes, '=' or whitespace (got '{}')",
            name,
            value
        );
    }
    Ok(())
}

fn validate_capture_interval(seconds: u64) -> Result<()> {
    if !(MINIMUM_CAPTURE_INTERVAL..=MAXIMUM_CAPTURE_INTERVAL).contains(&seconds) {
        anyhow::bail!(
            "Capture interval must be between {} and {} seconds",
            MINIMUM_CAPTURE_INTERVAL,
            MAXIMUM_CAPTURE_INTERVAL
        );
    }
    Ok(())
}

/// Builder for the commented configuration template with aligned comments.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
    Note(String),
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{}]", title)));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{} = {}", key, value),
            comment: format!("# {}", comment),
        });
        self
    }

    /// A free-standing comment line, outside the aligned column.
    fn add_note(mut self, text: &str) -> Self {
        self.entries.push(ConfigEntry::Note(format!("# {}", text)));
        self
    }

    fn build(self) -> String {
        // One space between the longest setting and its comment
        let width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) | ConfigEntry::Note(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut lines = Vec::new();
        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !lines.is_empty() {
                        lines.push(String::new());
                    }
                    lines.push(title);
                }
                ConfigEntry::Setting { line, comment } => {
                    lines.push(format!("{:<width$}{}", line, comment, width = width));
                }
                ConfigEntry::Note(text) => lines.push(text),
            }
        }

        lines.push(String::new());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;
    use serial_test::serial;
    use tempfile::tempdir;

    const MINIMAL_CONFIG: &str = r#"
site = "SE"
catchment = "CARGN"
direction = "E"
latitude = 55.8626453
longitude = -3.2031049
bucket = "station-images"
"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn with_extra(extra: &str) -> String {
        format!("{}{}\n", MINIMAL_CONFIG, extra)
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let (_dir, path) = write_config(MINIMAL_CONFIG);
        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.site, TEST_SITE);
        assert_eq!(config.catchment, TEST_CATCHMENT);
        assert_eq!(config.direction, TEST_DIRECTION);
        assert_eq!(config.capture_interval, Some(DEFAULT_CAPTURE_INTERVAL));
        assert_eq!(config.sleep_interval, Some(DEFAULT_SLEEP_INTERVAL));
        assert_eq!(config.camera, Some(CameraKind::Libcamera));
        assert_eq!(config.image_width, Some(1024));
        assert_eq!(config.image_height, Some(768));
        assert_eq!(config.image_quality, Some(95));
        assert_eq!(config.delete_cache, Some(true));
        assert_eq!(config.power_cycle_camera, Some(false));
        assert_eq!(config.bucket.as_deref(), Some("station-images"));
        assert!(!config.loop_settings(false).power_cycle_camera);
    }

    #[test]
    fn test_full_config_parsing() {
        let (_dir, path) = write_config(&with_extra(
            r#"
timezone = "Europe/London"
capture_interval = 600
sleep_interval = 60
camera = "debug"
image_width = 2048
image_height = 1536
image_quality = 80
delete_cache = false
data_dir = "/var/lib/suncam"
"#,
        ));
        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.resolve_timezone(), chrono_tz::Europe::London);
        assert_eq!(config.camera, Some(CameraKind::Debug));
        assert_eq!(config.delete_cache, Some(false));
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/var/lib/suncam"));

        let settings = config.loop_settings(false);
        assert_eq!(settings.capture_interval, Duration::from_secs(600));
        assert_eq!(settings.sleep_interval, Duration::from_secs(60));
        assert!(!settings.debug);
    }

    #[test]
    fn test_timezone_detected_when_absent() {
        let (_dir, path) = write_config(MINIMAL_CONFIG);
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.resolve_timezone(), TEST_TIMEZONE);
    }

    #[test]
    fn test_missing_required_field() {
        let (_dir, path) = write_config(
            r#"
site = "SE"
catchment = "CARGN"
latitude = 55.0
longitude = -3.0
"#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("direction"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Config::load_from_path(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let (_dir, path) = write_config(&with_extra("capture_interval = \"often\""));
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn test_range_validation() {
        let invalid = [
            "capture_interval = 5",
            "capture_interval = 100000",
            "sleep_interval = 0",
            "sleep_interval = 7200",
            "image_width = 10",
            "image_height = 10000",
            "image_quality = 0",
            "image_quality = 101",
            "camera = \"webcam\"",
            "timezone = \"Mars/Olympus_Mons\"",
        ];

        for extra in invalid {
            let (_dir, path) = write_config(&with_extra(extra));
            assert!(
                Config::load_from_path(&path).is_err(),
                "'{}' should be rejected",
                extra
            );
        }
    }

    #[test]
    fn test_coordinate_validation() {
        let (_dir, path) = write_config(
            r#"
site = "SE"
catchment = "CARGN"
direction = "E"
latitude = 95.0
longitude = -3.0
"#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("latitude"));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("site", "SE").is_ok());
        assert!(validate_identifier("site", "").is_err());
        assert!(validate_identifier("site", "  ").is_err());
        assert!(validate_identifier("site", "S/E").is_err());
        assert!(validate_identifier("site", "site=SE").is_err());
        assert!(validate_identifier("site", "S E").is_err());
    }

    #[test]
    fn test_override_capture_interval() {
        let (_dir, path) = write_config(MINIMAL_CONFIG);
        let mut config = Config::load_from_path(&path).unwrap();

        config.override_capture_interval(60).unwrap();
        assert_eq!(config.capture_interval, Some(60));

        assert!(config.override_capture_interval(1).is_err());
        assert_eq!(config.capture_interval, Some(60));
    }

    #[test]
    fn test_debug_forces_debug_camera() {
        let (_dir, path) = write_config(MINIMAL_CONFIG);
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.camera_kind(false), CameraKind::Libcamera);
        assert_eq!(config.camera_kind(true), CameraKind::Debug);
    }

    #[test]
    #[serial]
    fn test_bucket_from_environment() {
        let content = MINIMAL_CONFIG.replace("bucket = \"station-images\"\n", "");
        let (_dir, path) = write_config(&content);

        let original = std::env::var(BUCKET_ENV_VAR).ok();
        unsafe {
            std::env::set_var(BUCKET_ENV_VAR, "env-bucket");
        }
        let from_env = Config::load_from_path(&path);
        unsafe {
            std::env::remove_var(BUCKET_ENV_VAR);
        }
        let without = Config::load_from_path(&path);
        unsafe {
            if let Some(val) = original {
                std::env::set_var(BUCKET_ENV_VAR, val);
            }
        }

        let from_env = from_env.unwrap();
        assert_eq!(from_env.require_bucket(false).unwrap(), "env-bucket");

        let without = without.unwrap();
        assert!(without.bucket.is_none());
        assert!(without.require_bucket(false).is_err());
        assert_eq!(without.require_bucket(true).unwrap(), "debug");
    }

    #[test]
    #[serial]
    fn test_load_writes_template_when_missing() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join(APP_DIR_NAME).join(CONFIG_FILE_NAME);

        // Save and restore XDG_CONFIG_HOME
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let result = Config::load();

        unsafe {
            match original {
                Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        assert!(result.is_err());
        assert!(config_path.exists());

        let template = fs::read_to_string(&config_path).unwrap();
        assert!(template.contains("#[Station identity]"));
        assert!(template.contains("capture_interval = 10800"));
        assert!(template.contains("power_cycle_camera = false"));
        assert!(template.contains("role_arn and source_profile"));
        assert!(template.contains("# bucket = \"station-images\""));
        // The template itself must parse once the placeholders are edited
        assert!(toml::from_str::<Config>(&template).is_ok());
    }

    #[test]
    fn test_template_comments_are_aligned() {
        let content = ConfigBuilder::new()
            .add_section("Test")
            .add_setting("a", "1", "first")
            .add_setting("longer_key", "2", "second")
            .build();

        let columns: Vec<usize> = content
            .lines()
            .filter(|line| !line.starts_with("#[") && !line.is_empty())
            .map(|line| line.find('#').unwrap())
            .collect();
        assert_eq!(columns, vec![15, 15]);
    }

    #[test]
    fn test_power_cycling_is_opt_in_and_ignored_in_debug() {
        let (_dir, path) = write_config(&with_extra("power_cycle_camera = true"));
        let config = Config::load_from_path(&path).unwrap();

        assert!(config.loop_settings(false).power_cycle_camera);
        assert!(!config.loop_settings(true).power_cycle_camera);
    }

    #[test]
    fn test_template_notes_are_not_aligned_settings() {
        let content = ConfigBuilder::new()
            .add_section("Test")
            .add_setting("key", "1", "comment")
            .add_note("free text")
            .build();

        assert!(content.lines().any(|line| line == "# free text"));
        let parsed: toml::Value = toml::from_str(&content).unwrap();
        assert_eq!(parsed.get("key").and_then(|v| v.as_integer()), Some(1));
    }
}
