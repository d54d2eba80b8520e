//! Camera capture backends.
//!
//! Stations use a Raspberry Pi camera driven through `libcamera-still`. For desk
//! testing, `DebugCamera` writes a small text placeholder instead so the whole
//! capture/upload pipeline can run on any machine.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::constants::*;
use crate::logger::Log;

/// Camera backend selected in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    Libcamera,
    Debug,
}

impl std::fmt::Display for CameraKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraKind::Libcamera => write!(f, "libcamera"),
            CameraKind::Debug => write!(f, "debug"),
        }
    }
}

/// A device that can write a still image to a path.
#[cfg_attr(test, mockall::automock)]
pub trait Camera {
    /// Capture a single image into `path`.
    ///
    /// # Arguments
    /// * `path` - Destination file; its parent directory must exist
    /// * `vflip` - Flip the image vertically
    /// * `hflip` - Flip the image horizontally
    fn capture_image(&mut self, path: &Path, vflip: bool, hflip: bool) -> Result<()>;

    /// Make the camera available (load drivers). No-op by default.
    ///
    /// Only called when the station is configured to power cycle the camera.
    fn power_on(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the camera (unload drivers). No-op by default.
    fn power_off(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Raspberry Pi camera module driven by `libcamera-still`.
#[derive(Debug, Clone)]
pub struct LibCamera {
    width: u32,
    height: u32,
    quality: u8,
}

impl LibCamera {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }

    /// Arguments for one `libcamera-still` invocation.
    fn capture_args(&self, path: &Path, vflip: bool, hflip: bool) -> Vec<String> {
        let mut args = vec![
            "--width".to_string(),
            self.width.to_string(),
            "--height".to_string(),
            self.height.to_string(),
            "--quality".to_string(),
            self.quality.to_string(),
            "-o".to_string(),
            path.display().to_string(),
        ];
        if vflip {
            args.push("--vflip".to_string());
        }
        if hflip {
            args.push("--hflip".to_string());
        }
        args
    }
}

/// Run a system command to completion, failing on a non-zero exit status.
fn run_command(program: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run {}", program))?;

    if !output.status.success() {
        anyhow::bail!(
            "{} {} exited with {}: {}",
            program,
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

impl Camera for LibCamera {
    fn capture_image(&mut self, path: &Path, vflip: bool, hflip: bool) -> Result<()> {
        let args = self.capture_args(path, vflip, hflip);
        Log::log_debug(&format!("Running {} {}", LIBCAMERA_COMMAND, args.join(" ")));

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_command(LIBCAMERA_COMMAND, &args).context("Image capture failed")?;

        if !path.exists() {
            anyhow::bail!(
                "{} reported success but {} was not written",
                LIBCAMERA_COMMAND,
                path.display()
            );
        }
        Ok(())
    }

    fn power_on(&mut self) -> Result<()> {
        if Path::new(CAMERA_MODULE_SYSFS).exists() {
            return Ok(());
        }
        Log::log_debug("Loading camera kernel modules");
        run_command("modprobe", &module_load_args())
    }

    fn power_off(&mut self) -> Result<()> {
        if !Path::new(CAMERA_MODULE_SYSFS).exists() {
            return Ok(());
        }
        Log::log_debug("Unloading camera kernel modules");
        run_command("rmmod", &module_unload_args())
    }
}

/// `modprobe` arguments loading every camera module, dependencies first.
fn module_load_args() -> Vec<&'static str> {
    let mut args = vec!["-a"];
    args.extend(CAMERA_KERNEL_MODULES);
    args
}

/// `rmmod` arguments removing the same modules in reverse order.
fn module_unload_args() -> Vec<&'static str> {
    CAMERA_KERNEL_MODULES.iter().rev().copied().collect()
}

/// Software stand-in that writes a text file instead of an image.
#[derive(Debug, Clone, Default)]
pub struct DebugCamera;

impl DebugCamera {
    fn placeholder(vflip: bool, hflip: bool) -> &'static str {
        match (vflip, hflip) {
            (false, false) => "debug image",
            (true, false) => "debug image (flipped vertically)",
            (false, true) => "debug image (flipped horizontally)",
            (true, true) => "debug image (rotated 180 degrees)",
        }
    }
}

impl Camera for DebugCamera {
    fn capture_image(&mut self, path: &Path, vflip: bool, hflip: bool) -> Result<()> {
        fs::write(path, Self::placeholder(vflip, hflip))
            .with_context(|| format!("Failed to write debug image {}", path.display()))?;
        Log::log_debug(&format!("Debug camera wrote {}", path.display()));
        Ok(())
    }
}

/// Build the camera backend for `kind`.
pub fn create_camera(kind: CameraKind, width: u32, height: u32, quality: u8) -> Box<dyn Camera> {
    match kind {
        CameraKind::Libcamera => Box::new(LibCamera::new(width, height, quality)),
        CameraKind::Debug => Box::new(DebugCamera),
    }
}
