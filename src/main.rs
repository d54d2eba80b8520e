use anyhow::Result;
use signal_hook::{
    consts::signal::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use suncam::args::{CliAction, ParsedArgs, display_help, display_version_info};
use suncam::camera::create_camera;
use suncam::config::Config;
use suncam::constants::*;
use suncam::driver::{Devices, WakeLoop};
use suncam::images::ImageStore;
use suncam::lock::{acquire_instance_lock, read_lock_pid};
use suncam::logger::Log;
use suncam::power::{NoopGovernor, SysfsGovernor};
use suncam::scheduler::DayScheduler;
use suncam::time_source::SystemTimeSource;
use suncam::upload::{AwsCliUploader, DryRunUploader};

/// Start mirroring the log to `<data_dir>/logs/suncam.log`, rotating it first if it is due.
///
/// Only called while holding the instance lock.
fn setup_log_file(store: &ImageStore) {
    if let Err(e) = Log::set_log_file(&store.log_file_path()) {
        Log::log_warning(&format!("Logging to console only: {:#}", e));
        return;
    }

    match Log::rotate_if_due(chrono::Local::now().naive_local()) {
        Ok(true) => Log::log_decorated("Rotated log file"),
        Ok(false) => {}
        Err(e) => Log::log_warning(&format!("Could not rotate log file: {:#}", e)),
    }
}

/// Select real or stand-in collaborators for the wake loop.
fn build_devices(config: &Config, debug: bool) -> Devices {
    let camera = create_camera(
        config.camera_kind(debug),
        config.image_width.unwrap_or(DEFAULT_IMAGE_WIDTH),
        config.image_height.unwrap_or(DEFAULT_IMAGE_HEIGHT),
        config.image_quality.unwrap_or(DEFAULT_IMAGE_QUALITY),
    );

    if debug {
        Devices {
            camera,
            uploader: Box::new(DryRunUploader),
            power: Box::new(NoopGovernor),
        }
    } else {
        Devices {
            camera,
            uploader: Box::new(AwsCliUploader),
            power: Box::new(SysfsGovernor::default()),
        }
    }
}

/// Perform cleanup operations when shutting down the application.
///
/// Releases and removes the lock file, then closes the log file.
fn cleanup(lock_file: File, lock_path: &Path) {
    Log::log_decorated("Performing cleanup...");

    // Drop the lock file handle to release the lock
    drop(lock_file);

    if let Err(e) = fs::remove_file(lock_path) {
        Log::log_warning(&format!("Failed to remove lock file: {}", e));
    } else {
        Log::log_decorated("Lock file removed successfully");
    }

    Log::log_decorated("Cleanup complete");
    Log::close_log_file();
}

fn run(debug: bool, capture_interval: Option<u64>, config_path: Option<PathBuf>) -> Result<()> {
    Log::set_debug(debug);
    Log::log_version();

    // Load configuration first, any problem here is fatal
    let (mut config, config_path) = match config_path {
        Some(path) => (Config::load_from_path(&path)?, path),
        None => (Config::load()?, Config::get_config_path()?),
    };
    if let Some(seconds) = capture_interval {
        config.override_capture_interval(seconds)?;
    }
    let bucket = config.require_bucket(debug)?;

    let data_dir = config.data_dir()?;
    let store = ImageStore::new(
        &data_dir,
        &config.site,
        &config.catchment,
        &config.direction,
        config.delete_cache.unwrap_or(DEFAULT_DELETE_CACHE),
    )?;

    // One station per data directory, and its log file belongs to the lock holder
    let lock_path = data_dir.join(LOCK_FILE_NAME);
    let Some(lock_file) = acquire_instance_lock(&lock_path)? else {
        let holder = read_lock_pid(&lock_path)
            .map(|pid| format!(" (PID {})", pid))
            .unwrap_or_default();
        anyhow::bail!(
            "Another instance of suncam is already running on {}{}.\n\
            • Stop it before restarting.",
            data_dir.display(),
            holder
        );
    };

    setup_log_file(&store);
    Log::log_decorated("Lock acquired, starting suncam...");
    config.log_config(&config_path);

    // Set up signal handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    let mut signals = Signals::new([SIGTERM, SIGINT])?;
    thread::spawn(move || {
        for signal in signals.forever() {
            Log::log_pipe();
            Log::log_info(&format!("Shutdown signal received: {:?}", signal));
            r.store(false, Ordering::SeqCst);
        }
    });

    let timezone = config.resolve_timezone();
    let scheduler = DayScheduler::new(config.location()?, timezone);
    let clock = SystemTimeSource::new(timezone, running.clone());

    let mut wake_loop = WakeLoop::new(
        scheduler,
        build_devices(&config, debug),
        store,
        clock,
        bucket,
        config.loop_settings(debug),
        running,
    );
    let result = wake_loop.run();

    Log::log_block_start("Shutting down suncam...");
    cleanup(lock_file, &lock_path);
    result
}

fn main() {
    let parsed = ParsedArgs::from_env();

    match parsed.action {
        CliAction::ShowVersion => display_version_info(),
        CliAction::ShowHelp => display_help(),
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            capture_interval,
            config_path,
        } => {
            if let Err(e) = run(debug_enabled, capture_interval, config_path) {
                Log::log_pipe();
                Log::log_critical(&format!("{:#}", e));
                Log::log_end();
                Log::close_log_file();
                std::process::exit(EXIT_FAILURE);
            }
            Log::log_end();
        }
    }
}
