//! Local image store and upload bookkeeping.
//!
//! Captured images land in `<data_dir>/pending_uploads/` and stay there until an
//! upload pass removes them. The directory is the durability buffer between
//! cycles: a failed upload leaves the file in place for the next pass unless the
//! station is configured not to keep a local cache.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::logger::Log;
use crate::upload::Uploader;

/// Outcome of one upload pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub deleted: usize,
}

/// Pending image directory plus the station's naming fields.
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_dir: PathBuf,
    pending_dir: PathBuf,
    log_dir: PathBuf,
    site: String,
    catchment: String,
    direction: String,
    delete_cache: bool,
}

impl ImageStore {
    /// Open the store rooted at `base_dir`, creating its directories if needed.
    pub fn new(
        base_dir: &Path,
        site: &str,
        catchment: &str,
        direction: &str,
        delete_cache: bool,
    ) -> Result<Self> {
        let store = Self {
            base_dir: base_dir.to_path_buf(),
            pending_dir: base_dir.join(PENDING_DIR_NAME),
            log_dir: base_dir.join(LOG_DIR_NAME),
            site: site.to_string(),
            catchment: catchment.to_string(),
            direction: direction.to_string(),
            delete_cache,
        };

        for dir in [&store.base_dir, &store.pending_dir, &store.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn pending_dir(&self) -> &Path {
        &self.pending_dir
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    /// File name for an image taken at `timestamp`, e.g.
    /// `CARGN_SE_01_PCAM_E_20250606_120000.jpg`.
    pub fn image_name(&self, timestamp: &DateTime<Tz>) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}.{}",
            self.catchment,
            self.site,
            COMPOUND_ID,
            SENSOR_TYPE,
            self.direction,
            timestamp.format(IMAGE_TIMESTAMP_FORMAT),
            IMAGE_EXTENSION
        )
    }

    /// Where the image captured at `timestamp` should be written.
    pub fn pending_image_path(&self, timestamp: &DateTime<Tz>) -> PathBuf {
        self.pending_dir.join(self.image_name(timestamp))
    }

    /// Every file waiting for upload, oldest name first.
    pub fn list_pending(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.pending_dir).with_context(|| {
            format!("Failed to read pending directory {}", self.pending_dir.display())
        })?;

        let mut pending = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                pending.push(path);
            }
        }
        pending.sort();
        Ok(pending)
    }

    /// Object key for `file` in the Hive-style partition layout used by the bucket.
    pub fn partition_path(&self, file: &Path, date: NaiveDate) -> String {
        let filename = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        format!(
            "catchment={}/site={}/compound={}/type={}/direction={}/date={}/{}",
            self.catchment,
            self.site,
            COMPOUND_ID,
            SENSOR_TYPE,
            self.direction,
            date.format(PARTITION_DATE_FORMAT),
            filename
        )
    }

    /// Upload every pending file, partitioned under `date`.
    ///
    /// A file is deleted after a successful upload, or regardless of the outcome
    /// when the store does not keep a local cache. Individual failures are logged
    /// and counted, never returned.
    pub fn upload_pending(
        &self,
        uploader: &dyn Uploader,
        bucket: &str,
        date: NaiveDate,
    ) -> Result<UploadSummary> {
        let pending = self.list_pending()?;
        let mut summary = UploadSummary::default();

        if pending.is_empty() {
            Log::log_info("No images to upload");
            return Ok(summary);
        }

        Log::log_decorated(&format!("Uploading {} image(s) to {}", pending.len(), bucket));

        for image in &pending {
            let object_name = self.partition_path(image, date);

            let uploaded = match uploader.upload(image, bucket, &object_name) {
                Ok(()) => {
                    Log::log_indented(&format!("Uploaded s3://{}/{}", bucket, object_name));
                    summary.uploaded += 1;
                    true
                }
                Err(e) => {
                    Log::log_error(&format!("Failed to upload {}: {:#}", image.display(), e));
                    summary.failed += 1;
                    false
                }
            };

            if uploaded || self.delete_cache {
                match fs::remove_file(image) {
                    Ok(()) => summary.deleted += 1,
                    Err(e) => Log::log_warning(&format!(
                        "Failed to remove {}: {}",
                        image.display(),
                        e
                    )),
                }
            }
        }

        Ok(summary)
    }
}
