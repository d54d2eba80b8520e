//! Object storage uploads.
//!
//! Uploads shell out to the AWS CLI, which picks up credentials the usual way
//! (environment, `~/.aws/credentials`, instance profile). In debug mode the
//! [`DryRunUploader`] only reports what would have been sent.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::constants::{AWS_COMMAND, S3_STORAGE_CLASS};
use crate::logger::Log;

/// Sends one local file to a bucket under a given object name.
#[cfg_attr(test, mockall::automock)]
pub trait Uploader {
    fn upload(&self, file: &Path, bucket: &str, object_name: &str) -> Result<()>;
}

/// Uploads with `aws s3 cp`.
#[derive(Debug, Clone, Default)]
pub struct AwsCliUploader;

impl AwsCliUploader {
    fn upload_args(file: &Path, bucket: &str, object_name: &str) -> Vec<String> {
        vec![
            "s3".to_string(),
            "cp".to_string(),
            file.display().to_string(),
            format!("s3://{}/{}", bucket, object_name),
            "--storage-class".to_string(),
            S3_STORAGE_CLASS.to_string(),
            "--only-show-errors".to_string(),
        ]
    }
}

impl Uploader for AwsCliUploader {
    fn upload(&self, file: &Path, bucket: &str, object_name: &str) -> Result<()> {
        let output = Command::new(AWS_COMMAND)
            .args(Self::upload_args(file, bucket, object_name))
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", AWS_COMMAND))?;

        if !output.status.success() {
            anyhow::bail!(
                "Upload of {} failed ({}): {}",
                file.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Pretends every upload succeeds.
#[derive(Debug, Clone, Default)]
pub struct DryRunUploader;

impl Uploader for DryRunUploader {
    fn upload(&self, file: &Path, bucket: &str, object_name: &str) -> Result<()> {
        Log::log_debug(&format!(
            "Dry run: would upload {} to s3://{}/{}",
            file.display(),
            bucket,
            object_name
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_arguments() {
        let args = AwsCliUploader::upload_args(
            Path::new("/data/pending_uploads/a.jpg"),
            "station-images",
            "catchment=CARGN/site=SE/a.jpg",
        );
        assert_eq!(args[0..2], ["s3", "cp"]);
        assert_eq!(args[2], "/data/pending_uploads/a.jpg");
        assert_eq!(args[3], "s3://station-images/catchment=CARGN/site=SE/a.jpg");
        assert!(args.windows(2).any(|w| w == ["--storage-class", "STANDARD"]));
    }

    #[test]
    fn test_dry_run_always_succeeds() {
        let uploader = DryRunUploader;
        assert!(
            uploader
                .upload(Path::new("/nonexistent.jpg"), "bucket", "key")
                .is_ok()
        );
    }
}
