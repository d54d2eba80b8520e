//! CPU frequency governor control.
//!
//! The station idles on `ondemand` and switches to `performance` only while an
//! upload batch is running. Governors are set by writing to sysfs, which needs
//! root; in debug mode [`NoopGovernor`] is used instead.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::constants::CPU_SYSFS_ROOT;
use crate::logger::Log;

/// Linux cpufreq governors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorMode {
    Powersave,
    Ondemand,
    Performance,
    Userspace,
    Conservative,
}

impl GovernorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GovernorMode::Powersave => "powersave",
            GovernorMode::Ondemand => "ondemand",
            GovernorMode::Performance => "performance",
            GovernorMode::Userspace => "userspace",
            GovernorMode::Conservative => "conservative",
        }
    }
}

/// Something that can change the CPU governor.
pub trait PowerControl {
    fn set_governor(&self, mode: GovernorMode) -> Result<()>;
}

/// Writes the governor to every `cpuN/cpufreq/scaling_governor` under a sysfs root.
#[derive(Debug, Clone)]
pub struct SysfsGovernor {
    root: PathBuf,
}

impl Default for SysfsGovernor {
    fn default() -> Self {
        Self::new(CPU_SYSFS_ROOT)
    }
}

impl SysfsGovernor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn governor_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read {}", self.root.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_cpu = name
                .strip_prefix("cpu")
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
            if !is_cpu {
                continue;
            }

            let file = entry.path().join("cpufreq").join("scaling_governor");
            if file.exists() {
                files.push(file);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl PowerControl for SysfsGovernor {
    fn set_governor(&self, mode: GovernorMode) -> Result<()> {
        let files = self.governor_files()?;
        if files.is_empty() {
            anyhow::bail!("No cpufreq governors found under {}", self.root.display());
        }

        for file in &files {
            fs::write(file, mode.as_str())
                .with_context(|| format!("Failed to write {}", file.display()))?;
        }
        Log::log_debug(&format!("CPU governor set to {}", mode.as_str()));
        Ok(())
    }
}

/// Leaves the governor alone.
#[derive(Debug, Clone, Default)]
pub struct NoopGovernor;

impl PowerControl for NoopGovernor {
    fn set_governor(&self, mode: GovernorMode) -> Result<()> {
        Log::log_debug(&format!("Skipping governor change to {}", mode.as_str()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn fake_cpu(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name).join("cpufreq");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("scaling_governor");
        fs::write(&file, "ondemand").unwrap();
        file
    }

    #[test]
    fn test_sets_every_cpu() {
        let dir = tempdir().unwrap();
        let cpu0 = fake_cpu(dir.path(), "cpu0");
        let cpu1 = fake_cpu(dir.path(), "cpu1");
        // Not a CPU directory
        fs::create_dir_all(dir.path().join("cpufreq")).unwrap();

        let governor = SysfsGovernor::new(dir.path());
        governor.set_governor(GovernorMode::Performance).unwrap();

        assert_eq!(fs::read_to_string(cpu0).unwrap(), "performance");
        assert_eq!(fs::read_to_string(cpu1).unwrap(), "performance");
    }

    #[test]
    fn test_skips_cpus_without_cpufreq() {
        let dir = tempdir().unwrap();
        let cpu0 = fake_cpu(dir.path(), "cpu0");
        fs::create_dir_all(dir.path().join("cpu1")).unwrap();

        SysfsGovernor::new(dir.path())
            .set_governor(GovernorMode::Powersave)
            .unwrap();
        assert_eq!(fs::read_to_string(cpu0).unwrap(), "powersave");
    }

    #[test]
    fn test_no_governors_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(
            SysfsGovernor::new(dir.path())
                .set_governor(GovernorMode::Ondemand)
                .is_err()
        );
        assert!(
            SysfsGovernor::new(dir.path().join("missing"))
                .set_governor(GovernorMode::Ondemand)
                .is_err()
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(GovernorMode::Ondemand.as_str(), "ondemand");
        assert_eq!(GovernorMode::Conservative.as_str(), "conservative");
        assert!(NoopGovernor.set_governor(GovernorMode::Performance).is_ok());
    }
}
