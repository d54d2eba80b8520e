//! Command-line argument parsing and processing.
//!
//! This module handles parsing of command-line arguments and provides a clean
//! interface for the main application logic. It supports the standard help,
//! version, and debug flags plus the capture interval and config path overrides,
//! while gracefully handling unknown options.

use std::path::PathBuf;

use crate::logger::Log;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the capture loop with these settings
    Run {
        debug_enabled: bool,
        capture_interval: Option<u64>,
        config_path: Option<PathBuf>,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown or malformed arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments (typically from std::env::args())
    ///
    /// # Returns
    /// ParsedArgs containing the determined action
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut capture_interval: Option<u64> = None;
        let mut config_path: Option<PathBuf> = None;
        let mut unknown_arg_found = false;

        // Convert to vector for easier indexed access
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg_str = &args_vec[i];
            match arg_str.as_str() {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--interval" | "-i" => {
                    match args_vec.get(i + 1).map(|value| value.parse::<u64>()) {
                        Some(Ok(seconds)) => capture_interval = Some(seconds),
                        Some(Err(_)) => {
                            Log::log_warning(&format!(
                                "Invalid interval value: {}",
                                args_vec[i + 1]
                            ));
                            unknown_arg_found = true;
                        }
                        None => {
                            Log::log_warning("Missing value for --interval. Usage: --interval <seconds>");
                            unknown_arg_found = true;
                        }
                    }
                    i += 1; // Skip the value
                }
                "--config" | "-c" => {
                    match args_vec.get(i + 1) {
                        Some(path) if !path.starts_with('-') => {
                            config_path = Some(PathBuf::from(path));
                        }
                        _ => {
                            Log::log_warning("Missing value for --config. Usage: --config <path>");
                            unknown_arg_found = true;
                        }
                    }
                    i += 1; // Skip the value
                }
                _ => {
                    // Check if the argument starts with a dash, indicating it's an option
                    if arg_str.starts_with('-') {
                        Log::log_warning(&format!("Unknown option: {}", arg_str));
                        unknown_arg_found = true;
                    }
                    // Non-option arguments are currently ignored
                }
            }
            i += 1;
        }

        // Determine the action based on parsed flags
        let action = if display_version {
            CliAction::ShowVersion
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else if display_help {
            CliAction::ShowHelp
        } else {
            CliAction::Run {
                debug_enabled,
                capture_interval,
                config_path,
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    Log::log_version();
    Log::log_pipe();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    Log::log_version();
    Log::log_block_start(env!("CARGO_PKG_DESCRIPTION"));
    Log::log_block_start("Usage: suncam [OPTIONS]");
    Log::log_block_start("Options:");
    Log::log_indented("-c, --config <path>       Use this config file instead of the default");
    Log::log_indented("-d, --debug               Debug camera, no uploads, verbose output");
    Log::log_indented("-h, --help                Print help information");
    Log::log_indented("-i, --interval <seconds>  Override the capture interval");
    Log::log_indented("-V, --version             Print version information");
    Log::log_end();
}
