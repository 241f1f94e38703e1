//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool invocation.
    #[serde(default)]
    pub tool: ToolSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for temp files and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for per-job temporary files.
    ///
    /// Empty means the system temp directory.
    #[serde(default)]
    pub temp_root: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Last directory an audio file was picked from.
    #[serde(default)]
    pub last_audio_dir: String,

    /// Last destination directory.
    #[serde(default)]
    pub last_dest_dir: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            temp_root: String::new(),
            logs_folder: default_logs_folder(),
            last_audio_dir: String::new(),
            last_dest_dir: String::new(),
        }
    }
}

impl PathSettings {
    /// Resolve the temp root, falling back to the system temp directory.
    pub fn temp_root_path(&self) -> PathBuf {
        if self.temp_root.trim().is_empty() {
            std::env::temp_dir().join("vocal-chopper")
        } else {
            PathBuf::from(&self.temp_root)
        }
    }
}

/// How the external separate/chop executable is launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Interpreter (or binary) placed first on the command line.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Installed script path. Empty means stage the embedded payload.
    #[serde(default)]
    pub script_path: String,

    /// File name of the extracted vocal stem inside the destination folder.
    #[serde(default = "default_vocal_file_name")]
    pub vocal_file_name: String,

    /// Delay between output polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Read size for output chunks while separating.
    #[serde(default = "default_separate_read_size")]
    pub separate_read_size: usize,

    /// Read size for output chunks while chopping.
    #[serde(default = "default_chop_read_size")]
    pub chop_read_size: usize,

    /// Voicing confidence threshold passed to `--threshold`.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Shortest chop kept, in seconds (`--min-duration`).
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,

    /// Quietest chop kept (`--min-rms`).
    #[serde(default = "default_min_rms")]
    pub min_rms: f64,
}

fn default_runtime() -> String {
    #[cfg(target_os = "macos")]
    {
        "/usr/local/bin/python3".to_string()
    }
    #[cfg(not(target_os = "macos"))]
    {
        "python3".to_string()
    }
}

fn default_vocal_file_name() -> String {
    "vocals.wav".to_string()
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_separate_read_size() -> usize {
    128
}

fn default_chop_read_size() -> usize {
    256
}

fn default_threshold() -> f64 {
    0.5
}

fn default_min_duration() -> f64 {
    0.2
}

fn default_min_rms() -> f64 {
    0.01
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            script_path: String::new(),
            vocal_file_name: default_vocal_file_name(),
            poll_interval_ms: default_poll_interval_ms(),
            separate_read_size: default_separate_read_size(),
            chop_read_size: default_chop_read_size(),
            threshold: default_threshold(),
            min_duration: default_min_duration(),
            min_rms: default_min_rms(),
        }
    }
}

impl ToolSettings {
    /// Poll interval as a `Duration`, never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Installed script path, if one is configured.
    pub fn installed_script(&self) -> Option<PathBuf> {
        let trimmed = self.script_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show in tail.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prefix job log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Echo raw tool output into the job log.
    #[serde(default)]
    pub show_tool_output: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
            show_tool_output: false,
        }
    }
}

/// Configuration sections for atomic updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tool,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 3] =
        [ConfigSection::Paths, ConfigSection::Tool, ConfigSection::Logging];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tool => "tool",
            ConfigSection::Logging => "logging",
        }
    }
}
