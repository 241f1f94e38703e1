//! Core types for the orchestrator pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ToolSettings;
use crate::logging::JobLogger;
use crate::models::{JobState, Phase, SharedJobState};
use crate::process::ExitOutcome;

use super::pipeline::CancelHandle;
use super::sink::EventSink;

/// Read-only context passed to pipeline steps.
///
/// Contains the job request and shared resources that steps can read
/// but not modify. Mutable per-run data goes in `RunState`.
pub struct Context {
    /// The job as requested by the caller.
    pub request: JobState,
    /// External tool settings.
    pub tool: ToolSettings,
    /// Job name/identifier.
    pub job_name: String,
    /// Script passed to the runtime (installed or staged).
    pub script: PathBuf,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    state: SharedJobState,
    sink: Arc<dyn EventSink>,
    cancel: CancelHandle,
}

impl Context {
    /// Create a new context for a job.
    pub fn new(
        request: JobState,
        tool: ToolSettings,
        script: PathBuf,
        logger: Arc<JobLogger>,
        state: SharedJobState,
        sink: Arc<dyn EventSink>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            job_name: request.job_name(),
            request,
            tool,
            script,
            logger,
            state,
            sink,
            cancel,
        }
    }

    /// Output directory for chops.
    pub fn dest_dir(&self) -> PathBuf {
        self.request.dest_path()
    }

    /// Where the separate phase writes the vocal stem.
    pub fn vocal_output_path(&self) -> PathBuf {
        self.dest_dir().join(&self.tool.vocal_file_name)
    }

    /// Full argv for one tool invocation: runtime, script, then `args`.
    pub fn tool_command(&self, args: &[String]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 2);
        argv.push(self.tool.runtime.clone());
        argv.push(self.script.to_string_lossy().to_string());
        argv.extend_from_slice(args);
        argv
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Switch phase, reset progress, and notify.
    pub fn enter_phase(&self, phase: Phase) {
        self.state.enter_phase(phase);
        if phase.is_active() {
            self.logger.phase(&phase.to_string());
        }
        tracing::info!("[{}] {}", self.job_name, phase);
        self.sink.state_changed(phase);
        self.sink.progress(self.state.progress());
    }

    /// Report mid-phase progress.
    ///
    /// Values that do not move forward are dropped.
    pub fn report_progress(&self, value: f64) {
        if value <= self.state.progress() {
            return;
        }
        self.state.set_progress(value);
        self.logger.progress(value);
        self.sink.progress(value);
    }

    /// Mark the current phase complete.
    pub fn complete_phase(&self) {
        self.state.set_progress(100.0);
        self.logger.progress(100.0);
        self.sink.progress(100.0);
    }

    /// Report a problem to the log, tracing, and the sink.
    pub fn report_error(&self, message: &str) {
        self.logger.error(message);
        tracing::error!("[{}] {}", self.job_name, message);
        self.sink.error(message);
    }

    /// Report a non-fatal problem.
    pub fn report_warning(&self, message: &str) {
        self.logger.warn(message);
        tracing::warn!("[{}] {}", self.job_name, message);
    }
}

/// Mutable per-run data that steps fill in as they go.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Audio the pipeline reads (original path or materialized temp file).
    pub input_path: PathBuf,
    /// Set when `input_path` was materialized from dropped bytes.
    pub temp_input: bool,
    /// Vocal stem location, once extraction has been started.
    pub vocal_path: Option<PathBuf>,
    /// Chops directory, once it has been found.
    pub chops_dir: Option<PathBuf>,
    /// How the separate process ended.
    pub separate_exit: Option<ExitOutcome>,
    /// How the chop process ended.
    pub chop_exit: Option<ExitOutcome>,
}

impl RunState {
    pub fn new(input_path: impl Into<PathBuf>, temp_input: bool) -> Self {
        Self {
            input_path: input_path.into(),
            temp_input,
            ..Default::default()
        }
    }

    /// Audio handed to the chop phase.
    pub fn chop_input(&self) -> &Path {
        self.vocal_path.as_deref().unwrap_or(&self.input_path)
    }

    /// Value passed to `-n`; the tool names the chops directory after it.
    pub fn name_hint(&self) -> String {
        self.input_path.to_string_lossy().to_string()
    }

    /// `<dest>/<input stem> chops`, where the tool writes its segments.
    pub fn expected_chops_dir(&self, dest: &Path) -> PathBuf {
        let stem = self
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        dest.join(format!("{} chops", stem))
    }
}

/// Outcome of a step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (with reason).
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chop_input_prefers_vocal_stem() {
        let mut state = RunState::new("/music/song.mp3", false);
        assert_eq!(state.chop_input(), Path::new("/music/song.mp3"));

        state.vocal_path = Some(PathBuf::from("/out/vocals.wav"));
        assert_eq!(state.chop_input(), Path::new("/out/vocals.wav"));
        assert_eq!(state.name_hint(), "/music/song.mp3");
    }

    #[test]
    fn chops_dir_uses_input_stem() {
        let state = RunState::new("/tmp/job/clip.wav", true);
        assert_eq!(
            state.expected_chops_dir(Path::new("/out")),
            PathBuf::from("/out/clip chops")
        );
    }
}
