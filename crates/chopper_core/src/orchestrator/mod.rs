//! Background job orchestrator.
//!
//! A job runs the external tool up to twice, then tidies up:
//!
//! ```text
//! Orchestrator::start ──▶ worker thread
//!     Pipeline
//!         ├── Step: Separate   (--separate, percent progress; optional)
//!         ├── Step: Chop       (--chop, fraction progress)
//!         └── Step: Finalize   (surface chops, keep/delete vocal stem)
//! ```
//!
//! Phase changes and progress go to an [`EventSink`] and are mirrored in a
//! [`SharedJobState`](crate::models::SharedJobState) for polling.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chopper_core::config::Settings;
//! use chopper_core::models::JobState;
//! use chopper_core::orchestrator::{ChannelSink, JobEvent, Orchestrator};
//!
//! let orchestrator = Orchestrator::new(Settings::default());
//! let (sink, events) = ChannelSink::new();
//!
//! let job = JobState::from_path("/music/song.wav", "/music/out");
//! let handle = orchestrator.start(job, Arc::new(sink)).unwrap();
//!
//! for event in events.iter() {
//!     println!("{:?}", event);
//!     if matches!(event, JobEvent::StateChanged(p) if p.is_terminal()) {
//!         break;
//!     }
//! }
//! handle.join();
//! ```

mod errors;
mod pipeline;
mod runner;
mod sink;
mod step;
pub mod steps;
mod tool;
mod types;

pub use errors::{OrchestratorError, PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use runner::{JobHandle, Orchestrator};
pub use sink::{ChannelSink, EventSink, JobEvent, NullSink};
pub use step::PipelineStep;
pub use steps::{ChopStep, FinalizeStep, SeparateStep};
pub use tool::run_tool;
pub use types::{Context, RunState, StepOutcome};

/// Create the standard pipeline with all steps in the correct order.
///
/// 1. Separate - extract the vocal stem (skipped when disabled)
/// 2. Chop - cut audio into segments
/// 3. Finalize - surface output and clean up intermediates
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(SeparateStep::new())
        .with_step(ChopStep::new())
        .with_step(FinalizeStep::new())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use crate::config::{Settings, ToolSettings};
    use crate::logging::{JobLogger, LogConfig};
    use crate::models::{JobState, SharedJobState};
    use crate::temp::ToolPayload;

    use super::{CancelHandle, Context, NullSink};

    /// Shell stand-in for the separate/chop tool.
    ///
    /// Separate prints percent progress and copies input to output; inputs
    /// named `slow.wav` print one update then sleep. Chop prints fraction
    /// progress and writes one segment into `<dest>/<stem> chops`. Every call
    /// is appended to `<dest>/calls.log`.
    const FAKE_TOOL: &str = r#"#!/bin/sh
mode=""; input=""; output=""; name=""
while [ $# -gt 0 ]; do
    case "$1" in
        --separate) mode=separate ;;
        --chop) mode=chop ;;
        -i) input="$2"; shift ;;
        -o) output="$2"; shift ;;
        -n) name="$2"; shift ;;
        --threshold|--min-duration|--min-rms) shift ;;
    esac
    shift
done

if [ "$mode" = separate ]; then
    echo separate >> "$(dirname "$output")/calls.log"
    case "$input" in
        */slow.wav)
            printf ' 10%%|#         |\n'
            exec sleep 30
            ;;
    esac
    case "$input" in
        */broken.wav)
            printf ' 40%%|####      |\n'
            cp "$input" "$output"
            echo "model exploded" 1>&2
            exit 3
            ;;
    esac
    printf ' 50%%|#####     |\n'
    printf '100%%|##########|\n'
    cp "$input" "$output"
else
    echo chop >> "$output/calls.log"
    base=$(basename "$name")
    dir="$output/${base%.*} chops"
    mkdir -p "$dir"
    case "$name" in
        */long.wav)
            echo "chop 1/4"
            exec sleep 30
            ;;
    esac
    echo "chop 1/2"
    echo "chop 2/2"
    cp "$input" "$dir/chop0.wav"
fi
"#;

    pub fn fake_tool() -> ToolPayload {
        ToolPayload::embedded("fake_tool.sh", FAKE_TOOL.as_bytes())
    }

    /// Settings that run [`fake_tool`] under `sh`, with all files under `root`.
    pub fn test_settings(root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.tool.runtime = "sh".to_string();
        settings.tool.poll_interval_ms = 10;
        settings.paths.temp_root = root.join("temp").to_string_lossy().to_string();
        settings.paths.logs_folder = root.join("logs").to_string_lossy().to_string();
        settings
    }

    /// Context for driving a single step without a worker.
    pub fn test_context(root: &Path, cancel: CancelHandle) -> Context {
        let logger = JobLogger::new("test", root.join("logs"), LogConfig::default(), None)
            .expect("create test logger");
        let dest = root.join("out");
        fs::create_dir_all(&dest).expect("create dest");
        let request = JobState::from_path(
            root.join("in.wav").to_string_lossy(),
            dest.to_string_lossy(),
        );

        Context::new(
            request,
            ToolSettings::default(),
            PathBuf::from("tool.py"),
            Arc::new(logger),
            SharedJobState::default(),
            Arc::new(NullSink),
            cancel,
        )
    }
}
