//! Chop step - cuts the (vocal) audio into segments.

use crate::models::Phase;
use crate::orchestrator::errors::StepResult;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::tool::run_tool;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

/// Runs `--chop -i <vocal> -o <dest> -n <name hint>` plus tuning flags.
pub struct ChopStep;

impl ChopStep {
    pub fn new() -> Self {
        Self
    }

    fn build_args(&self, ctx: &Context, state: &RunState) -> Vec<String> {
        let tool = &ctx.tool;
        vec![
            "--chop".to_string(),
            "-i".to_string(),
            state.chop_input().to_string_lossy().to_string(),
            "-o".to_string(),
            ctx.request.dest_folder.clone(),
            "-n".to_string(),
            state.name_hint(),
            "--threshold".to_string(),
            tool.threshold.to_string(),
            "--min-duration".to_string(),
            tool.min_duration.to_string(),
            "--min-rms".to_string(),
            tool.min_rms.to_string(),
        ]
    }
}

impl Default for ChopStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ChopStep {
    fn name(&self) -> &str {
        "Chop"
    }

    fn description(&self) -> &str {
        "Cut audio into segments"
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.enter_phase(Phase::Chopping);

        let args = self.build_args(ctx, state);
        let outcome = run_tool(ctx, Phase::Chopping, &args, ctx.tool.chop_read_size)?;
        state.chop_exit = Some(outcome);
        Ok(StepOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::pipeline::CancelHandle;
    use crate::orchestrator::test_support::test_context;
    use std::path::PathBuf;

    #[test]
    fn args_follow_tool_cli() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path(), CancelHandle::default());
        let mut state = RunState::new("/music/song.mp3", false);
        state.vocal_path = Some(PathBuf::from("/out/vocals.wav"));

        let args = ChopStep::new().build_args(&ctx, &state);
        assert_eq!(
            args,
            vec![
                "--chop",
                "-i",
                "/out/vocals.wav",
                "-o",
                ctx.request.dest_folder.as_str(),
                "-n",
                "/music/song.mp3",
                "--threshold",
                "0.5",
                "--min-duration",
                "0.2",
                "--min-rms",
                "0.01",
            ]
        );
    }
}
