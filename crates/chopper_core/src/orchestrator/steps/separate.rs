//! Separate step - extracts the vocal stem from the input audio.

use crate::models::Phase;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::tool::run_tool;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

/// Runs `--separate -i <input> -o <dest>/<vocal file>`.
///
/// Skipped when the job chops the input directly.
pub struct SeparateStep;

impl SeparateStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SeparateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SeparateStep {
    fn name(&self) -> &str {
        "Separate"
    }

    fn description(&self) -> &str {
        "Extract the vocal stem"
    }

    fn validate_input(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        if ctx.request.skip_vocal_extraction {
            return Ok(());
        }
        if !state.input_path.is_file() {
            return Err(StepError::invalid_input(format!(
                "Audio file not found: {}",
                state.input_path.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        if ctx.request.skip_vocal_extraction {
            return Ok(StepOutcome::Skipped(
                "vocal extraction disabled".to_string(),
            ));
        }

        ctx.enter_phase(Phase::Separating);

        let vocal_path = ctx.vocal_output_path();
        let args = vec![
            "--separate".to_string(),
            "-i".to_string(),
            state.input_path.to_string_lossy().to_string(),
            "-o".to_string(),
            vocal_path.to_string_lossy().to_string(),
        ];

        // Recorded before the run so a cancel still discards a partial stem.
        state.vocal_path = Some(vocal_path);

        let outcome = run_tool(ctx, Phase::Separating, &args, ctx.tool.separate_read_size)?;
        state.separate_exit = Some(outcome);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        if let Some(vocal_path) = &state.vocal_path {
            if !vocal_path.is_file() {
                ctx.report_warning(&format!(
                    "Vocal stem not produced: {}",
                    vocal_path.display()
                ));
            }
        }
        Ok(())
    }
}
