//! Finalize step - surfaces the chops and tidies intermediates.

use std::fs;
use std::path::{Path, PathBuf};

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};
use crate::temp::remove_file_if_exists;

/// Hands the chops directory to the sink, keeps or deletes the vocal stem,
/// and deletes a materialized input file.
pub struct FinalizeStep;

impl FinalizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FinalizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for FinalizeStep {
    fn name(&self) -> &str {
        "Finalize"
    }

    fn description(&self) -> &str {
        "Surface output and clean up"
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let chops_dir = state.expected_chops_dir(&ctx.dest_dir());
        if chops_dir.is_dir() {
            ctx.logger
                .info(&format!("Chops written to {}", chops_dir.display()));
            ctx.sink().output_ready(&chops_dir);
            state.chops_dir = Some(chops_dir);
        } else {
            ctx.report_warning(&format!("No chops directory at {}", chops_dir.display()));
        }

        let chops_dir = state.chops_dir.clone();
        settle_vocal(ctx, state, chops_dir.as_deref());

        discard_temp_input(ctx, state);
        Ok(StepOutcome::Success)
    }
}

/// Cleanup for a job that did not finish normally.
///
/// A stem from an interrupted separation is partial and always deleted. A
/// finished stem follows the same keep rules as a normal run, but the chops
/// directory is not surfaced.
pub fn cleanup_after_abort(ctx: &Context, state: &mut RunState) {
    if state.separate_exit.is_some() {
        let chops_dir = state.expected_chops_dir(&ctx.dest_dir());
        settle_vocal(ctx, state, Some(chops_dir.as_path()).filter(|d| d.is_dir()));
    } else {
        discard_vocal(ctx, state);
    }
    discard_temp_input(ctx, state);
}

/// Keep or delete the vocal stem according to `keep_vocal_file`.
///
/// A kept stem moves into `chops_dir` when there is one, else stays where
/// separation wrote it.
fn settle_vocal(ctx: &Context, state: &mut RunState, chops_dir: Option<&Path>) {
    let Some(vocal) = state.vocal_path.clone() else {
        return;
    };
    if !(ctx.request.keep_vocal_file && vocal.is_file()) {
        discard_vocal(ctx, state);
        return;
    }
    match chops_dir {
        Some(chops_dir) => match keep_vocal(ctx, &vocal, chops_dir) {
            Ok(target) => state.vocal_path = Some(target),
            Err(e) => ctx.report_error(&e.to_string()),
        },
        None => ctx.report_warning(&format!("Vocal stem left at {}", vocal.display())),
    }
}

/// Move the vocal stem next to the chops.
fn keep_vocal(ctx: &Context, vocal: &Path, chops_dir: &Path) -> StepResult<PathBuf> {
    let file_name = vocal
        .file_name()
        .ok_or_else(|| StepError::invalid_input("Vocal stem path has no file name"))?;
    let target = chops_dir.join(file_name);
    fs::rename(vocal, &target).map_err(|e| StepError::io_error("moving vocal stem", e))?;
    ctx.logger
        .info(&format!("Kept vocal stem at {}", target.display()));
    Ok(target)
}

/// Delete the vocal stem produced by this run, if any.
fn discard_vocal(ctx: &Context, state: &mut RunState) {
    let Some(vocal) = state.vocal_path.take() else {
        return;
    };
    match remove_file_if_exists(&vocal) {
        Ok(()) => ctx.logger.debug(&format!("Removed {}", vocal.display())),
        Err(e) => ctx.report_error(&e.to_string()),
    }
}

/// Delete the input file if it was materialized from dropped bytes.
fn discard_temp_input(ctx: &Context, state: &mut RunState) {
    if !state.temp_input {
        return;
    }
    match remove_file_if_exists(&state.input_path) {
        Ok(()) => {
            ctx.logger
                .debug(&format!("Removed temp input {}", state.input_path.display()));
            state.temp_input = false;
        }
        Err(e) => ctx.report_error(&e.to_string()),
    }
}
