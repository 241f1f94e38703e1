//! Running one invocation of the external tool.

use crate::models::Phase;
use crate::process::{spawn_with_chunk_size, ExitOutcome, ReadOutcome};
use crate::progress;

use super::errors::{StepError, StepResult};
use super::types::Context;

/// Run the tool with `args` and stream its progress until it exits.
///
/// Output is parsed with the grammar for `phase`. Parsed values only move
/// forward and stay below 100 until the process has exited, at which point
/// the phase is marked complete. Exit status is informational: a non-zero
/// code is logged with the output tail but does not fail the step.
pub fn run_tool(
    ctx: &Context,
    phase: Phase,
    args: &[String],
    chunk_size: usize,
) -> StepResult<ExitOutcome> {
    let argv = ctx.tool_command(args);
    ctx.logger.command(&argv);

    let process = spawn_with_chunk_size(&argv, chunk_size)?;
    let cancel = ctx.cancel_handle();
    cancel.attach(process.killer());

    let grammar = progress::grammar_for(phase);
    if let Some(g) = grammar {
        tracing::debug!("Reading {} progress from pid {}", g.name(), process.pid());
    }
    let poll = ctx.tool.poll_interval();

    loop {
        match process.read_chunk(poll) {
            ReadOutcome::Data(bytes) => {
                ctx.logger.output_chunk(&String::from_utf8_lossy(&bytes));
                if let Some(value) = grammar.and_then(|g| g.parse(&bytes)) {
                    ctx.report_progress(value);
                }
            }
            ReadOutcome::Pending => {}
            ReadOutcome::Eof => break,
        }
    }

    let outcome = process.wait();
    cancel.detach();

    if outcome.was_killed() || ctx.is_cancelled() {
        ctx.logger.clear_tail();
        return Err(StepError::cancelled(phase.to_string()));
    }

    if !outcome.is_success() {
        ctx.report_warning(&format!("{} ended with {}", process.program(), outcome));
        ctx.logger.show_tail(&phase.to_string());
    }
    ctx.logger.clear_tail();

    ctx.complete_phase();
    Ok(outcome)
}
