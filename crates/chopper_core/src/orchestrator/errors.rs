//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::process::SpawnError;

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Job '{job_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Pipeline was cancelled.
    #[error("Job '{job_name}' was cancelled")]
    Cancelled { job_name: String },

    /// Failed to set up the job (temp files, tool payload).
    #[error("Job '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_name: job_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(job_name: impl Into<String>) -> Self {
        Self::Cancelled {
            job_name: job_name.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// The external tool could not be started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The step was interrupted by a cancel request.
    #[error("Cancelled during {0}")]
    Cancelled(String),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a cancelled error for the named step.
    pub fn cancelled(step_name: impl Into<String>) -> Self {
        Self::Cancelled(step_name.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }
}

/// Error starting a job on an [`Orchestrator`](super::Orchestrator).
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// A previous job from this orchestrator is still running.
    #[error("A job is already running")]
    AlreadyRunning,

    /// The job has neither a path nor dropped bytes.
    #[error("No audio input selected")]
    NoInput,

    /// The worker thread could not be created.
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] io::Error),
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_passes_through_step() {
        let spawn = SpawnError::launch(
            "python3",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        let err = StepError::from(spawn);
        assert!(err.to_string().contains("python3"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::invalid_input("Audio file not found: /music/a.wav");
        let pipeline_err = PipelineError::step_failed("a.wav", "Separate", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("a.wav"));
        assert!(msg.contains("Separate"));
        assert!(!pipeline_err.is_cancelled());
        assert!(PipelineError::cancelled("a.wav").is_cancelled());
    }
}
