//! Background job runner.
//!
//! [`Orchestrator::start`] runs the standard pipeline on a dedicated worker
//! thread and returns a [`JobHandle`]. At most one job runs per orchestrator.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::Settings;
use crate::logging::{JobLogger, LogConfig};
use crate::models::{JobSnapshot, JobState, Phase, SharedJobState};
use crate::temp::{TempFiles, ToolPayload};

use super::errors::{OrchestratorError, PipelineError, PipelineResult};
use super::pipeline::{CancelHandle, Pipeline};
use super::sink::EventSink;
use super::steps::cleanup_after_abort;
use super::types::{Context, RunState};
use super::create_standard_pipeline;

/// Starts chop jobs and exposes their state for polling.
pub struct Orchestrator {
    settings: Settings,
    payload: Option<ToolPayload>,
    log_dir: PathBuf,
    state: SharedJobState,
    busy: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Create an orchestrator. Logs go to `settings.paths.logs_folder`.
    pub fn new(settings: Settings) -> Self {
        let log_dir = PathBuf::from(&settings.paths.logs_folder);
        Self {
            settings,
            payload: None,
            log_dir,
            state: SharedJobState::default(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Script staged for each job when no installed script is configured.
    pub fn with_payload(mut self, payload: ToolPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Override the job log directory.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Copy of the current (or last) job's state.
    pub fn snapshot(&self) -> JobSnapshot {
        self.state.snapshot()
    }

    /// Shared state of the current (or last) job.
    pub fn state(&self) -> SharedJobState {
        self.state.clone()
    }

    /// Whether a worker is active.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start `job` on a new worker thread.
    ///
    /// Fails with [`OrchestratorError::AlreadyRunning`] until the previous
    /// job's worker has exited.
    pub fn start(
        &self,
        job: JobState,
        sink: Arc<dyn EventSink>,
    ) -> Result<JobHandle, OrchestratorError> {
        if !job.has_input() {
            return Err(OrchestratorError::NoInput);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(OrchestratorError::AlreadyRunning);
        }
        let busy = BusyGuard(Arc::clone(&self.busy));

        let mut job = job;
        job.phase = Phase::Idle;
        job.progress = 100.0;
        self.state.replace(job);

        let pipeline = create_standard_pipeline();
        let cancel = pipeline.cancel_handle();
        let worker = Worker {
            settings: self.settings.clone(),
            payload: self.payload.clone(),
            log_dir: self.log_dir.clone(),
            state: self.state.clone(),
            sink,
        };

        let thread = thread::Builder::new()
            .name("chopper-worker".to_string())
            .spawn(move || {
                let _busy = busy;
                worker.run(&pipeline);
            })
            .map_err(OrchestratorError::WorkerSpawn)?;

        Ok(JobHandle {
            cancel,
            state: self.state.clone(),
            thread: Some(thread),
        })
    }
}

/// Clears the busy flag when the worker ends, even by panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owner of a running job.
///
/// Dropping the handle cancels the job and waits for the worker.
pub struct JobHandle {
    cancel: CancelHandle,
    state: SharedJobState,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Kill the running tool and finish the job early.
    ///
    /// Idempotent; does nothing once the job has ended.
    pub fn cancel(&self) {
        if !self.is_finished() {
            self.cancel.cancel();
        }
    }

    /// Wait for the worker to exit.
    pub fn join(mut self) {
        self.join_inner();
    }

    /// Cancel, then wait.
    pub fn stop(self) {
        self.cancel();
        self.join();
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.snapshot()
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    fn join_inner(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Chop worker panicked");
            }
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel();
            self.join_inner();
        }
    }
}

/// Everything the worker thread owns.
struct Worker {
    settings: Settings,
    payload: Option<ToolPayload>,
    log_dir: PathBuf,
    state: SharedJobState,
    sink: Arc<dyn EventSink>,
}

impl Worker {
    fn run(&self, pipeline: &Pipeline) {
        let job = self.state.get();
        let job_name = job.job_name();
        tracing::info!("Starting job '{}'", job_name);

        let log_config = LogConfig::from_settings(&self.settings.logging);
        let logger = match JobLogger::new(&job_name, &self.log_dir, log_config, None) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                self.fail_before_start(&format!(
                    "Failed to create job log in {}: {}",
                    self.log_dir.display(),
                    e
                ));
                return;
            }
        };
        logger.info(&format!("Input: {}", job.display_name()));
        logger.info(&format!("Destination: {}", job.dest_folder));

        let mut temp = match TempFiles::new(self.settings.paths.temp_root_path()) {
            Ok(temp) => temp,
            Err(e) => {
                logger.error(&e.to_string());
                self.fail_before_start(&e.to_string());
                return;
            }
        };

        logger.debug(&format!(
            "Temp files for job {} in {}",
            temp.job_id(),
            temp.job_dir().display()
        ));

        let (script, mut run_state) = match self.prepare(&job, &mut temp) {
            Ok(prepared) => prepared,
            Err(e) => {
                logger.error(&e.to_string());
                self.fail_before_start(&e.to_string());
                return;
            }
        };

        let ctx = Context::new(
            job,
            self.settings.tool.clone(),
            script,
            Arc::clone(&logger),
            self.state.clone(),
            Arc::clone(&self.sink),
            pipeline.cancel_handle(),
        );

        match pipeline.run(&ctx, &mut run_state) {
            Ok(result) => {
                ctx.enter_phase(Phase::Finished);
                logger.success(&format!(
                    "Job finished ({} steps run)",
                    result.total_steps()
                ));
            }
            Err(e) if e.is_cancelled() => {
                ctx.enter_phase(Phase::Finished);
                cleanup_after_abort(&ctx, &mut run_state);
                logger.warn("Job cancelled");
            }
            Err(e) => {
                ctx.report_error(&e.to_string());
                cleanup_after_abort(&ctx, &mut run_state);
                ctx.enter_phase(Phase::Failed);
            }
        }

        temp.cleanup();
        logger.flush();
    }

    /// Resolve the tool script and the input file.
    fn prepare(&self, job: &JobState, temp: &mut TempFiles) -> PipelineResult<(PathBuf, RunState)> {
        let job_name = job.job_name();
        let setup_failed = |e: crate::temp::TempFileError| {
            PipelineError::setup_failed(&job_name, e.to_string())
        };

        let script = match (self.settings.tool.installed_script(), &self.payload) {
            (Some(path), _) => path,
            (None, Some(payload)) => temp.stage_payload(payload).map_err(setup_failed)?,
            (None, None) => {
                return Err(PipelineError::setup_failed(
                    &job_name,
                    "No tool script configured",
                ))
            }
        };

        let run_state = match &job.input_override {
            Some(input) => {
                let path = temp
                    .materialize(&input.name, &input.bytes)
                    .map_err(setup_failed)?;
                RunState::new(path, true)
            }
            None => RunState::new(&job.audio_input_path, false),
        };

        Ok((script, run_state))
    }

    /// End a job that never reached the pipeline.
    fn fail_before_start(&self, message: &str) {
        tracing::error!("{}", message);
        self.sink.error(message);
        self.state.enter_phase(Phase::Failed);
        self.sink.state_changed(Phase::Failed);
        self.sink.progress(self.state.progress());
    }
}
