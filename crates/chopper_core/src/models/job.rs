//! Job state, its polling snapshot, and the shared accessor.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::Phase;

/// Prefix shown in place of a path for input that arrived as bytes.
pub const DROPPED_FILE_PREFIX: &str = "[dropped file]";

/// Errors from persisting job state.
#[derive(Error, Debug)]
pub enum JobStateError {
    #[error("Failed to read or write job state: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid job state JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Input supplied as bytes rather than a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputOverride {
    /// Original file name, used when materializing to disk.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl InputOverride {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Everything describing one chop job plus its live phase and progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    /// Source audio path. Empty when only override bytes were supplied.
    #[serde(default)]
    pub audio_input_path: String,
    /// Output directory for chopped segments.
    #[serde(default)]
    pub dest_folder: String,
    /// Chop the input directly, without vocal extraction.
    #[serde(default)]
    pub skip_vocal_extraction: bool,
    /// Move the extracted vocal stem next to the chops instead of deleting it.
    #[serde(default)]
    pub keep_vocal_file: bool,
    /// In-memory input (e.g. drag-and-drop).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_override: Option<InputOverride>,
    /// Current pipeline phase.
    #[serde(default)]
    pub phase: Phase,
    /// Completion of the current phase, 0-100.
    #[serde(default = "default_progress")]
    pub progress: f64,
}

fn default_progress() -> f64 {
    100.0
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            audio_input_path: String::new(),
            dest_folder: String::new(),
            skip_vocal_extraction: false,
            keep_vocal_file: false,
            input_override: None,
            phase: Phase::Idle,
            progress: default_progress(),
        }
    }
}

impl JobState {
    /// Job for an audio file on disk.
    pub fn from_path(audio_input_path: impl Into<String>, dest_folder: impl Into<String>) -> Self {
        Self {
            audio_input_path: audio_input_path.into(),
            dest_folder: dest_folder.into(),
            ..Default::default()
        }
    }

    /// Job for audio held in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: Vec<u8>,
        dest_folder: impl Into<String>,
    ) -> Self {
        Self {
            dest_folder: dest_folder.into(),
            input_override: Some(InputOverride::new(name, bytes)),
            ..Default::default()
        }
    }

    /// Set the skip-extraction option (builder style).
    pub fn with_skip_vocal_extraction(mut self, skip: bool) -> Self {
        self.skip_vocal_extraction = skip;
        self
    }

    /// Set the keep-vocal-file option (builder style).
    pub fn with_keep_vocal_file(mut self, keep: bool) -> Self {
        self.keep_vocal_file = keep;
        self
    }

    /// Pick a file on disk, dropping any override bytes.
    pub fn select_audio_path(&mut self, path: impl Into<String>) {
        self.audio_input_path = path.into();
        self.input_override = None;
    }

    /// Take dropped bytes as the input, clearing the on-disk path.
    pub fn drop_audio_bytes(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.audio_input_path.clear();
        self.input_override = Some(InputOverride::new(name, bytes));
    }

    /// Whether the job has any input at all.
    pub fn has_input(&self) -> bool {
        self.input_override.is_some() || !self.audio_input_path.trim().is_empty()
    }

    /// Label for the input as a user would see it.
    pub fn display_name(&self) -> String {
        match &self.input_override {
            Some(input) => format!("{} {}", DROPPED_FILE_PREFIX, input.name),
            None => self.audio_input_path.clone(),
        }
    }

    /// Short name for logs and log files.
    pub fn job_name(&self) -> String {
        let name = match &self.input_override {
            Some(input) => input.name.clone(),
            None => Path::new(&self.audio_input_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        };
        if name.is_empty() {
            "job".to_string()
        } else {
            name
        }
    }

    /// Polling snapshot of this state.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            audio_path: self.display_name(),
            dest_path: self.dest_folder.clone(),
            skip_vocal_extraction: self.skip_vocal_extraction,
            keep_vocal_file: self.keep_vocal_file,
            state: self.phase.as_str().to_string(),
            progress: self.progress,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, JobStateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, JobStateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Persist to a JSON file atomically.
    pub fn save(&self, path: &Path) -> Result<(), JobStateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        let temp_file = path.with_extension("json.tmp");
        fs::write(&temp_file, &json)?;
        fs::rename(&temp_file, path)?;

        tracing::debug!("Saved job state to {}", path.display());
        Ok(())
    }

    /// Load from a JSON file written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, JobStateError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Destination folder as a path.
    pub fn dest_path(&self) -> PathBuf {
        PathBuf::from(&self.dest_folder)
    }
}

/// Plain record for polling callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub audio_path: String,
    pub dest_path: String,
    pub skip_vocal_extraction: bool,
    pub keep_vocal_file: bool,
    /// Wire name of the phase (`""` while idle).
    pub state: String,
    pub progress: f64,
}

impl JobSnapshot {
    /// Parsed phase, if `state` is a known wire name.
    pub fn phase(&self) -> Option<Phase> {
        Phase::from_wire(&self.state)
    }
}

/// Thread-safe job state with snapshot reads.
///
/// Cheap to clone (`Arc` clone). Only the worker writes; callers read copies
/// so they never observe a half-written record.
#[derive(Debug, Clone, Default)]
pub struct SharedJobState {
    inner: Arc<RwLock<JobState>>,
}

impl SharedJobState {
    pub fn new(state: JobState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Polling snapshot.
    pub fn snapshot(&self) -> JobSnapshot {
        self.inner.read().snapshot()
    }

    /// Full copy of the current state.
    pub fn get(&self) -> JobState {
        self.inner.read().clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.read().phase
    }

    pub fn progress(&self) -> f64 {
        self.inner.read().progress
    }

    /// Replace the whole record (done before a new job starts).
    pub(crate) fn replace(&self, state: JobState) {
        *self.inner.write() = state;
    }

    /// Enter a phase. Active phases start at 0 progress, terminal ones at 100.
    pub(crate) fn enter_phase(&self, phase: Phase) {
        let mut state = self.inner.write();
        state.phase = phase;
        if phase.is_active() {
            state.progress = 0.0;
        } else if phase.is_terminal() {
            state.progress = 100.0;
        }
    }

    pub(crate) fn set_progress(&self, progress: f64) {
        self.inner.write().progress = progress.clamp(0.0, 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_with_override_keeps_empty_path() {
        let state = JobState::from_bytes("clip.wav", vec![0, 1, 2, 254, 255], "/out")
            .with_keep_vocal_file(true);

        let json = state.to_json().unwrap();
        assert!(json.contains("\"audioInputPath\": \"\""));

        let parsed = JobState::from_json(&json).unwrap();
        assert_eq!(parsed, state);
        assert!(parsed.audio_input_path.is_empty());
    }

    #[test]
    fn round_trip_mid_job() {
        let state = JobState {
            audio_input_path: "/music/song.mp3".to_string(),
            dest_folder: "/out".to_string(),
            skip_vocal_extraction: true,
            keep_vocal_file: false,
            input_override: None,
            phase: Phase::Chopping,
            progress: 42.5,
        };

        let parsed = JobState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("job.json");
        let state = JobState::from_path("/music/a.wav", "/out").with_skip_vocal_extraction(true);

        state.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        assert_eq!(JobState::load(&path).unwrap(), state);
    }

    #[test]
    fn load_garbage_is_error() {
        assert!(matches!(
            JobState::from_json("{not json"),
            Err(JobStateError::Json(_))
        ));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed = JobState::from_json(r#"{"destFolder":"/out"}"#).unwrap();
        assert_eq!(parsed.dest_folder, "/out");
        assert_eq!(parsed.phase, Phase::Idle);
        assert_eq!(parsed.progress, 100.0);
        assert!(parsed.input_override.is_none());
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let state = JobState::from_path("/music/a.wav", "/out");
        let json = serde_json::to_value(state.snapshot()).unwrap();

        for key in [
            "audioPath",
            "destPath",
            "skipVocalExtraction",
            "keepVocalFile",
            "state",
            "progress",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["state"], "");
    }

    #[test]
    fn display_name_marks_dropped_files() {
        let dropped = JobState::from_bytes("clip.wav", vec![1], "/out");
        assert_eq!(dropped.display_name(), "[dropped file] clip.wav");
        assert_eq!(dropped.job_name(), "clip.wav");

        let on_disk = JobState::from_path("/music/a.wav", "/out");
        assert_eq!(on_disk.display_name(), "/music/a.wav");
        assert_eq!(on_disk.job_name(), "a.wav");
    }

    #[test]
    fn selecting_a_path_clears_dropped_bytes() {
        let mut state = JobState::from_bytes("clip.wav", vec![1, 2], "/out");
        state.select_audio_path("/music/b.wav");
        assert!(state.input_override.is_none());
        assert_eq!(state.audio_input_path, "/music/b.wav");

        state.drop_audio_bytes("c.wav", vec![3]);
        assert!(state.audio_input_path.is_empty());
        assert!(state.has_input());
    }

    #[test]
    fn shared_state_phase_resets_progress() {
        let shared = SharedJobState::new(JobState::default());
        shared.enter_phase(Phase::Separating);
        assert_eq!(shared.progress(), 0.0);

        shared.set_progress(55.0);
        assert_eq!(shared.snapshot().progress, 55.0);
        assert_eq!(shared.snapshot().phase(), Some(Phase::Separating));

        shared.enter_phase(Phase::Finished);
        assert_eq!(shared.progress(), 100.0);
        assert_eq!(shared.snapshot().state, "finished");
    }

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedJobState>();
    }
}
