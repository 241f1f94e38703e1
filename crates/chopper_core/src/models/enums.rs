//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Pipeline phase of a chop job.
///
/// ```text
/// Idle ──▶ Separating ──▶ Chopping ──▶ Finished
///   └──────(skip extraction)──▶ Chopping
/// Separating/Chopping ──cancel──▶ Finished
/// Separating/Chopping ──spawn failure──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No job has run yet.
    #[default]
    Idle,
    /// Extracting the vocal stem.
    Separating,
    /// Cutting audio into segments.
    Chopping,
    /// Completed or cancelled.
    Finished,
    /// The external tool could not be launched.
    Failed,
}

impl Phase {
    /// Wire name sent with `state-changed` notifications.
    ///
    /// Idle has no notification and maps to the empty string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "",
            Phase::Separating => "separating",
            Phase::Chopping => "chopping",
            Phase::Finished => "finished",
            Phase::Failed => "failed",
        }
    }

    /// Parse a wire name back into a phase.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "" | "idle" => Some(Phase::Idle),
            "separating" => Some(Phase::Separating),
            "chopping" => Some(Phase::Chopping),
            "finished" => Some(Phase::Finished),
            "failed" => Some(Phase::Failed),
            _ => None,
        }
    }

    /// Whether an external process runs in this phase.
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Separating | Phase::Chopping)
    }

    /// Whether the job has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finished | Phase::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Separating => write!(f, "Separating"),
            Phase::Chopping => write!(f, "Chopping"),
            Phase::Finished => write!(f, "Finished"),
            Phase::Failed => write!(f, "Failed"),
        }
    }
}
