//! Data models shared by the orchestrator and its callers.

mod enums;
mod job;

pub use enums::Phase;
pub use job::{
    InputOverride, JobSnapshot, JobState, JobStateError, SharedJobState, DROPPED_FILE_PREFIX,
};
