//! Types shared by the subprocess runner.

use std::io;

use thiserror::Error;

/// Read size used when the caller does not pick one.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Error launching an external process.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// argv was empty.
    #[error("No program given")]
    EmptyCommand,

    /// The OS refused to start the program.
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Output reader threads could not be started.
    #[error("Failed to start output reader for '{program}': {source}")]
    Reader {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl SpawnError {
    pub fn launch(program: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            program: program.into(),
            source,
        }
    }

    pub fn reader(program: impl Into<String>, source: io::Error) -> Self {
        Self::Reader {
            program: program.into(),
            source,
        }
    }
}

/// Result of one output poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes from stdout or stderr, in arrival order.
    Data(Vec<u8>),
    /// Nothing arrived within the timeout.
    Pending,
    /// The process has exited and its output is drained.
    Eof,
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with a status code.
    Exited(i32),
    /// Terminated through [`kill`](super::RunningProcess::kill).
    Killed,
    /// Ended without a status code we can attribute (e.g. a foreign signal).
    Unknown,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }

    pub fn was_killed(&self) -> bool {
        matches!(self, ExitOutcome::Killed)
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit code {}", code),
            ExitOutcome::Killed => write!(f, "killed"),
            ExitOutcome::Unknown => write!(f, "unknown exit status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_names_program() {
        let err = SpawnError::launch(
            "python3",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("python3"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn exit_outcome_helpers() {
        assert!(ExitOutcome::Exited(0).is_success());
        assert!(!ExitOutcome::Exited(1).is_success());
        assert!(ExitOutcome::Killed.was_killed());
        assert_eq!(ExitOutcome::Exited(3).to_string(), "exit code 3");
    }
}
