//! Subprocess runner for the external separate/chop tool.
//!
//! Each pipeline phase launches one process. Its stdout and stderr are copied
//! by reader threads into a single channel so the worker can poll for output
//! with a timeout and stay responsive to cancellation.
//!
//! ```no_run
//! use std::time::Duration;
//! use chopper_core::process::{spawn, ReadOutcome};
//!
//! let argv = vec!["python3".to_string(), "chopper.py".to_string(), "--separate".to_string()];
//! let process = spawn(&argv).unwrap();
//! loop {
//!     match process.read_chunk(Duration::from_millis(50)) {
//!         ReadOutcome::Data(bytes) => print!("{}", String::from_utf8_lossy(&bytes)),
//!         ReadOutcome::Pending => {}
//!         ReadOutcome::Eof => break,
//!     }
//! }
//! println!("{}", process.wait());
//! ```

mod runner;
mod types;

pub use runner::{spawn, spawn_with_chunk_size, ProcessKiller, RunningProcess};
pub use types::{ExitOutcome, ReadOutcome, SpawnError, DEFAULT_CHUNK_SIZE};
