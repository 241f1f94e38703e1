//! Spawning and polling a single external process.

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::types::{ExitOutcome, ReadOutcome, SpawnError, DEFAULT_CHUNK_SIZE};

/// Interval between exit checks in [`RunningProcess::wait`].
const WAIT_POLL: Duration = Duration::from_millis(10);

/// How long output may trail the exit of the direct child.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Launch `argv[0]` with the remaining arguments.
///
/// Stdout and stderr are both piped and merged into one byte stream read in
/// chunks of [`DEFAULT_CHUNK_SIZE`].
pub fn spawn(argv: &[String]) -> Result<RunningProcess, SpawnError> {
    spawn_with_chunk_size(argv, DEFAULT_CHUNK_SIZE)
}

/// Like [`spawn`], reading output in chunks of at most `chunk_size` bytes.
pub fn spawn_with_chunk_size(
    argv: &[String],
    chunk_size: usize,
) -> Result<RunningProcess, SpawnError> {
    let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;

    tracing::debug!("Spawning: {:?}", argv);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SpawnError::launch(program.as_str(), e))?;

    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let child = Arc::new(Mutex::new(child));
    let killed = Arc::new(AtomicBool::new(false));
    let killer = ProcessKiller {
        child: Arc::clone(&child),
        killed: Arc::clone(&killed),
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let chunk_size = chunk_size.max(1);
    let mut readers = Vec::with_capacity(2);

    let pipes: [(&str, Option<Box<dyn Read + Send>>); 2] = [
        ("stdout", stdout.map(|s| Box::new(s) as Box<dyn Read + Send>)),
        ("stderr", stderr.map(|s| Box::new(s) as Box<dyn Read + Send>)),
    ];
    for (stream, pipe) in pipes {
        let Some(pipe) = pipe else { continue };
        match spawn_reader(format!("{}-{}", stream, pid), pipe, chunk_size, tx.clone()) {
            Ok(handle) => readers.push(handle),
            Err(e) => {
                killer.kill();
                let _ = child.lock().wait();
                return Err(SpawnError::reader(program.as_str(), e));
            }
        }
    }

    Ok(RunningProcess {
        program: program.clone(),
        pid,
        child,
        killed,
        output: rx,
        _readers: readers,
    })
}

/// Copy a pipe into the channel until EOF or the receiver goes away.
fn spawn_reader(
    name: String,
    mut pipe: Box<dyn Read + Send>,
    chunk_size: usize,
    tx: Sender<Vec<u8>>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name).spawn(move || {
        let mut buf = vec![0u8; chunk_size];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Output reader stopped: {}", e);
                    break;
                }
            }
        }
    })
}

/// A launched external process with a merged output stream.
pub struct RunningProcess {
    program: String,
    pid: u32,
    child: Arc<Mutex<Child>>,
    killed: Arc<AtomicBool>,
    output: Receiver<Vec<u8>>,
    // Readers are detached: a grandchild holding the pipe open must not
    // block the caller once the direct child has exited.
    _readers: Vec<JoinHandle<()>>,
}

impl RunningProcess {
    /// Program name (argv[0]).
    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wait up to `timeout` for more output.
    ///
    /// Returns [`ReadOutcome::Eof`] once both pipes are closed. After the
    /// process has exited, output still in flight from the reader threads is
    /// drained with a short grace period per call. Eof follows the first
    /// grace period with nothing new, even if a grandchild keeps a pipe open.
    pub fn read_chunk(&self, timeout: Duration) -> ReadOutcome {
        match self.output.recv_timeout(timeout) {
            Ok(data) => ReadOutcome::Data(data),
            Err(RecvTimeoutError::Disconnected) => ReadOutcome::Eof,
            Err(RecvTimeoutError::Timeout) if self.is_running() => ReadOutcome::Pending,
            Err(RecvTimeoutError::Timeout) => match self.output.recv_timeout(EXIT_DRAIN_GRACE) {
                Ok(data) => ReadOutcome::Data(data),
                Err(_) => ReadOutcome::Eof,
            },
        }
    }

    /// Whether the process has not exited yet.
    pub fn is_running(&self) -> bool {
        matches!(self.child.lock().try_wait(), Ok(None))
    }

    /// Kill the process. Safe to call repeatedly or after exit.
    pub fn kill(&self) {
        self.killer().kill();
    }

    /// Handle that can kill this process from another thread.
    pub fn killer(&self) -> ProcessKiller {
        ProcessKiller {
            child: Arc::clone(&self.child),
            killed: Arc::clone(&self.killed),
        }
    }

    /// Block until the process exits.
    ///
    /// Polls instead of blocking on the child so a [`ProcessKiller`] on
    /// another thread can still take the lock.
    pub fn wait(&self) -> ExitOutcome {
        loop {
            let status = self.child.lock().try_wait();
            match status {
                Ok(Some(status)) => {
                    return if self.killed.load(Ordering::SeqCst) {
                        ExitOutcome::Killed
                    } else {
                        status.code().map_or(ExitOutcome::Unknown, ExitOutcome::Exited)
                    };
                }
                Ok(None) => thread::sleep(WAIT_POLL),
                Err(e) => {
                    tracing::warn!("Failed to query '{}' exit status: {}", self.program, e);
                    return ExitOutcome::Unknown;
                }
            }
        }
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        if self.is_running() {
            self.kill();
            let _ = self.child.lock().wait();
        }
    }
}

/// Cloneable kill switch for a [`RunningProcess`].
#[derive(Clone)]
pub struct ProcessKiller {
    child: Arc<Mutex<Child>>,
    killed: Arc<AtomicBool>,
}

impl ProcessKiller {
    /// Kill the process if it is still running.
    pub fn kill(&self) {
        let mut child = self.child.lock();
        if !matches!(child.try_wait(), Ok(None)) {
            return;
        }
        if self.killed.swap(true, Ordering::SeqCst) {
            return;
        }
        match child.kill() {
            Ok(()) => tracing::debug!("Killed process {}", child.id()),
            Err(e) => tracing::warn!("Failed to kill process {}: {}", child.id(), e),
        }
    }

    /// Whether a kill was issued.
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn drain(process: &RunningProcess) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut out = Vec::new();
        loop {
            assert!(Instant::now() < deadline, "process output never ended");
            match process.read_chunk(Duration::from_millis(50)) {
                ReadOutcome::Data(data) => out.extend(data),
                ReadOutcome::Pending => {}
                ReadOutcome::Eof => return out,
            }
        }
    }

    #[test]
    fn empty_argv_is_error() {
        assert!(matches!(spawn(&[]), Err(SpawnError::EmptyCommand)));
    }

    #[test]
    fn missing_program_is_launch_error() {
        let result = spawn(&argv(&["/nonexistent/definitely-not-here"]));
        assert!(matches!(result, Err(SpawnError::Launch { .. })));
    }

    #[test]
    fn collects_stdout_and_stderr() {
        let process = spawn(&argv(&["sh", "-c", "echo out; echo err 1>&2"])).unwrap();
        let output = String::from_utf8(drain(&process)).unwrap();

        assert!(output.contains("out"));
        assert!(output.contains("err"));
        assert_eq!(process.wait(), ExitOutcome::Exited(0));
    }

    #[test]
    fn drains_output_written_after_exit() {
        let process = spawn(&argv(&[
            "sh",
            "-c",
            "echo early; (sleep 0.2; echo late) & exit 0",
        ]))
        .unwrap();
        let output = String::from_utf8(drain(&process)).unwrap();

        assert!(output.contains("early"));
        assert!(output.contains("late"));
        assert_eq!(process.wait(), ExitOutcome::Exited(0));
    }

    #[test]
    fn lingering_grandchild_does_not_block_eof() {
        let process = spawn(&argv(&["sh", "-c", "sleep 30 & echo done"])).unwrap();
        let start = Instant::now();
        let output = String::from_utf8(drain(&process)).unwrap();

        assert!(output.contains("done"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn reports_exit_code() {
        let process = spawn(&argv(&["sh", "-c", "exit 3"])).unwrap();
        drain(&process);
        assert_eq!(process.wait(), ExitOutcome::Exited(3));
        assert!(!process.is_running());
    }

    #[test]
    fn chunks_respect_read_size() {
        let process =
            spawn_with_chunk_size(&argv(&["sh", "-c", "printf '0123456789abcdef'"]), 4).unwrap();

        let mut total = Vec::new();
        loop {
            match process.read_chunk(Duration::from_millis(50)) {
                ReadOutcome::Data(data) => {
                    assert!(data.len() <= 4);
                    total.extend(data);
                }
                ReadOutcome::Pending => {}
                ReadOutcome::Eof => break,
            }
        }
        assert_eq!(total, b"0123456789abcdef");
    }

    #[test]
    fn kill_stops_process_and_is_idempotent() {
        let process = spawn(&argv(&["sleep", "30"])).unwrap();
        assert!(process.is_running());
        assert_eq!(process.read_chunk(Duration::from_millis(20)), ReadOutcome::Pending);

        process.kill();
        process.kill();

        assert_eq!(process.wait(), ExitOutcome::Killed);
        assert_eq!(drain(&process), Vec::<u8>::new());
    }

    #[test]
    fn killer_works_from_another_thread() {
        let process = spawn(&argv(&["sleep", "30"])).unwrap();
        let killer = process.killer();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            killer.kill();
            killer.is_killed()
        });

        assert_eq!(process.wait(), ExitOutcome::Killed);
        assert!(handle.join().unwrap());
    }

    #[test]
    fn kill_after_exit_is_noop() {
        let process = spawn(&argv(&["sh", "-c", "exit 0"])).unwrap();
        assert_eq!(process.wait(), ExitOutcome::Exited(0));

        process.kill();
        assert!(!process.killer().is_killed());
        assert_eq!(process.wait(), ExitOutcome::Exited(0));
    }
}
