//! Event sink: how a running job reports to the outside world.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender};

use crate::models::Phase;

/// Receiver of job notifications.
///
/// Called from the worker thread. Implementations must not block for long.
pub trait EventSink: Send + Sync {
    /// The job entered `phase`.
    fn state_changed(&self, phase: Phase);

    /// Progress of the current phase, 0-100.
    fn progress(&self, value: f64);

    /// The chops directory exists and is ready to show.
    fn output_ready(&self, _dir: &Path) {}

    /// Something went wrong that the user should hear about.
    fn error(&self, _message: &str) {}
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn state_changed(&self, _phase: Phase) {}

    fn progress(&self, _value: f64) {}
}

/// A notification, as sent by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    StateChanged(Phase),
    Progress(f64),
    OutputReady(PathBuf),
    Error(String),
}

/// Sink that forwards events over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<JobEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that gets its events.
    pub fn new() -> (Self, Receiver<JobEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, event: JobEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelSink {
    fn state_changed(&self, phase: Phase) {
        self.send(JobEvent::StateChanged(phase));
    }

    fn progress(&self, value: f64) {
        self.send(JobEvent::Progress(value));
    }

    fn output_ready(&self, dir: &Path) {
        self.send(JobEvent::OutputReady(dir.to_path_buf()));
    }

    fn error(&self, message: &str) {
        self.send(JobEvent::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_in_order() {
        let (sink, rx) = ChannelSink::new();
        sink.state_changed(Phase::Chopping);
        sink.progress(12.0);
        sink.output_ready(Path::new("/out/a chops"));
        sink.error("boom");

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                JobEvent::StateChanged(Phase::Chopping),
                JobEvent::Progress(12.0),
                JobEvent::OutputReady(PathBuf::from("/out/a chops")),
                JobEvent::Error("boom".to_string()),
            ]
        );
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.progress(50.0);
    }
}
