//! Separation progress events
//!
//! A run emits engine lines and pipeline milestones, then exactly one
//! terminal event:
//!
//! Milestone → Line … → [Notice] → … → Complete | Error | Cancelled
//!
//! [`ProgressRelay`] moves a run onto a worker thread and hands the events
//! over a bounded channel, so a consumer can block or poll.

use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, TryRecvError};

use super::artifacts::SeparationRecord;

/// Wire prefix of the success sentinel
pub const COMPLETE_SENTINEL: &str = "SEPARATION_COMPLETE";
/// Wire prefix of the failure sentinel
pub const ERROR_SENTINEL: &str = "ERROR";
/// Wire prefix of the cancellation sentinel
pub const CANCELLED_SENTINEL: &str = "CANCELLED";

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A line of engine output, verbatim
    Line(String),

    /// A pipeline step started or finished
    Milestone(String),

    /// Something was skipped; the job continues
    Notice(String),

    /// All passes finished and the output directory is assembled
    Complete {
        job_key: String,
        original_name: String,
        record: SeparationRecord,
    },

    /// The job stopped on an unrecoverable error
    Error { message: String },

    /// The job was stopped through the registry
    Cancelled { job_key: String },
}

impl ProgressEvent {
    /// Get a human-readable description of this event
    pub fn description(&self) -> String {
        match self {
            Self::Line(line) => line.clone(),
            Self::Milestone(text) => text.clone(),
            Self::Notice(text) => format!("Warning: {}", text),
            Self::Complete {
                original_name,
                record,
                ..
            } => format!(
                "Separation of {} complete: {} stems in {}",
                original_name,
                record.roles().count(),
                record.output_dir.display()
            ),
            Self::Error { message } => format!("Separation failed: {}", message),
            Self::Cancelled { job_key } => format!("Separation of {} cancelled", job_key),
        }
    }

    /// Check if this is a terminal event (Complete, Error or Cancelled)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::Error { .. } | Self::Cancelled { .. }
        )
    }

    /// The line sent to streaming clients
    ///
    /// Non-terminal events are forwarded as text; terminal events become
    /// `SEPARATION_COMPLETE::<key>::<name>`, `ERROR::<message>` or
    /// `CANCELLED::<key>`.
    pub fn wire_line(&self) -> String {
        match self {
            Self::Line(text) | Self::Milestone(text) => text.clone(),
            Self::Notice(text) => format!("Warning: {}", text),
            Self::Complete {
                job_key,
                original_name,
                ..
            } => format!("{}::{}::{}", COMPLETE_SENTINEL, job_key, original_name),
            // Keep the sentinel on one line; engine errors span several
            Self::Error { message } => {
                format!("{}::{}", ERROR_SENTINEL, message.replace(['\n', '\r'], " | "))
            }
            Self::Cancelled { job_key } => format!("{}::{}", CANCELLED_SENTINEL, job_key),
        }
    }

    /// The event as a server-sent-events frame
    pub fn sse_frame(&self) -> String {
        format!("data: {}\n\n", self.wire_line())
    }
}

/// Progress events delivered from a worker thread
///
/// Iterating blocks for the next event and ends after the terminal one.
/// Dropping the relay stops the worker at its next send, which drops the run
/// and kills any engine still running.
pub struct ProgressRelay {
    events: Receiver<ProgressEvent>,
    worker: Option<JoinHandle<()>>,
}

impl ProgressRelay {
    /// Drive `events` on a new thread, buffering at most `capacity` events
    pub fn spawn<I>(events: I, capacity: usize) -> std::io::Result<Self>
    where
        I: Iterator<Item = ProgressEvent> + Send + 'static,
    {
        let (tx, rx) = channel::bounded(capacity.max(1));

        let worker = std::thread::Builder::new()
            .name("separation-worker".to_string())
            .spawn(move || {
                for event in events {
                    let terminal = event.is_terminal();
                    if tx.send(event).is_err() {
                        log::debug!("Progress consumer went away, stopping run");
                        break;
                    }
                    if terminal {
                        break;
                    }
                }
            })?;

        Ok(Self {
            events: rx,
            worker: Some(worker),
        })
    }

    /// Next event if one is ready
    ///
    /// `Err(TryRecvError::Disconnected)` once the run has ended and every
    /// event was consumed.
    pub fn try_next(&self) -> Result<ProgressEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// Block until the worker thread has exited
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            // Drain so a full channel cannot block the worker
            while self.events.recv().is_ok() {}
            let _ = worker.join();
        }
    }
}

impl Iterator for ProgressRelay {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.events.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::plan::StemCount;
    use std::path::PathBuf;

    fn record() -> SeparationRecord {
        SeparationRecord {
            job_key: "abc_song".to_string(),
            original_name: "song.mp3".to_string(),
            input_path: PathBuf::from("/in/abc_song.mp3"),
            model: "htdemucs".to_string(),
            stem_count: StemCount::Four,
            output_root: PathBuf::from("/out"),
            output_dir: PathBuf::from("/out/htdemucs/abc_song"),
            stems: Vec::new(),
        }
    }

    #[test]
    fn test_wire_lines() {
        let complete = ProgressEvent::Complete {
            job_key: "abc_song".to_string(),
            original_name: "song.mp3".to_string(),
            record: record(),
        };
        assert_eq!(complete.wire_line(), "SEPARATION_COMPLETE::abc_song::song.mp3");
        assert_eq!(
            ProgressEvent::Error {
                message: "engine failed\nline two".to_string()
            }
            .wire_line(),
            "ERROR::engine failed | line two"
        );
        assert_eq!(
            ProgressEvent::Cancelled {
                job_key: "abc_song".to_string()
            }
            .sse_frame(),
            "data: CANCELLED::abc_song\n\n"
        );
        assert_eq!(ProgressEvent::Line("50%|###".to_string()).wire_line(), "50%|###");
    }

    #[test]
    fn test_terminal_events() {
        assert!(!ProgressEvent::Line("x".to_string()).is_terminal());
        assert!(!ProgressEvent::Notice("x".to_string()).is_terminal());
        assert!(ProgressEvent::Error { message: "x".to_string() }.is_terminal());
    }

    #[test]
    fn test_relay_stops_after_terminal_event() {
        let events = vec![
            ProgressEvent::Milestone("start".to_string()),
            ProgressEvent::Error { message: "boom".to_string() },
            ProgressEvent::Line("never delivered".to_string()),
        ];
        let relay = ProgressRelay::spawn(events.into_iter(), 1).unwrap();
        let received: Vec<ProgressEvent> = relay.collect();
        assert_eq!(received.len(), 2);
        assert!(received[1].is_terminal());
    }

    #[test]
    fn test_try_next_reports_disconnect_after_drain() {
        let relay = ProgressRelay::spawn(
            vec![ProgressEvent::Cancelled {
                job_key: "k".to_string(),
            }]
            .into_iter(),
            4,
        )
        .unwrap();

        let first = loop {
            match relay.try_next() {
                Ok(event) => break event,
                Err(TryRecvError::Empty) => std::thread::yield_now(),
                Err(TryRecvError::Disconnected) => panic!("event lost"),
            }
        };
        assert!(first.is_terminal());
        loop {
            match relay.try_next() {
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => std::thread::yield_now(),
                Ok(event) => panic!("unexpected event {:?}", event),
            }
        }
    }
}
