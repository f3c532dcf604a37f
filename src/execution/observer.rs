use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Severity of a log event reported to the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Non-fatal problem; the run continues.
    Warning,
    /// A failure (item-local or fatal, depending on context).
    Error,
    /// A notable positive milestone.
    Success,
}

/// Observer interface for job events.
///
/// Workers report upward through this trait: discrete log events, coarse numeric
/// progress (0-100), free-text progress updates (high-frequency counters, already
/// throttled by the emitter), and a final completion callback. All methods default to
/// no-ops so implementors pick what they care about.
pub trait JobObserver: Send + Sync {
    /// A discrete log event.
    fn on_log(&self, _message: &str, _severity: Severity) {}

    /// Coarse progress, 0-100.
    fn on_progress(&self, _percent: u8) {}

    /// Free-text progress status (e.g. row-write counters).
    fn on_progress_text(&self, _text: &str) {}

    /// Terminal callback; `success = false` covers both failure and cancellation
    /// (the message distinguishes them).
    fn on_finished(&self, _success: bool, _message: &str) {}
}

/// An observer that ignores every event.
#[derive(Debug, Default)]
pub struct NullJobObserver;

impl JobObserver for NullJobObserver {}

/// Logs job events to stderr.
#[derive(Debug, Default)]
pub struct StdErrJobObserver;

impl JobObserver for StdErrJobObserver {
    fn on_log(&self, message: &str, severity: Severity) {
        eprintln!("[{severity:?}] {message}");
    }

    fn on_progress(&self, percent: u8) {
        eprintln!("[progress] {percent}%");
    }

    fn on_progress_text(&self, text: &str) {
        eprintln!("[progress] {text}");
    }

    fn on_finished(&self, success: bool, message: &str) {
        eprintln!("[finished] success={success} {message}");
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeJobObserver {
    observers: Vec<Arc<dyn JobObserver>>,
}

impl CompositeJobObserver {
    /// Create a composite from a list of observers.
    pub fn new(observers: Vec<Arc<dyn JobObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeJobObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeJobObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl JobObserver for CompositeJobObserver {
    fn on_log(&self, message: &str, severity: Severity) {
        for o in &self.observers {
            o.on_log(message, severity);
        }
    }

    fn on_progress(&self, percent: u8) {
        for o in &self.observers {
            o.on_progress(percent);
        }
    }

    fn on_progress_text(&self, text: &str) {
        for o in &self.observers {
            o.on_progress_text(text);
        }
    }

    fn on_finished(&self, success: bool, message: &str) {
        for o in &self.observers {
            o.on_finished(success, message);
        }
    }
}

/// Owned event form of the observer callbacks, for channel transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Log { message: String, severity: Severity },
    Progress(u8),
    ProgressText(String),
    Finished { success: bool, message: String },
}

/// Forwards job events over an `mpsc` channel.
///
/// Useful when the collaborator runs an event loop on another thread. Send failures
/// (receiver dropped) are ignored; the worker keeps running regardless.
pub struct ChannelJobObserver {
    sender: Mutex<Sender<JobEvent>>,
}

impl ChannelJobObserver {
    /// Create a channel observer from a sender.
    pub fn new(sender: Sender<JobEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }

    fn send(&self, event: JobEvent) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(event);
        }
    }
}

impl fmt::Debug for ChannelJobObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelJobObserver").finish()
    }
}

impl JobObserver for ChannelJobObserver {
    fn on_log(&self, message: &str, severity: Severity) {
        self.send(JobEvent::Log {
            message: message.to_string(),
            severity,
        });
    }

    fn on_progress(&self, percent: u8) {
        self.send(JobEvent::Progress(percent));
    }

    fn on_progress_text(&self, text: &str) {
        self.send(JobEvent::ProgressText(text.to_string()));
    }

    fn on_finished(&self, success: bool, message: &str) {
        self.send(JobEvent::Finished {
            success,
            message: message.to_string(),
        });
    }
}
