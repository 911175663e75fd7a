//! Progress and status events emitted by a sync run.
//!
//! Events travel over an unbounded channel from the worker thread to whoever
//! holds the receiving end. Delivery preserves emission order. `RunFinished`
//! is always the last event of a run and is sent exactly once.
//!
//! # Architecture
//!
//! ```text
//! SyncOrchestrator ──► EventEmitter ──► channel ──► dispatch() ──► SyncObserver
//!   (worker thread)                                (observer thread)
//! ```

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Receiving end of a run's event stream.
pub type EventReceiver = UnboundedReceiver<SyncEvent>;

/// A notification from a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Overall progress, 0-100.
    ProgressChanged(u8),
    /// Short human-readable description of the current step.
    StatusChanged(String),
    /// Detailed log line.
    LogMessage(String),
    /// The run reached a terminal state. `false` for both failure and
    /// cancellation.
    RunFinished(bool),
}

impl SyncEvent {
    /// Deliver this event to the matching observer callback.
    pub fn deliver(&self, observer: &mut dyn SyncObserver) {
        match self {
            Self::ProgressChanged(percent) => observer.on_progress(*percent),
            Self::StatusChanged(text) => observer.on_status(text),
            Self::LogMessage(text) => observer.on_log(text),
            Self::RunFinished(success) => observer.on_finished(*success),
        }
    }
}

/// Sending side of a run's event stream.
///
/// Sends never block. If every receiver is gone the event is dropped. Every
/// event is also mirrored to `tracing` at debug level.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: UnboundedSender<SyncEvent>,
}

/// Create a connected emitter and receiver.
pub fn channel() -> (EventEmitter, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventEmitter { tx }, rx)
}

impl EventEmitter {
    /// Emit an event.
    pub fn emit(&self, event: SyncEvent) {
        debug!(target: "patchsync::events", ?event);
        // A dropped receiver just means nobody is watching.
        let _ = self.tx.send(event);
    }

    /// Emit a progress update.
    pub fn progress(&self, percent: u8) {
        self.emit(SyncEvent::ProgressChanged(percent.min(100)));
    }

    /// Emit a status update.
    pub fn status(&self, text: impl Into<String>) {
        self.emit(SyncEvent::StatusChanged(text.into()));
    }

    /// Emit a log line.
    pub fn log(&self, text: impl Into<String>) {
        self.emit(SyncEvent::LogMessage(text.into()));
    }

    /// Emit the final event of a run.
    pub fn finished(&self, success: bool) {
        self.emit(SyncEvent::RunFinished(success));
    }
}

/// Observer of a run's events.
///
/// All callbacks default to doing nothing, so observers only implement what
/// they render.
pub trait SyncObserver: Send {
    /// Overall progress changed.
    fn on_progress(&mut self, _percent: u8) {}

    /// Status text changed.
    fn on_status(&mut self, _text: &str) {}

    /// A log line was emitted.
    fn on_log(&mut self, _text: &str) {}

    /// The run finished.
    fn on_finished(&mut self, _success: bool) {}
}

type ProgressFn = Box<dyn FnMut(u8) + Send>;
type TextFn = Box<dyn FnMut(&str) + Send>;
type FinishedFn = Box<dyn FnMut(bool) + Send>;

/// Observer built from closures.
///
/// ```
/// use patchsync::events::Callbacks;
///
/// let observer = Callbacks::new()
///     .on_progress(|percent| println!("{}%", percent))
///     .on_finished(|ok| println!("done: {}", ok));
/// # drop(observer);
/// ```
#[derive(Default)]
pub struct Callbacks {
    progress: Option<ProgressFn>,
    status: Option<TextFn>,
    log: Option<TextFn>,
    finished: Option<FinishedFn>,
}

impl Callbacks {
    /// Create an observer with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress callback.
    pub fn on_progress(mut self, f: impl FnMut(u8) + Send + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Set the status callback.
    pub fn on_status(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.status = Some(Box::new(f));
        self
    }

    /// Set the log callback.
    pub fn on_log(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.log = Some(Box::new(f));
        self
    }

    /// Set the finished callback.
    pub fn on_finished(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.finished = Some(Box::new(f));
        self
    }
}

impl SyncObserver for Callbacks {
    fn on_progress(&mut self, percent: u8) {
        if let Some(f) = self.progress.as_mut() {
            f(percent);
        }
    }

    fn on_status(&mut self, text: &str) {
        if let Some(f) = self.status.as_mut() {
            f(text);
        }
    }

    fn on_log(&mut self, text: &str) {
        if let Some(f) = self.log.as_mut() {
            f(text);
        }
    }

    fn on_finished(&mut self, success: bool) {
        if let Some(f) = self.finished.as_mut() {
            f(success);
        }
    }
}

/// Fans one event stream out to several observers, in insertion order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn SyncObserver>>,
}

impl ObserverSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    pub fn with(mut self, observer: impl SyncObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether the set has no observers.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl SyncObserver for ObserverSet {
    fn on_progress(&mut self, percent: u8) {
        self.observers.iter_mut().for_each(|o| o.on_progress(percent));
    }

    fn on_status(&mut self, text: &str) {
        self.observers.iter_mut().for_each(|o| o.on_status(text));
    }

    fn on_log(&mut self, text: &str) {
        self.observers.iter_mut().for_each(|o| o.on_log(text));
    }

    fn on_finished(&mut self, success: bool) {
        self.observers.iter_mut().for_each(|o| o.on_finished(success));
    }
}

/// Deliver every event from `rx` to `observer` until the stream closes.
///
/// Blocks the calling thread. Must not be called from within an async runtime.
pub fn dispatch(mut rx: EventReceiver, observer: &mut dyn SyncObserver) {
    while let Some(event) = rx.blocking_recv() {
        event.deliver(observer);
    }
}

/// Collect every event from `rx` until the stream closes.
///
/// Blocks the calling thread. Must not be called from within an async runtime.
pub fn drain(mut rx: EventReceiver) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.blocking_recv() {
        events.push(event);
    }
    events
}
