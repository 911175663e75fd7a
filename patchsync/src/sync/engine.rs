//! Background execution of sync runs.
//!
//! [`SyncEngine::start`] spawns one worker thread per run and hands back a
//! [`RunHandle`] for cancellation, event subscription, and joining. At most
//! one run is active per engine at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use super::orchestrator::SyncOrchestrator;
use super::state::RunOutcome;
use crate::cancel::CancelFlag;
use crate::config::{SyncConfig, SyncMode};
use crate::error::{SyncError, SyncResult};
use crate::events::{self, EventReceiver, SyncObserver};
use crate::transport::{HttpTransport, ReqwestTransport};

const WORKER_THREAD_NAME: &str = "patchsync-run";
const DISPATCH_THREAD_NAME: &str = "patchsync-events";

/// Starts sync runs on background threads.
#[derive(Clone)]
pub struct SyncEngine {
    config: SyncConfig,
    transport: Arc<dyn HttpTransport>,
    active: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Create an engine using the default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the HTTP client cannot be built.
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let transport =
            ReqwestTransport::new().map_err(|e| SyncError::Config(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create an engine using a custom transport.
    pub fn with_transport(config: SyncConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configuration runs are started with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Whether a run started by this engine is still executing.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a run in `mode` on a new worker thread.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Config`] if no manifest URL is configured for `mode`
    /// - [`SyncError::AlreadyRunning`] while a previous run is still executing
    /// - [`SyncError::Worker`] if the thread cannot be spawned
    pub fn start(&self, mode: SyncMode) -> SyncResult<RunHandle> {
        self.config.manifest_url(mode)?;

        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }
        let guard = ActiveGuard(Arc::clone(&self.active));

        let cancel = CancelFlag::new();
        let (emitter, receiver) = events::channel();
        let orchestrator = SyncOrchestrator::new(
            self.config.clone(),
            mode,
            Arc::clone(&self.transport),
            emitter,
            cancel.clone(),
        );

        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let _guard = guard;
                orchestrator.run()
            })
            .map_err(|e| SyncError::Worker(format!("failed to spawn worker: {}", e)))?;

        debug!(mode = %mode, "Sync worker spawned");

        Ok(RunHandle {
            cancel,
            worker: Some(worker),
            receiver: Some(receiver),
            dispatcher: None,
        })
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Clears the engine's active flag when the worker exits, even on panic.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running sync.
///
/// Events are buffered from the moment the run starts, so subscribing late
/// loses nothing.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancelFlag,
    worker: Option<JoinHandle<RunOutcome>>,
    receiver: Option<EventReceiver>,
    dispatcher: Option<JoinHandle<()>>,
}

impl RunHandle {
    /// Request cancellation. The worker stops before the next entry or chunk.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The run's cancellation flag, e.g. for a signal handler.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Deliver all events of this run to `observer` on a dispatcher thread.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Worker`] if the events were already taken or the
    /// dispatcher thread cannot be spawned.
    pub fn subscribe(&mut self, mut observer: impl SyncObserver + 'static) -> SyncResult<()> {
        let receiver = self.take_events()?;
        let dispatcher = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_string())
            .spawn(move || events::dispatch(receiver, &mut observer))
            .map_err(|e| SyncError::Worker(format!("failed to spawn dispatcher: {}", e)))?;
        self.dispatcher = Some(dispatcher);
        Ok(())
    }

    /// Take the raw event receiver for a custom consumer.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Worker`] if the events were already taken.
    pub fn take_events(&mut self) -> SyncResult<EventReceiver> {
        self.receiver
            .take()
            .ok_or_else(|| SyncError::Worker("run events already taken".to_string()))
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the run to finish and for all events to be delivered.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Worker`] if the worker or dispatcher panicked.
    pub fn wait(mut self) -> SyncResult<RunOutcome> {
        let outcome = match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|panic| SyncError::Worker(panic_message(panic.as_ref())))?,
            None => return Err(SyncError::Worker("run already joined".to_string())),
        };

        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher
                .join()
                .map_err(|panic| SyncError::Worker(panic_message(panic.as_ref())))?;
        }

        Ok(outcome)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {}", text)
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("worker panicked: {}", text)
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Callbacks, SyncEvent};
    use crate::transport::memory::MemoryTransport;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    const URL: &str = "http://x/update.json";

    fn engine(temp: &TempDir, transport: &Arc<MemoryTransport>) -> SyncEngine {
        let config = SyncConfig::new(temp.path()).with_update_manifest(URL);
        SyncEngine::with_transport(config, Arc::clone(transport) as Arc<dyn HttpTransport>)
    }

    #[test]
    fn test_start_without_url_fails_before_spawning() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        let engine = engine(&temp, &transport);

        let err = engine.start(SyncMode::FullCheck).unwrap_err();

        assert!(matches!(err, SyncError::Config(_)));
        assert!(!engine.is_running());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_late_subscriber_sees_all_events() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve(URL, br#"{"files":[]}"#.to_vec());
        let engine = engine(&temp, &transport);

        let mut handle = engine.start(SyncMode::Update).unwrap();
        while !handle.is_finished() {
            std::thread::yield_now();
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        handle
            .subscribe(
                Callbacks::new()
                    .on_progress({
                        let sink = Arc::clone(&sink);
                        move |p| sink.lock().push(SyncEvent::ProgressChanged(p))
                    })
                    .on_finished(move |ok| sink.lock().push(SyncEvent::RunFinished(ok))),
            )
            .unwrap();
        let outcome = handle.wait().unwrap();

        assert!(outcome.is_success());
        assert_eq!(
            *seen.lock(),
            vec![SyncEvent::ProgressChanged(100), SyncEvent::RunFinished(true)]
        );
    }

    #[test]
    fn test_events_can_only_be_taken_once() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve(URL, br#"{"files":[]}"#.to_vec());

        let mut handle = engine(&temp, &transport).start(SyncMode::Update).unwrap();
        let events = handle.take_events().unwrap();

        assert!(handle.take_events().is_err());
        assert!(handle.wait().unwrap().is_success());
        assert_eq!(events::drain(events).last(), Some(&SyncEvent::RunFinished(true)));
    }

    #[test]
    fn test_engine_is_reusable_after_run() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve(URL, br#"{"files":[]}"#.to_vec());
        let engine = engine(&temp, &transport);

        engine.start(SyncMode::Update).unwrap().wait().unwrap();
        assert!(!engine.is_running());

        let second = engine.start(SyncMode::Update).unwrap();
        assert!(second.wait().unwrap().is_success());
    }
}
