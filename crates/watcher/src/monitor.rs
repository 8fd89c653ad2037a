//! Polling directory monitor
//!
//! One background thread per monitor repeatedly captures a snapshot of the
//! watched directory, runs every registered recognizer against the previous
//! and current snapshots, and hands the resulting events to every listener.
//!
//! Lifecycle:
//! ```text
//! Stopped --start--> Running --suspend--> Suspended
//!    ^                  |  ^                  |
//!    |                  |  +-----resume-------+
//!    +------stop--------+---------stop--------+
//! ```

use crate::config::MonitorConfig;
use crate::event::{ChangeEvent, MonitorStatus};
use crate::listener::MonitorListener;
use crate::recognizer::{standard_recognizers, ChangeRecognizer};
use dirwatch_core::{DirectorySnapshot, MonitorError, Result};
use parking_lot::{Condvar, Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
    Suspended,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Stopped => "stopped",
            MonitorState::Running => "running",
            MonitorState::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

/// Lifecycle state plus the run it belongs to
///
/// Each `start()` bumps the generation; a polling thread exits as soon as
/// the generation it was spawned with is no longer current.
struct Control {
    state: MonitorState,
    generation: u64,
}

impl Control {
    /// Whether the run with this generation must exit
    fn ends(&self, generation: u64) -> bool {
        self.superseded(generation) || self.state == MonitorState::Stopped
    }

    /// Whether a later `start()` has begun a new run
    fn superseded(&self, generation: u64) -> bool {
        self.generation != generation
    }
}

/// State shared between the controlling handle and the polling thread
struct Shared {
    /// Absolute path of the watched directory
    root: PathBuf,
    recursive: bool,
    control: Mutex<Control>,
    /// Signalled on every state transition
    wakeup: Condvar,
    polling_delay_ms: AtomicU64,
    recognizers: RwLock<Vec<Arc<dyn ChangeRecognizer>>>,
    listeners: RwLock<Vec<Arc<dyn MonitorListener>>>,
    last_snapshot: RwLock<Option<Arc<DirectorySnapshot>>>,
    cycles: AtomicU64,
}

/// Polls a directory and publishes created/changed/deleted events
///
/// All methods take `&self`, so a monitor can be shared behind an `Arc`
/// between the thread that controls it and threads that register listeners.
pub struct DirectoryMonitor {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DirectoryMonitor {
    /// Create a stopped monitor with no recognizers or listeners
    pub fn new(root: impl Into<PathBuf>, recursive: bool, polling_delay: Duration) -> Result<Self> {
        let polling_delay_ms = delay_to_millis(polling_delay)?;
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);

        Ok(Self {
            shared: Arc::new(Shared {
                root,
                recursive,
                control: Mutex::new(Control {
                    state: MonitorState::Stopped,
                    generation: 0,
                }),
                wakeup: Condvar::new(),
                polling_delay_ms: AtomicU64::new(polling_delay_ms),
                recognizers: RwLock::new(Vec::new()),
                listeners: RwLock::new(Vec::new()),
                last_snapshot: RwLock::new(None),
                cycles: AtomicU64::new(0),
            }),
            handle: Mutex::new(None),
        })
    }

    /// Create a monitor with the standard Created/Changed/Deleted recognizers
    /// filtered by the configured patterns
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        let monitor = Self::new(&config.root, config.recursive, config.polling_delay())?;
        for recognizer in standard_recognizers(config.path_filter()?) {
            monitor.add_recognizer(recognizer);
        }
        Ok(monitor)
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    pub fn is_recursive(&self) -> bool {
        self.shared.recursive
    }

    pub fn state(&self) -> MonitorState {
        self.shared.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }

    pub fn polling_delay(&self) -> Duration {
        self.shared.polling_delay()
    }

    /// Change the delay; takes effect from the next wait
    pub fn set_polling_delay(&self, delay: Duration) -> Result<()> {
        let millis = delay_to_millis(delay)?;
        self.shared.polling_delay_ms.store(millis, Ordering::SeqCst);
        Ok(())
    }

    /// Capture the baseline snapshot and spawn the polling thread
    ///
    /// No events are produced for the baseline. Fails if the monitor is not
    /// stopped, or if the root cannot be listed (the monitor stays stopped).
    pub fn start(&self) -> Result<()> {
        {
            let control = self.shared.control.lock();
            if control.state != MonitorState::Stopped {
                return Err(invalid("start", control.state));
            }
        }

        // Captured without the lock so state queries are not blocked by a large scan
        let baseline = Arc::new(DirectorySnapshot::capture(&self.shared.root, self.shared.recursive)?);

        let mut control = self.shared.control.lock();
        if control.state != MonitorState::Stopped {
            // Another start() won the race while the baseline was captured
            return Err(invalid("start", control.state));
        }
        *self.shared.last_snapshot.write() = Some(Arc::clone(&baseline));

        control.generation += 1;
        control.state = MonitorState::Running;
        let generation = control.generation;
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("dirwatch-poll".to_string())
            .spawn(move || shared.run(baseline, generation));

        match spawned {
            Ok(handle) => {
                // A run stopped from its own thread left its handle behind; it exits on its own
                *self.handle.lock() = Some(handle);
                info!(
                    "Monitoring {} (recursive: {}, delay: {:?})",
                    self.shared.root.display(),
                    self.shared.recursive,
                    self.shared.polling_delay()
                );
                Ok(())
            }
            Err(e) => {
                control.state = MonitorState::Stopped;
                Err(MonitorError::Spawn(e))
            }
        }
    }

    /// Pause polling; the thread stays alive and keeps its previous snapshot
    pub fn suspend(&self) -> Result<()> {
        self.transition("suspend", MonitorState::Running, MonitorState::Suspended)?;
        info!("Suspended monitoring of {}", self.shared.root.display());
        self.shared.broadcast_status(&MonitorStatus::Suspended);
        Ok(())
    }

    /// Continue polling; changes made while suspended surface on the next cycle
    pub fn resume(&self) -> Result<()> {
        self.transition("resume", MonitorState::Suspended, MonitorState::Running)?;
        info!("Resumed monitoring of {}", self.shared.root.display());
        self.shared.broadcast_status(&MonitorStatus::Resumed);
        Ok(())
    }

    /// Signal the polling thread to exit and wait for it
    ///
    /// An in-flight cycle is finished first. When called from a listener on
    /// the polling thread itself the thread is not joined; it exits once the
    /// current cycle completes.
    pub fn stop(&self) -> Result<()> {
        {
            let mut control = self.shared.control.lock();
            match control.state {
                MonitorState::Running | MonitorState::Suspended => control.state = MonitorState::Stopped,
                MonitorState::Stopped => return Err(invalid("stop", control.state)),
            }
            self.shared.wakeup.notify_all();
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                debug!("stop() called from the polling thread; not joining");
            } else if handle.join().is_err() {
                warn!("Polling thread for {} panicked", self.shared.root.display());
            }
        }
        Ok(())
    }

    pub fn add_recognizer(&self, recognizer: Arc<dyn ChangeRecognizer>) {
        self.shared.recognizers.write().push(recognizer);
    }

    /// Remove a recognizer by identity; returns whether it was registered
    pub fn remove_recognizer(&self, recognizer: &Arc<dyn ChangeRecognizer>) -> bool {
        let mut recognizers = self.shared.recognizers.write();
        let before = recognizers.len();
        recognizers.retain(|r| !same_instance(r, recognizer));
        recognizers.len() != before
    }

    pub fn recognizer_count(&self) -> usize {
        self.shared.recognizers.read().len()
    }

    /// Register a listener; events are delivered in registration order
    pub fn add_listener(&self, listener: Arc<dyn MonitorListener>) {
        self.shared.listeners.write().push(listener);
    }

    /// Remove a listener by identity; returns whether it was registered
    pub fn remove_listener(&self, listener: &Arc<dyn MonitorListener>) -> bool {
        let mut listeners = self.shared.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_instance(l, listener));
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    /// Most recent snapshot (the baseline until the first cycle completes)
    pub fn last_snapshot(&self) -> Option<Arc<DirectorySnapshot>> {
        self.shared.last_snapshot.read().clone()
    }

    /// Number of completed capture/diff/dispatch cycles across all runs
    pub fn cycles_completed(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    fn transition(&self, operation: &'static str, from: MonitorState, to: MonitorState) -> Result<()> {
        let mut control = self.shared.control.lock();
        if control.state != from {
            return Err(invalid(operation, control.state));
        }
        control.state = to;
        self.shared.wakeup.notify_all();
        Ok(())
    }
}

impl Drop for DirectoryMonitor {
    fn drop(&mut self) {
        if self.state() != MonitorState::Stopped {
            let _ = self.stop();
        }
    }
}

impl fmt::Debug for DirectoryMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryMonitor")
            .field("root", &self.shared.root)
            .field("recursive", &self.shared.recursive)
            .field("state", &self.state())
            .field("polling_delay", &self.polling_delay())
            .finish()
    }
}

impl Shared {
    fn polling_delay(&self) -> Duration {
        Duration::from_millis(self.polling_delay_ms.load(Ordering::SeqCst))
    }

    /// Polling loop body, run on the dedicated thread
    fn run(self: Arc<Self>, baseline: Arc<DirectorySnapshot>, generation: u64) {
        self.broadcast_status(&MonitorStatus::Started {
            root: self.root.clone(),
        });

        let mut previous = baseline;
        while self.wait_for_tick(generation) {
            let current = match DirectorySnapshot::capture(&self.root, self.recursive) {
                Ok(snapshot) => Arc::new(snapshot),
                Err(e) => {
                    warn!("Snapshot of {} failed: {}", self.root.display(), e);
                    let path = match &e {
                        MonitorError::FilesystemAccess { path, .. } => path.clone(),
                        _ => self.root.clone(),
                    };
                    self.broadcast_status(&MonitorStatus::ScanFailed {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            // Registrations made before this point are observed by this cycle
            let recognizers = self.recognizers.read().clone();
            let listeners = self.listeners.read().clone();

            let mut dispatched = 0usize;
            for recognizer in &recognizers {
                match recognizer.recognize(&previous, &current) {
                    Ok(events) => {
                        for event in &events {
                            self.dispatch_change(&listeners, event);
                        }
                        dispatched += events.len();
                    }
                    Err(e) => {
                        warn!("Recognizer {} failed: {}", recognizer.name(), e);
                        self.broadcast_to(
                            &listeners,
                            &MonitorStatus::RecognizerFailed {
                                recognizer: recognizer.name().to_string(),
                                message: e.to_string(),
                            },
                        );
                    }
                }
            }

            if dispatched > 0 {
                debug!("Cycle found {} changes in {} entries", dispatched, current.len());
            }

            {
                // A restart during this cycle owns the shared results from now on
                let control = self.control.lock();
                if control.superseded(generation) {
                    break;
                }
                *self.last_snapshot.write() = Some(Arc::clone(&current));
                self.cycles.fetch_add(1, Ordering::SeqCst);
            }
            previous = current;
        }

        if self.control.lock().superseded(generation) {
            debug!("Run {} of {} superseded by a restart", generation, self.root.display());
            return;
        }
        info!("Stopped monitoring {}", self.root.display());
        self.broadcast_status(&MonitorStatus::Stopped);
    }

    /// Sleep one polling delay, then block while suspended
    ///
    /// Returns false once this run has been stopped. Stop interrupts the
    /// delay; suspend/resume during the delay do not shorten it.
    fn wait_for_tick(&self, generation: u64) -> bool {
        let mut control = self.control.lock();
        loop {
            let deadline = Instant::now() + self.polling_delay();
            while !control.ends(generation) {
                if self.wakeup.wait_until(&mut control, deadline).timed_out() {
                    break;
                }
            }

            if control.ends(generation) {
                return false;
            }
            if control.state == MonitorState::Running {
                return true;
            }

            while control.state == MonitorState::Suspended && !control.ends(generation) {
                self.wakeup.wait(&mut control);
            }
        }
    }

    fn dispatch_change(&self, listeners: &[Arc<dyn MonitorListener>], event: &ChangeEvent) {
        for listener in listeners {
            let failure = match panic::catch_unwind(AssertUnwindSafe(|| listener.on_change(event))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };

            warn!("Listener failed handling {}: {}", event, failure);
            self.broadcast_to(
                listeners,
                &MonitorStatus::ListenerFailed {
                    message: format!("{}: {}", event, failure),
                },
            );
        }
    }

    fn broadcast_status(&self, status: &MonitorStatus) {
        let listeners = self.listeners.read().clone();
        self.broadcast_to(&listeners, status);
    }

    /// Status delivery failures are only logged
    fn broadcast_to(&self, listeners: &[Arc<dyn MonitorListener>], status: &MonitorStatus) {
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_status(status))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Listener failed handling status '{}': {:#}", status, e),
                Err(payload) => warn!(
                    "Listener panicked handling status '{}': {}",
                    status,
                    panic_message(payload.as_ref())
                ),
            }
        }
    }
}

fn delay_to_millis(delay: Duration) -> Result<u64> {
    match u64::try_from(delay.as_millis()) {
        Ok(0) => Err(MonitorError::InvalidDelay),
        Ok(millis) => Ok(millis),
        Err(_) => Ok(u64::MAX),
    }
}

fn invalid(operation: &'static str, state: MonitorState) -> MonitorError {
    MonitorError::InvalidState {
        operation,
        state: state.to_string(),
    }
}

/// Pointer identity, ignoring vtables
fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
