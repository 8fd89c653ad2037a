//! Common utilities for integration tests

use crossbeam_channel::{Receiver, RecvTimeoutError};
use dirwatch_watcher::{
    standard_recognizers, ChangeEvent, ChangeKind, ChannelListener, DirectoryMonitor, MonitorMessage,
    MonitorStatus,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;

/// Polling delay used by every scenario
pub const DELAY: Duration = Duration::from_millis(200);

/// Upper bound when waiting for an expected notification
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Route monitor logs through the test writer
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A monitor over `<tmp>/watched` with the standard recognizers and a channel listener
pub struct Harness {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub monitor: DirectoryMonitor,
    pub rx: Receiver<MonitorMessage>,
}

impl Harness {
    pub fn new(recursive: bool) -> Self {
        init_tracing();

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("watched");
        std::fs::create_dir(&root).unwrap();

        let monitor = DirectoryMonitor::new(&root, recursive, DELAY).unwrap();
        for recognizer in standard_recognizers(None) {
            monitor.add_recognizer(recognizer);
        }

        let (listener, rx) = ChannelListener::unbounded();
        monitor.add_listener(Arc::new(listener));

        Self {
            temp_dir,
            root,
            monitor,
            rx,
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Wait until the polling loop has completed at least `n` cycles in total
    pub fn wait_for_cycles(&self, n: u64) {
        let deadline = Instant::now() + TIMEOUT;
        while self.monitor.cycles_completed() < n {
            assert!(Instant::now() < deadline, "monitor never reached {} cycles", n);
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Wait for a change of `kind` on `path`, skipping anything else
    pub fn expect_change(&self, kind: ChangeKind, path: &Path) -> ChangeEvent {
        self.expect_change_within(kind, path, TIMEOUT)
    }

    pub fn expect_change_within(&self, kind: ChangeKind, path: &Path, timeout: Duration) -> ChangeEvent {
        let deadline = Instant::now() + timeout;
        loop {
            match self.recv_until(deadline) {
                Some(MonitorMessage::Change(event)) if event.kind() == kind && event.path() == path => {
                    return event
                }
                Some(_) => continue,
                None => panic!("no {} event for {} within {:?}", kind, path.display(), timeout),
            }
        }
    }

    /// Wait for a status matching `pred`, skipping anything else
    pub fn expect_status(&self, pred: impl Fn(&MonitorStatus) -> bool) -> MonitorStatus {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            match self.recv_until(deadline) {
                Some(MonitorMessage::Status(status)) if pred(&status) => return status,
                Some(_) => continue,
                None => panic!("expected status not received within {:?}", TIMEOUT),
            }
        }
    }

    /// Every change event delivered during `window`
    pub fn changes_during(&self, window: Duration) -> Vec<ChangeEvent> {
        let deadline = Instant::now() + window;
        let mut changes = Vec::new();
        while let Some(message) = self.recv_until(deadline) {
            if let MonitorMessage::Change(event) = message {
                changes.push(event);
            }
        }
        changes
    }

    /// Discard everything queued so far
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    fn recv_until(&self, deadline: Instant) -> Option<MonitorMessage> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.monitor.stop();
    }
}
