//! Listener capability and ready-made adapters

use crate::event::{ChangeEvent, MonitorMessage, MonitorStatus};
use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Receiver of change and status events
///
/// Called synchronously on the monitor's polling thread (status events for
/// start/suspend/resume arrive on the calling thread). Errors are reported
/// back as [`MonitorStatus::ListenerFailed`] and never stop the monitor.
pub trait MonitorListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent) -> Result<()>;

    fn on_status(&self, _status: &MonitorStatus) -> Result<()> {
        Ok(())
    }
}

/// Forwards every notification into a crossbeam channel
pub struct ChannelListener {
    tx: Sender<MonitorMessage>,
}

impl ChannelListener {
    pub fn new(tx: Sender<MonitorMessage>) -> Self {
        Self { tx }
    }

    /// Listener plus the receiving end of its channel
    pub fn unbounded() -> (Self, Receiver<MonitorMessage>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }
}

impl MonitorListener for ChannelListener {
    fn on_change(&self, event: &ChangeEvent) -> Result<()> {
        self.tx
            .send(MonitorMessage::Change(event.clone()))
            .map_err(|_| anyhow::anyhow!("channel receiver dropped"))
    }

    fn on_status(&self, status: &MonitorStatus) -> Result<()> {
        self.tx
            .send(MonitorMessage::Status(status.clone()))
            .map_err(|_| anyhow::anyhow!("channel receiver dropped"))
    }
}

/// Adapts a closure into a change-only listener
pub struct FnListener<F> {
    f: F,
}

impl<F> FnListener<F>
where
    F: Fn(&ChangeEvent) -> Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> MonitorListener for FnListener<F>
where
    F: Fn(&ChangeEvent) -> Result<()> + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) -> Result<()> {
        (self.f)(event)
    }
}
