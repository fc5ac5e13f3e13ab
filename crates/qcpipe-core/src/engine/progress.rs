//! Per-calculation ordered progress streams.
//!
//! The producer side lives on a worker thread and must never block:
//! events go through an unbounded channel, so the terminal event can
//! always be delivered. The consumer side pulls with an idle timeout
//! and synthesizes `Heartbeat` events that are never queued.

use crate::analysis::properties::ElectronicProperties;
use crate::core::models::ids::CalculationId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;
use tracing::debug;

/// Idle interval after which the consumer emits a heartbeat. Purely a
/// liveness signal; it never cancels the underlying work.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress {
        iteration: usize,
        energy: f64,
        grad_norm: f64,
        /// Current geometry in angstrom, flattened.
        positions: Vec<f64>,
    },
    Completed {
        converged: bool,
        iterations: usize,
        final_energy: f64,
        final_grad_norm: f64,
        properties: ElectronicProperties,
        positions: Vec<f64>,
    },
    Error {
        message: String,
    },
    Heartbeat,
}

impl ProgressEvent {
    /// A stream carries exactly one terminal event and ends with it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}

struct ChannelSlot {
    sender: UnboundedSender<ProgressEvent>,
    receiver: Option<UnboundedReceiver<ProgressEvent>>,
}

/// Table of live progress channels, one per streaming calculation.
///
/// A channel is opened at submission, claimed by at most one
/// subscriber, and torn down when the subscriber consumes a terminal
/// event or disconnects.
#[derive(Default)]
pub struct ProgressHub {
    channels: Mutex<HashMap<CalculationId, ChannelSlot>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the channel for a calculation. Called once, at submission.
    pub fn open(&self, id: CalculationId) {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.channels
            .lock()
            .expect("progress table lock poisoned")
            .insert(
                id,
                ChannelSlot {
                    sender,
                    receiver: Some(receiver),
                },
            );
    }

    /// Producer handle for the worker thread. `None` once the channel
    /// has been torn down.
    pub fn sink(&self, id: CalculationId) -> Option<ProgressSink> {
        self.channels
            .lock()
            .expect("progress table lock poisoned")
            .get(&id)
            .map(|slot| ProgressSink {
                id,
                sender: slot.sender.clone(),
            })
    }

    /// Claims the consumer end of a channel. At most one subscriber per
    /// calculation; later calls return `None`.
    pub fn subscribe(
        self: &Arc<Self>,
        id: CalculationId,
        idle_timeout: Duration,
    ) -> Option<ProgressStream> {
        let receiver = self
            .channels
            .lock()
            .expect("progress table lock poisoned")
            .get_mut(&id)
            .and_then(|slot| slot.receiver.take())?;
        Some(ProgressStream {
            id,
            receiver,
            idle_timeout,
            finished: false,
            hub: Arc::clone(self),
        })
    }

    /// Removes the channel entry. Outstanding sinks keep working but
    /// their events go nowhere.
    pub fn close(&self, id: CalculationId) {
        self.channels
            .lock()
            .expect("progress table lock poisoned")
            .remove(&id);
    }

    #[cfg(test)]
    fn is_open(&self, id: CalculationId) -> bool {
        self.channels
            .lock()
            .expect("progress table lock poisoned")
            .contains_key(&id)
    }
}

/// Producer end of one calculation's progress channel.
///
/// Sends never block. A send after the subscriber disconnected is
/// silently discarded; disconnection never cancels the computation.
#[derive(Clone)]
pub struct ProgressSink {
    id: CalculationId,
    sender: UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    pub fn send(&self, event: ProgressEvent) {
        if self.sender.send(event).is_err() {
            debug!(id = %self.id, "progress subscriber gone, dropping event");
        }
    }
}

/// Consumer end of one calculation's progress channel.
///
/// Yields events in strict FIFO order, interleaving synthesized
/// heartbeats while idle, and ends after the first terminal event.
/// Dropping the stream tears down the channel table entry.
pub struct ProgressStream {
    id: CalculationId,
    receiver: UnboundedReceiver<ProgressEvent>,
    idle_timeout: Duration,
    finished: bool,
    hub: Arc<ProgressHub>,
}

impl ProgressStream {
    pub fn id(&self) -> CalculationId {
        self.id
    }

    /// Waits for the next event. Returns `Heartbeat` on idle timeout
    /// and `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        match timeout(self.idle_timeout, self.receiver.recv()).await {
            Err(_) => Some(ProgressEvent::Heartbeat),
            Ok(Some(event)) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Some(event)
            }
            Ok(None) => {
                self.finished = true;
                None
            }
        }
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        self.hub.close(self.id);
    }
}
