//! Fan-out of translated MIDI events to the attached sinks
//!
//! Every sink gets its own bounded queue and worker task: one stalled or
//! broken output must never delay or silence the others. Per-sink event
//! order equals arrival order; dropped events are not redelivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use rimshot_midi::{BoxedSink, MidiEvent};

/// Events queued per sink before non-blocking sends start dropping
const QUEUE_DEPTH: usize = 256;
/// Consecutive delivery failures before a sink is marked degraded
const DEGRADE_AFTER: u32 = 5;

struct SinkHandle {
    name: String,
    tx: mpsc::Sender<MidiEvent>,
    degraded: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Owns the set of attached sinks and fans events out to them
#[derive(Default)]
pub struct Dispatcher {
    sinks: Vec<SinkHandle>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sink; it receives all subsequent dispatches.
    pub fn attach(&mut self, sink: BoxedSink) {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let degraded = Arc::new(AtomicBool::new(false));
        let worker = tokio::spawn(deliver(sink, rx, Arc::clone(&degraded)));
        debug!("attached sink {name}");
        self.sinks.push(SinkHandle {
            name,
            tx,
            degraded,
            worker,
        });
    }

    /// Detach one sink by name. Its queue is drained and the sink closed
    /// before this returns.
    pub async fn detach(&mut self, name: &str) -> bool {
        let Some(position) = self.sinks.iter().position(|sink| sink.name == name) else {
            return false;
        };
        let handle = self.sinks.remove(position);
        shut_down(handle).await;
        true
    }

    /// Deliver events to every attached sink, in attachment order,
    /// preserving the event sequence per sink. Sends are non-blocking: a
    /// sink whose queue is full loses the event instead of stalling the
    /// event loop, and a failing sink never affects the others.
    pub fn dispatch(&self, events: &[MidiEvent]) {
        for event in events {
            for sink in &self.sinks {
                if sink.degraded.load(Ordering::Relaxed) {
                    continue;
                }
                match sink.tx.try_send(*event) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("sink {} queue full, dropping event", sink.name);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        warn!("sink {} is gone, dropping event", sink.name);
                    }
                }
            }
        }
    }

    /// Attached sinks that are still healthy
    pub fn active_sinks(&self) -> usize {
        self.sinks
            .iter()
            .filter(|sink| !sink.degraded.load(Ordering::Relaxed))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Detach every sink in reverse-of-attach (LIFO) order, draining each
    /// queue so in-flight events complete.
    pub async fn close(&mut self) {
        while let Some(handle) = self.sinks.pop() {
            shut_down(handle).await;
        }
    }
}

async fn shut_down(handle: SinkHandle) {
    // Closing the channel lets the worker drain the queue, close the
    // sink, and exit on its own.
    drop(handle.tx);
    if let Err(e) = handle.worker.await {
        if !e.is_cancelled() {
            warn!("sink {} worker panicked: {e}", handle.name);
        }
    }
    debug!("detached sink {}", handle.name);
}

async fn deliver(mut sink: BoxedSink, mut rx: mpsc::Receiver<MidiEvent>, degraded: Arc<AtomicBool>) {
    let mut failures = 0u32;
    while let Some(event) = rx.recv().await {
        if degraded.load(Ordering::Relaxed) {
            continue;
        }
        match sink.accept(&event).await {
            Ok(()) => failures = 0,
            Err(e) => {
                failures += 1;
                warn!("sink {} rejected event: {e}", sink.name());
                if failures >= DEGRADE_AFTER {
                    error!(
                        "sink {} marked degraded after {failures} consecutive failures",
                        sink.name()
                    );
                    degraded.store(true, Ordering::Relaxed);
                }
            }
        }
    }
    if let Err(e) = sink.close().await {
        warn!("closing sink {}: {e}", sink.name());
    }
}
