//! Sends waiting for a connect attempt to settle.
//!
//! While the connection is `Connecting`, each `send` becomes a
//! [`PendingSend`] in the [`SendQueue`]. When the attempt settles, the
//! queue is flushed once, in call order. Each entry hands its frame to the
//! transport (on success only) and then resolves its completion before the
//! next entry runs.
//!
//! Flushing runs without the state lock held.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::transport::{Transport, TransportEvent};

use super::state::{Notifier, Resolution};

// ============================================================================
// PendingSend
// ============================================================================

/// A deferred send: an encoded frame plus the caller's completion.
///
/// `frame` is `None` for a bare `open` request that only waits for the
/// outcome.
#[derive(Debug)]
pub(crate) struct PendingSend {
    /// Encoded envelope.
    frame: Option<String>,
    /// Completion to resolve.
    notifier: Notifier,
}

impl PendingSend {
    /// Creates an entry that sends `frame` once the connection is ready.
    pub(crate) fn frame(frame: String, notifier: Notifier) -> Self {
        Self {
            frame: Some(frame),
            notifier,
        }
    }

    /// Creates an entry that only waits for the attempt to settle.
    pub(crate) fn wait(notifier: Notifier) -> Self {
        Self {
            frame: None,
            notifier,
        }
    }

    /// Hands the frame to `transport` if `resolution` succeeded.
    ///
    /// Returns the notice resolving the caller's completion. A transport
    /// that refuses the frame turns the notice into a failure.
    pub(crate) fn deliver(
        self,
        transport: Option<&dyn Transport>,
        resolution: &Resolution,
    ) -> Notice {
        let outcome = match (self.frame, transport) {
            (Some(frame), Some(transport)) if resolution.status => {
                match transport.send(frame) {
                    Ok(()) => resolution.clone(),
                    Err(e) => {
                        warn!(error = %e, "Transport rejected frame");
                        Resolution::failed(TransportEvent::error(e.to_string()))
                    }
                }
            }
            (Some(_), None) if resolution.status => {
                warn!("Connection ready without a transport, frame dropped");
                Resolution::failed(TransportEvent::error("no transport"))
            }
            _ => resolution.clone(),
        };

        Notice {
            notifier: self.notifier,
            resolution: outcome,
        }
    }
}

// ============================================================================
// Notice
// ============================================================================

/// A completion ready to be resolved.
#[derive(Debug)]
pub(crate) struct Notice {
    /// Completion to resolve.
    notifier: Notifier,
    /// Outcome to deliver.
    resolution: Resolution,
}

impl Notice {
    /// Resolves the completion.
    pub(crate) fn fire(self) {
        self.notifier.notify(self.resolution);
    }
}

// ============================================================================
// SendQueue
// ============================================================================

/// FIFO of sends issued while connecting.
///
/// Unbounded. Entries are never deduplicated or reordered.
#[derive(Debug, Default)]
pub(crate) struct SendQueue {
    /// Entries in call order.
    entries: VecDeque<PendingSend>,
}

impl SendQueue {
    /// Appends an entry.
    pub(crate) fn enqueue(&mut self, entry: PendingSend) {
        self.entries.push_back(entry);
        trace!(depth = self.entries.len(), "Send queued");
    }

    /// Delivers and resolves every entry with `resolution` in enqueue
    /// order, emptying the queue. Returns the number of entries flushed.
    pub(crate) fn flush(
        &mut self,
        transport: Option<&dyn Transport>,
        resolution: &Resolution,
    ) -> usize {
        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            entry.deliver(transport, resolution).fire();
        }
        count
    }

    /// Returns the number of queued entries.
    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
