//! In-process transport driven by the caller.
//!
//! [`MemoryConnector`] records every connect attempt as a [`MemoryLink`].
//! The caller plays the remote end: it fires `open`, `fail`, `close` and
//! `deliver` on the link and inspects the frames the manager sent.
//!
//! # Example
//!
//! ```
//! use socket_relay::transport::MemoryConnector;
//! use socket_relay::Manager;
//!
//! # fn main() -> socket_relay::Result<()> {
//! let connector = MemoryConnector::new();
//! let manager = Manager::builder()
//!     .url("ws://relay.test/socket")
//!     .connector(connector.clone())
//!     .build()?;
//!
//! manager.send("ping", &1)?;
//! let link = connector.last().expect("send starts an attempt");
//! link.open();
//!
//! assert_eq!(link.sent(), vec![r#"{"type":"ping","data":1}"#.to_string()]);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};

use super::{Connector, EventSink, Transport, TransportEvent};

// ============================================================================
// MemoryTransport
// ============================================================================

/// Transport that records outgoing frames.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    /// Frames accepted by `send`, in order.
    sent: Mutex<Vec<String>>,
    /// Set once `close` was called.
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Returns a copy of all frames sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Returns `true` if the manager asked this transport to close.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, frame: String) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        trace!(len = frame.len(), "Memory transport frame");
        self.sent.lock().push(frame);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// MemoryLink
// ============================================================================

/// One connect attempt made through a [`MemoryConnector`].
#[derive(Debug, Clone)]
pub struct MemoryLink {
    /// Event sink for this attempt.
    sink: EventSink,
    /// Transport handed to the manager.
    transport: Arc<MemoryTransport>,
}

impl MemoryLink {
    /// Reports the connection as open.
    pub fn open(&self) {
        self.sink.emit(TransportEvent::Open);
    }

    /// Reports a transport error.
    pub fn fail(&self, message: impl Into<String>) {
        self.sink.emit(TransportEvent::error(message));
    }

    /// Reports the connection as closed.
    pub fn close(&self, code: Option<u16>, reason: impl Into<String>) {
        self.sink.emit(TransportEvent::close(code, reason));
    }

    /// Delivers an incoming text frame.
    pub fn deliver(&self, text: impl Into<String>) {
        self.sink.emit(TransportEvent::message(text));
    }

    /// Emits an arbitrary event.
    pub fn emit(&self, event: TransportEvent) {
        self.sink.emit(event);
    }

    /// Returns the frames the manager sent on this link.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.transport.sent()
    }

    /// Returns `true` if the manager closed this link.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// Shared connector state.
#[derive(Debug, Default)]
struct ConnectorState {
    /// Links in attempt order.
    links: Vec<MemoryLink>,
    /// Error message for the next refused attempt.
    refuse_next: Option<String>,
}

/// Connector that hands out [`MemoryTransport`]s.
///
/// Clones share the same attempt list.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    /// Shared state.
    state: Arc<Mutex<ConnectorState>>,
}

impl MemoryConnector {
    /// Creates a connector with no attempts.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `connect` call fail synchronously with `message`.
    pub fn refuse_next(&self, message: impl Into<String>) {
        self.state.lock().refuse_next = Some(message.into());
    }

    /// Returns the number of connect attempts made.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.state.lock().links.len()
    }

    /// Returns the link for the attempt at `index`.
    #[must_use]
    pub fn link(&self, index: usize) -> Option<MemoryLink> {
        self.state.lock().links.get(index).cloned()
    }

    /// Returns the most recent link.
    #[must_use]
    pub fn last(&self) -> Option<MemoryLink> {
        self.state.lock().links.last().cloned()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, url: &Url, events: EventSink) -> Result<Arc<dyn Transport>> {
        let mut state = self.state.lock();

        if let Some(message) = state.refuse_next.take() {
            return Err(Error::transport(message));
        }

        trace!(%url, attempt = %events.attempt(), "Memory connect");

        let transport = Arc::new(MemoryTransport::default());
        state.links.push(MemoryLink {
            sink: events,
            transport: Arc::clone(&transport),
        });

        Ok(transport)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::AttemptId;

    fn url() -> Url {
        Url::parse("ws://relay.test/").unwrap()
    }

    #[test]
    fn test_records_links_in_order() {
        let connector = MemoryConnector::new();
        let first = AttemptId::default().next();

        connector
            .connect(&url(), EventSink::new(first, |_, _| {}))
            .unwrap();
        connector
            .connect(&url(), EventSink::new(first.next(), |_, _| {}))
            .unwrap();

        assert_eq!(connector.attempts(), 2);
        assert_eq!(connector.link(0).unwrap().sink.attempt(), first);
        assert_eq!(connector.last().unwrap().sink.attempt(), first.next());
    }

    #[test]
    fn test_refuse_next_only_once() {
        let connector = MemoryConnector::new();
        connector.refuse_next("down");

        let sink = EventSink::new(AttemptId::default(), |_, _| {});
        assert!(connector.connect(&url(), sink.clone()).is_err());
        assert!(connector.connect(&url(), sink).is_ok());
        assert_eq!(connector.attempts(), 1);
    }

    #[test]
    fn test_closed_transport_rejects_frames() {
        let transport = MemoryTransport::default();
        transport.send("a".into()).unwrap();
        transport.close();

        assert!(transport.is_closed());
        assert!(matches!(
            transport.send("b".into()),
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(transport.sent(), vec!["a".to_string()]);
    }
}
