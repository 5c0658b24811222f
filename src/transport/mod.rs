//! Transport seam.
//!
//! The manager does not own any socket code. It drives a [`Transport`]
//! created by a [`Connector`] once per connect attempt and receives the
//! transport's lifecycle through an [`EventSink`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   connect(url, sink)   ┌─────────────────┐
//! │  Manager        │ ──────────────────────►│  Connector      │
//! │                 │                        └────────┬────────┘
//! │  state machine  │   send / close                  │ creates
//! │                 │ ──────────────────────►┌────────▼────────┐
//! │                 │◄────────────────────── │  Transport      │
//! └─────────────────┘   EventSink::emit      └─────────────────┘
//!                       open/close/error/message
//! ```
//!
//! # Contract
//!
//! - `Connector::connect`, `Transport::send` and `Transport::close` are
//!   non-blocking and never call back into the manager on the calling
//!   thread. Events are emitted later, from the transport's own task.
//! - Each sink is bound to one attempt; events emitted after a newer
//!   attempt started are discarded.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite client transport |
//! | `memory` | In-process transport for tests |

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport driven by the caller.
pub mod memory;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::Result;
use crate::identifiers::AttemptId;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryConnector, MemoryLink, MemoryTransport};
pub use websocket::{WsConnector, WsTransport};

// ============================================================================
// TransportEvent
// ============================================================================

/// A raw lifecycle or data event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is ready for frames.
    Open,

    /// The connection is closed.
    Close {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason, possibly empty.
        reason: String,
    },

    /// The transport failed.
    Error {
        /// Description of the failure.
        message: String,
    },

    /// A text frame arrived.
    Message {
        /// Raw frame text.
        text: String,
    },
}

impl TransportEvent {
    /// Creates a close event.
    #[inline]
    #[must_use]
    pub fn close(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Close {
            code,
            reason: reason.into(),
        }
    }

    /// Creates an error event.
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Creates a message event.
    #[inline]
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    /// Returns the event name (`open`, `close`, `error`, `message`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close { .. } => "close",
            Self::Error { .. } => "error",
            Self::Message { .. } => "message",
        }
    }
}

// ============================================================================
// EventSink
// ============================================================================

/// Receiver callback behind an [`EventSink`].
type EmitFn = dyn Fn(AttemptId, TransportEvent) + Send + Sync;

/// Delivers transport events for one connect attempt.
///
/// Cheap to clone. Emitting after the manager was dropped is a no-op.
#[derive(Clone)]
pub struct EventSink {
    /// Attempt this sink belongs to.
    attempt: AttemptId,
    /// Event receiver.
    emit: Arc<EmitFn>,
}

impl EventSink {
    /// Creates a sink bound to `attempt`.
    pub fn new<F>(attempt: AttemptId, emit: F) -> Self
    where
        F: Fn(AttemptId, TransportEvent) + Send + Sync + 'static,
    {
        Self {
            attempt,
            emit: Arc::new(emit),
        }
    }

    /// Returns the attempt this sink belongs to.
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Delivers an event.
    pub fn emit(&self, event: TransportEvent) {
        (self.emit)(self.attempt, event);
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// One live bidirectional connection.
pub trait Transport: Send + Sync {
    /// Queues a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed)
    /// if the transport can no longer send.
    fn send(&self, frame: String) -> Result<()>;

    /// Starts closing the connection. A `Close` event follows.
    fn close(&self);
}

// ============================================================================
// Connector
// ============================================================================

/// Creates a transport for each connect attempt.
pub trait Connector: Send + Sync {
    /// Starts connecting to `url`. Lifecycle events go to `events`.
    ///
    /// Events may be emitted from any thread, including from inside this
    /// call; the manager holds them until the returned transport is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started. The manager
    /// treats this like a transport error event.
    fn connect(&self, url: &Url, events: EventSink) -> Result<Arc<dyn Transport>>;
}

// ============================================================================
// Tests
// ============================================================================
