//! Connection state and connect-attempt results.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::transport::TransportEvent;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the managed connection.
///
/// ```text
/// Idle ──connect──► Connecting ──open──► Open
///                       │                  │
///                 error/close         error/close
///                       ▼                  ▼
///                     Closed ◄─────────────┘
/// ```
///
/// A new connect from `Idle` or `Closed` starts a fresh attempt. There is
/// no automatic reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No attempt was made yet.
    #[default]
    Idle,
    /// An attempt is in flight.
    Connecting,
    /// The transport accepts frames.
    Open,
    /// The last attempt failed or the connection closed.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if a send in this state must start a new attempt.
    #[inline]
    #[must_use]
    pub const fn needs_connect(self) -> bool {
        matches!(self, Self::Idle | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Outcome of a connect attempt or a send.
///
/// `event` is the transport event that settled the attempt. It is `None`
/// when the connection was already open and nothing had to wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Whether the connection is usable.
    pub status: bool,
    /// Event that produced this outcome.
    pub event: Option<TransportEvent>,
}

impl Resolution {
    /// Outcome for an attempt settled by `Open`.
    #[inline]
    #[must_use]
    pub fn opened(event: TransportEvent) -> Self {
        Self {
            status: true,
            event: Some(event),
        }
    }

    /// Outcome for an attempt settled by an error or close event.
    #[inline]
    #[must_use]
    pub fn failed(event: TransportEvent) -> Self {
        Self {
            status: false,
            event: Some(event),
        }
    }

    /// Outcome for work done on an already-open connection.
    #[inline]
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            status: true,
            event: None,
        }
    }

    /// Outcome seen when the manager went away before settling.
    #[inline]
    #[must_use]
    pub const fn abandoned() -> Self {
        Self {
            status: false,
            event: None,
        }
    }

    /// Returns `true` if the connection was usable.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status
    }
}

// ============================================================================
// Completion
// ============================================================================

/// Future that resolves once with the [`Resolution`] of an `open` or `send`.
///
/// The intent it tracks was registered when the call returned. Dropping the
/// completion does not cancel the send.
#[derive(Debug)]
pub struct Completion {
    /// One-shot result channel.
    rx: oneshot::Receiver<Resolution>,
}

impl Completion {
    /// Creates a linked notifier and completion.
    pub(crate) fn channel() -> (Notifier, Self) {
        let (tx, rx) = oneshot::channel();
        (Notifier { tx }, Self { rx })
    }

    /// Returns the resolution if it is already available.
    ///
    /// Returns `None` while the attempt is in flight. Once the result was
    /// taken, later calls return [`Resolution::abandoned`].
    pub fn try_result(&mut self) -> Option<Resolution> {
        match self.rx.try_recv() {
            Ok(resolution) => Some(resolution),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Resolution::abandoned()),
        }
    }
}

impl Future for Completion {
    type Output = Resolution;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Resolution::abandoned()))
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Sending half of a [`Completion`]. Consumed by [`Notifier::notify`].
#[derive(Debug)]
pub(crate) struct Notifier {
    /// One-shot result channel.
    tx: oneshot::Sender<Resolution>,
}

impl Notifier {
    /// Resolves the linked completion.
    pub(crate) fn notify(self, resolution: Resolution) {
        // Receiver may have been dropped by a fire-and-forget caller.
        let _ = self.tx.send(resolution);
    }
}

// ============================================================================
// Tests
// ============================================================================
