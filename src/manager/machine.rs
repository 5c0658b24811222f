//! Connection state machine.
//!
//! Owns the transport of the current attempt, the [`ConnectionState`], the
//! pending-connect record with its [`SendQueue`], the raw event hooks and
//! the [`SubscriptionRegistry`].
//!
//! # Settling an Attempt
//!
//! An attempt settles on the first `Open`, `Error` or `Close` event. The
//! pending record is taken out of its `Option`, so a second terminal event
//! finds nothing to resolve. Settling runs in this order:
//!
//! 1. Under the state lock: the state changes and the pending record is
//!    taken.
//! 2. The raw hook for the event runs. On `Open`, sends issued by the hook
//!    go straight to the transport.
//! 3. The originating request is delivered and resolved, then each queued
//!    request in FIFO order. On `Open`, delivering hands the frame to the
//!    transport.
//!
//! # Installing a Transport
//!
//! [`Connector::connect`] runs without the state lock. Events for the
//! attempt that arrive before the returned transport is stored are
//! buffered and replayed afterwards, so a connector may emit from inside
//! `connect`.
//!
//! # Locking
//!
//! No callback (hook, subscriber, completion) and no connector ever runs
//! while a lock is held, so callbacks may freely call back into the
//! manager.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Result;
use crate::identifiers::AttemptId;
use crate::protocol::Codec;
use crate::transport::{Connector, EventSink, Transport, TransportEvent};

use super::hooks::{Hooks, run_hook};
use super::queue::{PendingSend, SendQueue};
use super::registry::{SubscriptionRegistry, deliver};
use super::state::{ConnectionState, Resolution};

// ============================================================================
// PendingConnect
// ============================================================================

/// Work waiting on the current attempt.
#[derive(Debug)]
struct PendingConnect {
    /// Request that started the attempt. Settles before the queue.
    origin: PendingSend,
    /// Requests made while connecting.
    queue: SendQueue,
}

impl PendingConnect {
    /// Delivers and resolves the origin, then the queue.
    ///
    /// Returns the number of requests resolved.
    fn resolve(mut self, transport: Option<&dyn Transport>, resolution: &Resolution) -> usize {
        self.origin.deliver(transport, resolution).fire();
        1 + self.queue.flush(transport, resolution)
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// State guarded by the lifecycle lock.
#[derive(Default)]
struct Lifecycle {
    /// Current state.
    state: ConnectionState,
    /// Current attempt number.
    attempt: AttemptId,
    /// Transport of the current attempt.
    transport: Option<Arc<dyn Transport>>,
    /// Present only while `Connecting`.
    pending: Option<PendingConnect>,
    /// `connect` is running for the current attempt.
    installing: bool,
    /// Events that arrived while installing.
    early: Vec<TransportEvent>,
    /// `close` was requested while installing.
    close_requested: bool,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state)
            .field("attempt", &self.attempt)
            .field("has_transport", &self.transport.is_some())
            .field("pending", &self.pending)
            .field("installing", &self.installing)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionStateMachine
// ============================================================================

/// Drives one logical connection through its attempts.
pub(crate) struct ConnectionStateMachine<C: Codec> {
    /// Connection target.
    url: Url,
    /// Creates a transport per attempt.
    connector: Arc<dyn Connector>,
    /// Envelope codec.
    codec: C,
    /// State, transport and pending work.
    lifecycle: Mutex<Lifecycle>,
    /// Raw event hooks.
    hooks: RwLock<Hooks>,
    /// Subscribers by message type.
    registry: Mutex<SubscriptionRegistry<C::Payload>>,
}

impl<C: Codec> ConnectionStateMachine<C> {
    /// Creates an idle machine.
    pub(crate) fn new(url: Url, connector: Arc<dyn Connector>, codec: C) -> Self {
        Self {
            url,
            connector,
            codec,
            lifecycle: Mutex::new(Lifecycle::default()),
            hooks: RwLock::new(Hooks::default()),
            registry: Mutex::new(SubscriptionRegistry::new()),
        }
    }

    /// Returns the connection target.
    #[inline]
    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the codec.
    #[inline]
    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    /// Returns the hooks for mutation.
    #[inline]
    pub(crate) fn hooks(&self) -> &RwLock<Hooks> {
        &self.hooks
    }

    /// Returns the registry for mutation.
    #[inline]
    pub(crate) fn registry(&self) -> &Mutex<SubscriptionRegistry<C::Payload>> {
        &self.registry
    }

    /// Returns the current state.
    pub(crate) fn state(&self) -> ConnectionState {
        self.lifecycle.lock().state
    }

    /// Returns the number of requests waiting on the current attempt.
    pub(crate) fn pending_count(&self) -> usize {
        self.lifecycle
            .lock()
            .pending
            .as_ref()
            .map_or(0, |pending| pending.queue.len() + 1)
    }

    /// Routes a request according to the current state.
    ///
    /// - `Open`: delivered now.
    /// - `Connecting`: queued behind earlier requests.
    /// - `Idle` / `Closed`: starts a new attempt with this request as origin.
    pub(crate) fn submit(self: &Arc<Self>, entry: PendingSend) {
        let mut lifecycle = self.lifecycle.lock();

        match lifecycle.state {
            ConnectionState::Open => {
                let transport = lifecycle.transport.clone();
                drop(lifecycle);
                entry.deliver(transport.as_deref(), &Resolution::ready()).fire();
            }

            ConnectionState::Connecting => {
                if let Some(pending) = lifecycle.pending.as_mut() {
                    pending.queue.enqueue(entry);
                } else {
                    warn!("Connecting without a pending record, starting new attempt");
                    self.start_attempt(lifecycle, entry);
                }
            }

            ConnectionState::Idle | ConnectionState::Closed => {
                self.start_attempt(lifecycle, entry);
            }
        }
    }

    /// Asks the current transport to close.
    ///
    /// Acts in `Open` and `Connecting`. The transport's `Close` event
    /// completes the transition.
    pub(crate) fn close(&self) {
        let transport = {
            let mut lifecycle = self.lifecycle.lock();
            match lifecycle.state {
                ConnectionState::Connecting if lifecycle.installing => {
                    lifecycle.close_requested = true;
                    None
                }
                ConnectionState::Open | ConnectionState::Connecting => lifecycle.transport.clone(),
                ConnectionState::Idle | ConnectionState::Closed => None,
            }
        };

        if let Some(transport) = transport {
            debug!(url = %self.url, "Closing connection");
            transport.close();
        }
    }

    /// Starts a new attempt with `origin` as its first request.
    fn start_attempt(
        self: &Arc<Self>,
        mut lifecycle: MutexGuard<'_, Lifecycle>,
        origin: PendingSend,
    ) {
        let attempt = lifecycle.attempt.next();
        lifecycle.attempt = attempt;
        lifecycle.state = ConnectionState::Connecting;
        lifecycle.transport = None;
        lifecycle.installing = true;
        lifecycle.early.clear();
        lifecycle.close_requested = false;
        lifecycle.pending = Some(PendingConnect {
            origin,
            queue: SendQueue::default(),
        });
        drop(lifecycle);

        debug!(url = %self.url, %attempt, "Connecting");

        let connected = self.connector.connect(&self.url, self.event_sink(attempt));
        self.install(attempt, connected);
    }

    /// Stores the outcome of `connect` for `attempt` and replays events
    /// that arrived meanwhile.
    fn install(&self, attempt: AttemptId, connected: Result<Arc<dyn Transport>>) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.attempt != attempt {
            trace!(%attempt, current = %lifecycle.attempt, "Superseded attempt not installed");
            return;
        }
        lifecycle.installing = false;
        let early = mem::take(&mut lifecycle.early);

        match connected {
            Ok(transport) => {
                let close_now = mem::take(&mut lifecycle.close_requested);
                lifecycle.transport = Some(Arc::clone(&transport));
                drop(lifecycle);

                for event in early {
                    self.handle_event(attempt, event);
                }
                if close_now {
                    debug!(url = %self.url, %attempt, "Closing connection");
                    transport.close();
                }
            }
            Err(e) => {
                warn!(url = %self.url, %attempt, error = %e, "Connect failed to start");
                if !early.is_empty() {
                    trace!(%attempt, dropped = early.len(), "Events before failed connect dropped");
                }
                lifecycle.state = ConnectionState::Closed;
                lifecycle.close_requested = false;
                let pending = lifecycle.pending.take();
                drop(lifecycle);

                self.settle(pending, None, TransportEvent::error(e.to_string()));
            }
        }
    }

    /// Creates the sink for `attempt`.
    ///
    /// Holds only a weak reference, so a lingering transport task does not
    /// keep the machine alive.
    fn event_sink(self: &Arc<Self>, attempt: AttemptId) -> EventSink {
        let machine: Weak<Self> = Arc::downgrade(self);
        EventSink::new(attempt, move |attempt, event| {
            if let Some(machine) = machine.upgrade() {
                machine.handle_event(attempt, event);
            }
        })
    }

    /// Applies a transport event from `attempt`.
    pub(crate) fn handle_event(&self, attempt: AttemptId, event: TransportEvent) {
        let mut lifecycle = self.lifecycle.lock();

        if lifecycle.attempt != attempt {
            trace!(%attempt, current = %lifecycle.attempt, event = event.name(), "Stale event dropped");
            return;
        }

        if lifecycle.installing {
            trace!(%attempt, event = event.name(), "Event buffered until transport is installed");
            lifecycle.early.push(event);
            return;
        }

        match &event {
            TransportEvent::Open => {
                if lifecycle.state != ConnectionState::Connecting {
                    trace!(state = %lifecycle.state, "Unexpected open ignored");
                    return;
                }
                lifecycle.state = ConnectionState::Open;
                let pending = lifecycle.pending.take();
                let transport = lifecycle.transport.clone();
                drop(lifecycle);

                debug!(url = %self.url, %attempt, "Connection open");
                self.settle(pending, transport, event);
            }

            TransportEvent::Error { message } => {
                lifecycle.state = ConnectionState::Closed;
                let pending = lifecycle.pending.take();
                drop(lifecycle);

                debug!(url = %self.url, %attempt, %message, "Transport error");
                self.settle(pending, None, event);
            }

            TransportEvent::Close { code, reason } => {
                lifecycle.state = ConnectionState::Closed;
                let pending = lifecycle.pending.take();
                lifecycle.transport = None;
                drop(lifecycle);

                debug!(url = %self.url, %attempt, ?code, %reason, "Connection closed");
                self.settle(pending, None, event);
            }

            TransportEvent::Message { text } => {
                drop(lifecycle);
                self.run_hook(&event);
                self.route(text);
            }
        }
    }

    /// Runs the hook for a terminal `event`, then resolves `pending`.
    ///
    /// `transport` is only used when `event` is `Open`.
    fn settle(
        &self,
        pending: Option<PendingConnect>,
        transport: Option<Arc<dyn Transport>>,
        event: TransportEvent,
    ) {
        self.run_hook(&event);

        let Some(pending) = pending else {
            return;
        };
        let resolution = if matches!(event, TransportEvent::Open) {
            Resolution::opened(event)
        } else {
            Resolution::failed(event)
        };
        let resolved = pending.resolve(transport.as_deref(), &resolution);
        trace!(resolved, status = resolution.status, "Attempt settled");
    }

    /// Decodes a frame and dispatches it to subscribers of its type.
    ///
    /// Frames that do not decode are dropped.
    fn route(&self, text: &str) {
        let envelope = match self.codec.decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                trace!(error = %e, "Dropping undecodable frame");
                return;
            }
        };

        let subscribers = self.registry.lock().snapshot(&envelope.kind);
        if subscribers.is_empty() {
            trace!(kind = %envelope.kind, "No subscribers");
            return;
        }

        let delivered = deliver(&subscribers, &envelope.data);
        trace!(kind = %envelope.kind, delivered, total = subscribers.len(), "Dispatched");
    }

    /// Runs the hook registered for `event`, if any.
    fn run_hook(&self, event: &TransportEvent) {
        let hook = self.hooks.read().for_event(event);
        if let Some(hook) = hook {
            run_hook(&hook, event);
        }
    }
}

impl<C: Codec> fmt::Debug for ConnectionStateMachine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStateMachine")
            .field("url", &self.url.as_str())
            .field("lifecycle", &*self.lifecycle.lock())
            .field("hooks", &*self.hooks.read())
            .field("registry", &*self.registry.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
