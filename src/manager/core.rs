//! Public manager handle.
//!
//! [`Manager`] is a cheap-to-clone handle over one logical connection. It
//! connects lazily, queues sends made while connecting, and routes incoming
//! envelopes to subscribers by message type.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::identifiers::SubscriptionId;
use crate::protocol::{Codec, JsonCodec};
use crate::transport::{Connector, TransportEvent};

use super::builder::ManagerBuilder;
use super::hooks::Hook;
use super::machine::ConnectionStateMachine;
use super::queue::PendingSend;
use super::registry::validate_kind;
use super::state::{Completion, ConnectionState};

// ============================================================================
// Manager
// ============================================================================

/// Lazy connection manager with per-type message dispatch.
///
/// # Example
///
/// ```no_run
/// use socket_relay::{Manager, Result};
/// use serde_json::json;
///
/// # async fn example() -> Result<()> {
/// let manager = Manager::new("wss://relay.example.com/socket")?;
///
/// manager.subscribe("chat.message", |data| {
///     println!("chat: {data}");
/// })?;
///
/// // Connects on first use; resolves once the frame was handed over.
/// let sent = manager.send("chat.join", &json!({ "room": "lobby" }))?.await;
/// assert!(sent.status);
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// `Manager` is `Send + Sync`. Clones share the same connection.
pub struct Manager<C: Codec = JsonCodec> {
    /// Shared state machine.
    inner: Arc<ConnectionStateMachine<C>>,
}

impl<C: Codec> Clone for Manager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Codec> fmt::Debug for Manager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("url", &self.inner.url().as_str())
            .field("state", &self.inner.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Manager - Constructor
// ============================================================================

impl Manager {
    /// Creates a manager for `url` with the default JSON codec and
    /// WebSocket transport. Nothing connects yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the URL is invalid.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        ManagerBuilder::new().url(url).build()
    }

    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }
}

impl<C: Codec> Manager<C> {
    /// Assembles a manager from validated parts.
    pub(crate) fn from_parts(url: Url, connector: Arc<dyn Connector>, codec: C) -> Self {
        Self {
            inner: Arc::new(ConnectionStateMachine::new(url, connector, codec)),
        }
    }
}

// ============================================================================
// Manager - Connection
// ============================================================================

impl<C: Codec> Manager<C> {
    /// Ensures the connection is open or opening.
    ///
    /// - Idle or closed: starts a connect attempt.
    /// - Connecting: waits for the current attempt.
    /// - Open: resolves immediately with `status: true` and no event.
    pub fn open(&self) -> Completion {
        let (notifier, completion) = Completion::channel();
        self.inner.submit(PendingSend::wait(notifier));
        completion
    }

    /// Sends `{kind, data}`.
    ///
    /// The send is registered before this returns: on an open connection
    /// the frame is handed to the transport now, while connecting it is
    /// queued behind earlier sends, and otherwise it starts a connect
    /// attempt. The returned [`Completion`] resolves with the outcome; it
    /// may be dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) if `kind` is blank
    /// - [`Error::Json`](crate::Error::Json) if `data` cannot be encoded
    ///
    /// Nothing is sent or queued on error.
    pub fn send<T>(&self, kind: &str, data: &T) -> Result<Completion>
    where
        T: Serialize + ?Sized,
    {
        validate_kind(kind)?;
        let frame = self.inner.codec().encode(kind, data).inspect_err(|e| {
            warn!(kind, error = %e, "Failed to encode envelope");
        })?;

        let (notifier, completion) = Completion::channel();
        self.inner.submit(PendingSend::frame(frame, notifier));
        Ok(completion)
    }

    /// Sends `{kind, data: {}}`.
    ///
    /// # Errors
    ///
    /// Same as [`Manager::send`].
    pub fn send_empty(&self, kind: &str) -> Result<Completion> {
        self.send(kind, &Value::Object(Map::new()))
    }

    /// Closes the connection if it is open or opening.
    ///
    /// A pending attempt settles with `status: false` once the transport
    /// reports the close.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Returns `true` if the connection is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Returns the connection target.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// Returns the number of requests waiting on the current attempt.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }
}

// ============================================================================
// Manager - Subscriptions
// ============================================================================

impl<C: Codec> Manager<C> {
    /// Registers `callback` for incoming messages of type `kind`.
    ///
    /// Callbacks for one message run in registration order. A panicking
    /// callback is logged and does not affect the others.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// `kind` is blank. Nothing is registered on error.
    pub fn subscribe<F>(&self, kind: &str, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&C::Payload) + Send + Sync + 'static,
    {
        let id = self.inner.registry().lock().subscribe(kind, Arc::new(callback))?;
        debug!(subscription = %id, kind, "Subscribed");
        Ok(id)
    }

    /// Registers a callback that receives the payload decoded as `T`.
    ///
    /// Messages whose payload does not decode as `T` are skipped for this
    /// subscriber.
    ///
    /// # Errors
    ///
    /// Same as [`Manager::subscribe`].
    pub fn subscribe_as<T, F>(&self, kind: &str, callback: F) -> Result<SubscriptionId>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let machine = Arc::downgrade(&self.inner);
        let kind_owned = kind.to_string();

        self.subscribe(kind, move |payload| {
            let Some(machine) = machine.upgrade() else {
                return;
            };
            match machine.codec().payload_as::<T>(payload) {
                Ok(value) => callback(value),
                Err(e) => warn!(kind = %kind_owned, error = %e, "Payload type mismatch"),
            }
        })
    }

    /// Removes subscription `id`.
    ///
    /// Returns `false` if `id` is unknown; that is not an error.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.inner.registry().lock().unsubscribe(id)
    }

    /// Removes every subscription.
    pub fn unsubscribe_all(&self) {
        self.inner.registry().lock().unsubscribe_all();
        debug!("All subscriptions removed");
    }

    /// Returns the total number of subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.registry().lock().len()
    }
}

// ============================================================================
// Manager - Raw Hooks
// ============================================================================

impl<C: Codec> Manager<C> {
    /// Sets the callback for transport `Open` events, replacing any previous one.
    pub fn on_open<F>(&self, callback: F)
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.inner.hooks().write().on_open = Some(Self::hook(callback));
    }

    /// Sets the callback for transport `Close` events, replacing any previous one.
    pub fn on_close<F>(&self, callback: F)
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.inner.hooks().write().on_close = Some(Self::hook(callback));
    }

    /// Sets the callback for transport `Error` events, replacing any previous one.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.inner.hooks().write().on_error = Some(Self::hook(callback));
    }

    /// Sets the callback for every raw `Message` event, replacing any
    /// previous one. Runs before subscriber dispatch, also for frames that
    /// fail to decode.
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.inner.hooks().write().on_message = Some(Self::hook(callback));
    }

    /// Boxes a hook callback.
    fn hook<F>(callback: F) -> Hook
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        Arc::new(callback)
    }
}

// ============================================================================
// Tests
// ============================================================================
