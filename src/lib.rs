//! Socket Relay - lazy WebSocket connection manager with typed dispatch.
//!
//! This library wraps a single bidirectional socket connection and lets a
//! caller send and receive `{type, data}` envelopes without handling raw
//! transport events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Manager                                      │
//! │  ┌────────────────────┐  ┌────────────────┐  │        ┌───────────┐
//! │  │ state machine      │  │ subscription   │  │ frames │ Transport │
//! │  │ Idle → Connecting  │──│ registry       │◄─┼────────│ (WebSocket│
//! │  │ → Open → Closed    │  │ type → [cb]    │  │        │  or memory│
//! │  │ + send queue       │──┼────────────────┼──┼───────►│  )        │
//! │  └────────────────────┘  └────────────────┘  │        └───────────┘
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Key behaviors:
//!
//! - The connection opens lazily on the first `open` or `send`
//! - Sends made while connecting are queued and flushed in call order
//! - Each connect attempt settles exactly once, on success or failure
//! - Incoming envelopes fan out to subscribers of their `type`, in
//!   registration order, with per-subscriber panic isolation
//!
//! # Quick Start
//!
//! ```no_run
//! use socket_relay::{Manager, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = Manager::new("wss://relay.example.com/socket")?;
//!
//!     manager.subscribe("chat.message", |data| {
//!         println!("message: {data}");
//!     })?;
//!
//!     let sent = manager.send("chat.join", &json!({ "room": "lobby" }))?.await;
//!     println!("joined: {}", sent.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`manager`] | [`Manager`], builder, state and registry |
//! | [`protocol`] | [`Envelope`] and [`Codec`] |
//! | [`transport`] | Transport seam, WebSocket and in-memory transports |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Connection lifecycle manager.
///
/// Use [`Manager::new()`] or [`Manager::builder()`] to create one.
pub mod manager;

/// Wire envelope and codecs.
pub mod protocol;

/// Transport seam and implementations.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{AttemptId, SubscriptionId};

// Manager types
pub use manager::{
    Completion, ConnectionState, Manager, ManagerBuilder, Resolution, SubscriptionRegistry,
};

// Protocol types
pub use protocol::{Codec, Envelope, JsonCodec};

// Transport types
pub use transport::{
    Connector, EventSink, MemoryConnector, Transport, TransportEvent, WsConnector,
};
