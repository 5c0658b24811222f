//! Connection lifecycle manager.
//!
//! This module provides the main entry point: [`Manager`].
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Manager`] | Public handle: open, send, close, subscribe, hooks |
//! | [`ManagerBuilder`] | Fluent configuration builder |
//! | [`ConnectionState`] | `Idle` / `Connecting` / `Open` / `Closed` |
//! | [`Completion`] | Future resolving once with a [`Resolution`] |
//! | [`SubscriptionRegistry`] | Per-type subscriber lists with an id catalog |
//!
//! Internally a connection state machine owns the transport, the send queue
//! used while connecting, the raw hooks and the registry.
//!
//! # Example
//!
//! ```no_run
//! use socket_relay::{Manager, Result};
//!
//! # async fn example() -> Result<()> {
//! let manager = Manager::new("ws://127.0.0.1:9000")?;
//!
//! manager.on_close(|event| eprintln!("closed: {event:?}"));
//! let id = manager.subscribe("tick", |data| println!("tick {data}"))?;
//!
//! let ready = manager.open().await;
//! if ready.status {
//!     manager.send_empty("hello")?;
//! }
//!
//! manager.unsubscribe(&id);
//! manager.close();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for manager configuration.
pub mod builder;

/// Public manager handle.
pub mod core;

/// Raw transport event hooks.
mod hooks;

/// Connection state machine.
mod machine;

/// Sends waiting for a connect attempt.
mod queue;

/// Per-type subscriber lists.
pub mod registry;

/// Connection state and results.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ManagerBuilder;
pub use self::core::Manager;
pub use hooks::Hook;
pub use registry::{Callback, Subscriber, SubscriptionRegistry};
pub use state::{Completion, ConnectionState, Resolution};
