//! Wire protocol types.
//!
//! Every frame exchanged over the transport is a text envelope:
//!
//! ```json
//! { "type": "module.event", "data": { ... } }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Generic `{type, data}` envelope |
//! | `codec` | Pluggable envelope encoding, JSON by default |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope encoding and decoding.
pub mod codec;

/// The `{type, data}` wire envelope.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{Codec, JsonCodec};
pub use envelope::Envelope;
