//! The `{type, data}` wire envelope.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Envelope
// ============================================================================

/// The only message shape exchanged over the transport.
///
/// # Format
///
/// ```json
/// {
///   "type": "chat.message",
///   "data": { ... }
/// }
/// ```
///
/// `kind` is an application-defined tag used for routing; `data` is an
/// arbitrary payload whose representation is chosen by the
/// [`Codec`](super::Codec).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Routing tag.
    #[serde(rename = "type")]
    pub kind: String,

    /// Message payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, data: T) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Returns the routing tag.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Consumes the envelope and returns its payload.
    #[inline]
    #[must_use]
    pub fn into_data(self) -> T {
        self.data
    }
}

// ============================================================================
// Tests
// ============================================================================
