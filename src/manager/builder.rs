//! Builder pattern for manager configuration.
//!
//! Provides a fluent API for configuring and creating [`Manager`] instances.
//!
//! # Example
//!
//! ```no_run
//! use socket_relay::Manager;
//!
//! # fn example() -> socket_relay::Result<()> {
//! let manager = Manager::builder()
//!     .url("wss://relay.example.com/socket")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Codec, JsonCodec};
use crate::transport::{Connector, WsConnector};

use super::core::Manager;

// ============================================================================
// Constants
// ============================================================================

/// URL schemes a manager can connect to.
const SUPPORTED_SCHEMES: &[&str] = &["ws", "wss"];

// ============================================================================
// ManagerBuilder
// ============================================================================

/// Builder for configuring a [`Manager`] instance.
///
/// Use [`Manager::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ManagerBuilder<C = JsonCodec> {
    /// Connection target.
    url: Option<String>,
    /// Transport factory. Defaults to [`WsConnector`].
    connector: Option<Arc<dyn Connector>>,
    /// Envelope codec.
    codec: C,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self {
            url: None,
            connector: None,
            codec: JsonCodec,
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for ManagerBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerBuilder")
            .field("url", &self.url)
            .field("custom_connector", &self.connector.is_some())
            .field("codec", &self.codec)
            .finish()
    }
}

// ============================================================================
// ManagerBuilder Implementation
// ============================================================================

impl ManagerBuilder {
    /// Creates a new builder with the JSON codec and WebSocket connector.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Codec> ManagerBuilder<C> {
    /// Sets the connection target.
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., "wss://example.com/socket")
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the transport factory.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Replaces the envelope codec.
    #[inline]
    #[must_use]
    pub fn codec<D: Codec>(self, codec: D) -> ManagerBuilder<D> {
        ManagerBuilder {
            url: self.url,
            connector: self.connector,
            codec,
        }
    }

    /// Builds the manager with validation.
    ///
    /// No connection is made until the first `open` or `send`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is missing, unparsable, or not `ws`/`wss`
    pub fn build(self) -> Result<Manager<C>> {
        let url = self.validate_url()?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector));

        Ok(Manager::from_parts(url, connector, self.codec))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl<C> ManagerBuilder<C> {
    /// Validates the URL configuration.
    fn validate_url(&self) -> Result<Url> {
        let raw = self.url.as_deref().ok_or_else(|| {
            Error::config(
                "Connection URL is required. Use .url() to set it.\n\
                 Example: Manager::builder().url(\"wss://example.com/socket\")",
            )
        })?;

        let url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid URL {raw:?}: {e}")))?;

        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(Error::config(format!(
                "Unsupported URL scheme {:?}, expected ws or wss",
                url.scheme()
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
