//! WebSocket client transport.
//!
//! [`WsConnector`] opens one tokio-tungstenite client connection per
//! connect attempt and spawns a task that owns the socket.
//!
//! # Event Loop
//!
//! The spawned task handles:
//!
//! - The client handshake (`Open`, or `Error` + `Close` on failure)
//! - Incoming text frames (`Message`)
//! - Outgoing frames from [`WsTransport::send`]
//! - Close frames in both directions (`Close`)
//!
//! Binary, ping and pong frames are ignored.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Connector, EventSink, Transport, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the local side closes the connection.
const NORMAL_CLOSURE: u16 = 1000;

// ============================================================================
// WsCommand
// ============================================================================

/// Internal commands for the event loop.
#[derive(Debug)]
enum WsCommand {
    /// Send a text frame.
    Send(String),
    /// Close the connection.
    Close,
}

// ============================================================================
// WsTransport
// ============================================================================

/// Handle to a running WebSocket event loop.
#[derive(Debug, Clone)]
pub struct WsTransport {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<WsCommand>,
}

impl Transport for WsTransport {
    fn send(&self, frame: String) -> Result<()> {
        self.command_tx
            .send(WsCommand::Send(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let _ = self.command_tx.send(WsCommand::Close);
    }
}

// ============================================================================
// WsConnector
// ============================================================================

/// Connector that opens tokio-tungstenite client connections.
///
/// Requires a running tokio runtime when `connect` is called.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, url: &Url, events: EventSink) -> Result<Arc<dyn Transport>> {
        let handle = Handle::try_current()
            .map_err(|e| Error::transport(format!("no tokio runtime: {e}")))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();

        debug!(%url, attempt = %events.attempt(), "Spawning WebSocket event loop");
        handle.spawn(run_event_loop(url.clone(), command_rx, events));

        Ok(Arc::new(WsTransport { command_tx }))
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Connects, then pumps frames until either side closes.
async fn run_event_loop(
    url: Url,
    mut command_rx: mpsc::UnboundedReceiver<WsCommand>,
    events: EventSink,
) {
    let ws_stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                warn!(%url, error = %e, "WebSocket connect failed");
                events.emit(TransportEvent::error(e.to_string()));
                events.emit(TransportEvent::close(None, "connect failed"));
                return;
            }
        },

        () = wait_for_close(&mut command_rx) => {
            debug!(%url, "Closed before handshake completed");
            events.emit(TransportEvent::close(None, "closed before open"));
            return;
        }
    };

    debug!(%url, "WebSocket connection established");
    events.emit(TransportEvent::Open);

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the peer
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Frame received");
                        events.emit(TransportEvent::message(text.as_str()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = close_details(frame);
                        debug!(?code, %reason, "WebSocket closed by remote");
                        events.emit(TransportEvent::close(code, reason));
                        break;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        events.emit(TransportEvent::error(e.to_string()));
                        events.emit(TransportEvent::close(None, "read failed"));
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        events.emit(TransportEvent::close(None, "stream ended"));
                        break;
                    }

                    // Ignore Binary, Ping, Pong, Frame
                    _ => {}
                }
            }

            // Commands from the manager
            command = command_rx.recv() => {
                match command {
                    Some(WsCommand::Send(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(error = %e, "Failed to send frame");
                            events.emit(TransportEvent::error(e.to_string()));
                            events.emit(TransportEvent::close(None, "write failed"));
                            break;
                        }
                        trace!("Frame sent");
                    }

                    Some(WsCommand::Close) => {
                        debug!("Close command received");
                        let _ = ws_write.close().await;
                        events.emit(TransportEvent::close(Some(NORMAL_CLOSURE), ""));
                        break;
                    }

                    None => {
                        debug!("Command channel closed");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    debug!("Event loop terminated");
}

/// Resolves once a close was requested or every handle was dropped.
///
/// The manager never sends frames before `Open`, so stray sends are dropped.
async fn wait_for_close(command_rx: &mut mpsc::UnboundedReceiver<WsCommand>) {
    while let Some(command) = command_rx.recv().await {
        match command {
            WsCommand::Close => return,
            WsCommand::Send(_) => warn!("Dropping frame sent before open"),
        }
    }
}

/// Extracts code and reason from an optional close frame.
fn close_details(frame: Option<CloseFrame>) -> (Option<u16>, String) {
    match frame {
        Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_owned()),
        None => (None, String::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================
